//! Parameterized Cypher statements

use qrag_core::{Error, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

/// Node properties managed by the store rather than by node metadata
pub(crate) const RESERVED_PROPERTIES: [&str; 2] = ["id", "embedding"];

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Validate a label, relationship type or index name and backtick-quote it.
///
/// Cypher cannot take these as parameters, so they are the only names that ever
/// reach query text.
pub fn quote_identifier(name: &str) -> Result<String> {
    if IDENTIFIER.is_match(name) {
        Ok(format!("`{}`", name))
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

/// A Cypher query and the values it binds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub statement: String,
    pub parameters: Value,
}

impl Statement {
    pub fn new(statement: impl Into<String>, parameters: Value) -> Self {
        Self {
            statement: statement.into(),
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Chunk").unwrap(), "`Chunk`");
        assert_eq!(quote_identifier("HAS_ANSWER").unwrap(), "`HAS_ANSWER`");
        assert_eq!(quote_identifier("_private2").unwrap(), "`_private2`");
    }

    #[test]
    fn test_quote_identifier_rejects_injection() {
        for name in ["", "Chunk`) DETACH DELETE n //", "has answer", "a{b}", "1abc", "Ch-unk"] {
            assert!(
                matches!(quote_identifier(name), Err(Error::InvalidIdentifier(_))),
                "{:?} should be rejected",
                name
            );
        }
    }
}
