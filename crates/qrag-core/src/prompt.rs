//! Chat prompt templates

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    Human,
}

impl ChatRole {
    /// Prefix used when a prompt is flattened to plain text
    pub fn prefix(&self) -> &'static str {
        match self {
            ChatRole::System => "System",
            ChatRole::Human => "Human",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A rendered prompt, ready to be sent to an LLM client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPrompt {
    pub messages: Vec<ChatMessage>,
}

impl fmt::Display for ChatPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}: {}", message.role.prefix(), message.content)?;
        }
        Ok(())
    }
}

/// A list of role/template pairs with `{name}` placeholders
///
/// `{{` and `}}` produce literal braces. Substituted values are inserted verbatim
/// and never scanned for placeholders themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    messages: Vec<(ChatRole, String)>,
}

impl PromptTemplate {
    pub fn from_messages<S: Into<String>>(messages: impl IntoIterator<Item = (ChatRole, S)>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .map(|(role, template)| (role, template.into()))
                .collect(),
        }
    }

    /// Render every message with the given variables
    pub fn format(&self, variables: &[(&str, &str)]) -> Result<ChatPrompt> {
        let messages = self
            .messages
            .iter()
            .map(|(role, template)| {
                Ok(ChatMessage {
                    role: *role,
                    content: render(template, variables)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatPrompt { messages })
    }
}

fn render(template: &str, variables: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
        } else if tail.starts_with('}') {
            return Err(Error::Prompt(format!(
                "unmatched '}}' in template: {:?}",
                template
            )));
        } else {
            let end = tail
                .find('}')
                .ok_or_else(|| Error::Prompt(format!("unclosed placeholder in template: {:?}", template)))?;
            let name = &tail[1..end];
            let value = variables
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| Error::Prompt(format!("missing template variable: {}", name)))?;
            out.push_str(value);
            rest = &tail[end + 1..];
        }
    }

    out.push_str(rest);
    Ok(out)
}
