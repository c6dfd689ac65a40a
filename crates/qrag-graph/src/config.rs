//! Neo4j connection configuration

use qrag_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Configuration for the Neo4j HTTP endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: String,
}

impl Neo4jConfig {
    pub const DEFAULT_URI: &'static str = "http://localhost:7474";
    pub const DEFAULT_USER: &'static str = "neo4j";
    pub const DEFAULT_DATABASE: &'static str = "neo4j";

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let password = env::var("NEO4J_PASSWORD").map_err(|_| {
            Error::Configuration("NEO4J_PASSWORD environment variable not found".to_string())
        })?;

        Ok(Self {
            uri: env::var("NEO4J_URI").unwrap_or_else(|_| Self::DEFAULT_URI.to_string()),
            user: env::var("NEO4J_USER").unwrap_or_else(|_| Self::DEFAULT_USER.to_string()),
            password,
            database: env::var("NEO4J_DATABASE")
                .unwrap_or_else(|_| Self::DEFAULT_DATABASE.to_string()),
        })
    }

    /// Create configuration with explicit values
    pub fn new(uri: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            password: password.into(),
            database: Self::DEFAULT_DATABASE.to_string(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Endpoint that runs statements in a single auto-committed transaction
    pub fn commit_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.uri)
            .map_err(|e| Error::Configuration(format!("Invalid NEO4J_URI {:?}: {}", self.uri, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "NEO4J_URI must use the HTTP API (http:// or https://), got {}://",
                url.scheme()
            )));
        }

        url.path_segments_mut()
            .map_err(|_| Error::Configuration(format!("NEO4J_URI cannot be a base: {}", self.uri)))?
            .pop_if_empty()
            .extend(["db", self.database.as_str(), "tx", "commit"]);

        Ok(url)
    }
}
