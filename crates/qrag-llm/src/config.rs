//! Model client and embedding configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use url::Url;

use qrag_core::{Error, Result};

/// Which LLM backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientKind {
    OpenAI,
    Ollama,
}

impl FromStr for ClientKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ClientKind::OpenAI),
            "ollama" => Ok(ClientKind::Ollama),
            other => Err(Error::Configuration(format!(
                "Unknown client {:?}, expected \"openai\" or \"ollama\"",
                other
            ))),
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKind::OpenAI => f.write_str("openai"),
            ClientKind::Ollama => f.write_str("ollama"),
        }
    }
}

/// Model name and token budget shared by every client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    pub context_size: usize,
    pub max_output_tokens: usize,
    pub temperature: Option<f32>,
}

impl ModelSettings {
    pub const DEFAULT_CONTEXT_SIZE: usize = 8192;
    pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 512;

    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            context_size: Self::DEFAULT_CONTEXT_SIZE,
            max_output_tokens: Self::DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: None,
        }
    }

    fn from_vars(vars: &impl Fn(&str) -> Option<String>, default_model: &str) -> Result<Self> {
        Ok(Self {
            model: vars("QRAG_MODEL").unwrap_or_else(|| default_model.to_string()),
            context_size: parse_var(vars, "QRAG_CONTEXT_SIZE")?
                .unwrap_or(Self::DEFAULT_CONTEXT_SIZE),
            max_output_tokens: parse_var(vars, "QRAG_MAX_OUTPUT_TOKENS")?
                .unwrap_or(Self::DEFAULT_MAX_OUTPUT_TOKENS),
            temperature: parse_var(vars, "QRAG_TEMPERATURE")?,
        })
    }
}

/// Azure OpenAI deployment coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzureDeployment {
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
}

/// Configuration for the OpenAI chat client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub azure: Option<AzureDeployment>,
    pub settings: ModelSettings,
}

impl OpenAIConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_AZURE_API_VERSION: &'static str = "2024-06-01";

    /// Create configuration with explicit values
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            azure: None,
            settings: ModelSettings::new(model),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_azure(mut self, azure: AzureDeployment) -> Self {
        self.azure = Some(azure);
        self
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(&|name: &str| env::var(name).ok())
    }

    fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings = ModelSettings::from_vars(vars, Self::DEFAULT_MODEL)?;

        if let Some(endpoint) = vars("AZURE_OPENAI_ENDPOINT") {
            let api_key = vars("AZURE_OPENAI_API_KEY").ok_or_else(|| {
                Error::Configuration(
                    "AZURE_OPENAI_API_KEY environment variable not found".to_string(),
                )
            })?;
            validate_url("AZURE_OPENAI_ENDPOINT", &endpoint)?;

            let azure = AzureDeployment {
                endpoint,
                deployment: vars("AZURE_OPENAI_DEPLOYMENT").unwrap_or_else(|| settings.model.clone()),
                api_version: vars("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| Self::DEFAULT_AZURE_API_VERSION.to_string()),
            };

            return Ok(Self {
                api_key,
                base_url: Self::DEFAULT_BASE_URL.to_string(),
                azure: Some(azure),
                settings,
            });
        }

        let api_key = vars("OPENAI_API_KEY").ok_or_else(|| {
            Error::Configuration("OPENAI_API_KEY environment variable not found".to_string())
        })?;
        let base_url = vars("OPENAI_BASE_URL").unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        validate_url("OPENAI_BASE_URL", &base_url)?;

        Ok(Self {
            api_key,
            base_url,
            azure: None,
            settings,
        })
    }
}

/// Configuration for the Ollama client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub settings: ModelSettings,
}

impl OllamaConfig {
    pub const DEFAULT_HOST: &'static str = "http://localhost:11434";
    pub const DEFAULT_MODEL: &'static str = "llama3.1";

    /// Create configuration with explicit values
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            settings: ModelSettings::new(model),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(&|name: &str| env::var(name).ok())
    }

    fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = vars("OLLAMA_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        validate_url("OLLAMA_HOST", &host)?;

        Ok(Self {
            host,
            settings: ModelSettings::from_vars(vars, Self::DEFAULT_MODEL)?,
        })
    }
}

/// Configuration for whichever client `QRAG_CLIENT` selects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "client", rename_all = "lowercase")]
pub enum ClientConfig {
    OpenAI(OpenAIConfig),
    Ollama(OllamaConfig),
}

impl ClientConfig {
    /// Create configuration from environment variables, using `QRAG_CLIENT`
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(&|name: &str| env::var(name).ok(), None)
    }

    /// Create configuration from environment variables for an explicit client
    pub fn from_env_for(kind: ClientKind) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(&|name: &str| env::var(name).ok(), Some(kind))
    }

    pub(crate) fn from_vars(
        vars: &impl Fn(&str) -> Option<String>,
        kind: Option<ClientKind>,
    ) -> Result<Self> {
        let kind = match kind {
            Some(kind) => kind,
            None => vars("QRAG_CLIENT")
                .map(|value| value.parse())
                .transpose()?
                .unwrap_or(ClientKind::Ollama),
        };

        match kind {
            ClientKind::OpenAI => Ok(ClientConfig::OpenAI(OpenAIConfig::from_vars(vars)?)),
            ClientKind::Ollama => Ok(ClientConfig::Ollama(OllamaConfig::from_vars(vars)?)),
        }
    }

    pub fn kind(&self) -> ClientKind {
        match self {
            ClientConfig::OpenAI(_) => ClientKind::OpenAI,
            ClientConfig::Ollama(_) => ClientKind::Ollama,
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingKind {
    Ollama,
    OpenAI,
    Hashing,
}

impl FromStr for EmbeddingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(EmbeddingKind::Ollama),
            "openai" => Ok(EmbeddingKind::OpenAI),
            "hashing" => Ok(EmbeddingKind::Hashing),
            other => Err(Error::Configuration(format!(
                "Unknown embedding provider {:?}, expected \"ollama\", \"openai\" or \"hashing\"",
                other
            ))),
        }
    }
}

/// Configuration for the embedding model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub kind: EmbeddingKind,
    pub model: String,
    pub dimension: usize,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl EmbeddingConfig {
    pub const DEFAULT_MODEL: &'static str = "all-minilm";
    pub const DEFAULT_DIMENSION: usize = 384;

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(&|name: &str| env::var(name).ok())
    }

    pub(crate) fn from_vars(vars: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind = vars("QRAG_EMBEDDING_PROVIDER")
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or(EmbeddingKind::Ollama);

        let endpoint = match kind {
            EmbeddingKind::Ollama => {
                vars("OLLAMA_HOST").unwrap_or_else(|| OllamaConfig::DEFAULT_HOST.to_string())
            }
            EmbeddingKind::OpenAI => vars("OPENAI_BASE_URL")
                .unwrap_or_else(|| OpenAIConfig::DEFAULT_BASE_URL.to_string()),
            EmbeddingKind::Hashing => String::new(),
        };
        if kind != EmbeddingKind::Hashing {
            validate_url("embedding endpoint", &endpoint)?;
        }

        let api_key = vars("OPENAI_API_KEY");
        if kind == EmbeddingKind::OpenAI && api_key.is_none() {
            return Err(Error::Configuration(
                "OPENAI_API_KEY environment variable not found".to_string(),
            ));
        }

        let dimension = parse_var(vars, "QRAG_EMBEDDING_DIMENSION")?.unwrap_or(Self::DEFAULT_DIMENSION);
        if dimension == 0 {
            return Err(Error::Configuration(
                "QRAG_EMBEDDING_DIMENSION must be positive".to_string(),
            ));
        }

        Ok(Self {
            kind,
            model: vars("QRAG_EMBEDDING_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            dimension,
            endpoint,
            api_key,
        })
    }

    /// Offline configuration backed by [`crate::HashingEmbeddings`]
    pub fn hashing(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Configuration(
                "hashing embedding dimension must be positive".to_string(),
            ));
        }

        Ok(Self {
            kind: EmbeddingKind::Hashing,
            model: format!("hashing-{}", dimension),
            dimension,
            endpoint: String::new(),
            api_key: None,
        })
    }
}

fn parse_var<T: FromStr>(vars: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T::Err: fmt::Display,
{
    vars(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| {
                Error::Configuration(format!("Invalid value {:?} for {}: {}", value, name, e))
            })
        })
        .transpose()
}

fn validate_url(name: &str, value: &str) -> Result<()> {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| Error::Configuration(format!("Invalid URL {:?} for {}: {}", value, name, e)))
}
