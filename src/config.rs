use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_FRONTEND_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_PORT, DEFAULT_SMTP_PORT,
    DEFAULT_SMTP_SERVER, DEFAULT_TEMPERATURE, FREQUENCY_PENALTY, OPENROUTER_ENDPOINT,
    PRESENCE_PENALTY, TOP_K, TOP_P, UPSTREAM_TIMEOUT_SECS, UPSTREAM_TITLE,
};

const ENV_CONFIG_PATH: &str = "FOLIO_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Chat proxy configuration (OpenRouter)
    #[serde(default)]
    pub ai: AiConfig,
    /// Contact form delivery
    #[serde(default)]
    pub mail: MailConfig,
}

/// A credential that never shows up in debug output or logs
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"***\"")
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    /// Public URL of the SPA; also allowed by CORS
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// Extra origins allowed by CORS in addition to the built-in ones
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Directory holding the built SPA, served for non-API paths
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// Replacement for the embedded portfolio record
    #[serde(default)]
    pub portfolio_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            environment: Environment::default(),
            frontend_url: default_frontend_url(),
            allowed_origins: Vec::new(),
            static_dir: None,
            portfolio_path: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Origins accepted verbatim by CORS
    pub fn origins(&self) -> Vec<String> {
        let mut origins = vec![
            "http://localhost:5173".to_string(),
            "http://localhost:3000".to_string(),
        ];
        for origin in std::iter::once(&self.frontend_url).chain(&self.allowed_origins) {
            let origin = origin.trim().trim_end_matches('/');
            if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
                origins.push(origin.to_string());
            }
        }
        origins
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// OpenRouter API key (required for upstream chat)
    #[serde(default)]
    pub api_key: Option<Secret>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_frequency_penalty")]
    pub frequency_penalty: f32,
    #[serde(default = "default_presence_penalty")]
    pub presence_penalty: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sent upstream as X-Title
    #[serde(default = "default_title")]
    pub title: String,
    /// Retries for transport errors and upstream 5xx
    #[serde(default = "default_ai_retries")]
    pub max_retries: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            frequency_penalty: default_frequency_penalty(),
            presence_penalty: default_presence_penalty(),
            timeout_secs: default_timeout_secs(),
            title: default_title(),
            max_retries: default_ai_retries(),
        }
    }
}

impl AiConfig {
    /// The API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .map(Secret::expose)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// SMTP login, also used as the From address
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Secret>,
    /// Where submissions go (default: the portfolio email)
    #[serde(default)]
    pub recipient: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            username: None,
            password: None,
            recipient: None,
        }
    }
}

impl MailConfig {
    /// SMTP credentials, if both halves are set
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.trim().is_empty())?;
        let password = self.password.as_ref().filter(|p| !p.is_empty())?;
        Some((username, password.expose()))
    }
}

fn default_bind() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_frontend_url() -> String {
    DEFAULT_FRONTEND_URL.to_string()
}

fn default_endpoint() -> String {
    OPENROUTER_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_top_p() -> f32 {
    TOP_P
}

fn default_top_k() -> u32 {
    TOP_K
}

fn default_frequency_penalty() -> f32 {
    FREQUENCY_PENALTY
}

fn default_presence_penalty() -> f32 {
    PRESENCE_PENALTY
}

fn default_timeout_secs() -> u64 {
    UPSTREAM_TIMEOUT_SECS
}

fn default_title() -> String {
    UPSTREAM_TITLE.to_string()
}

fn default_ai_retries() -> u32 {
    1
}

fn default_smtp_server() -> String {
    DEFAULT_SMTP_SERVER.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("folio");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration and apply environment overrides.
    ///
    /// An explicit path must exist. Otherwise `$FOLIO_CONFIG` or the default
    /// location is tried, and a missing file means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => {
                let path = match std::env::var_os(ENV_CONFIG_PATH) {
                    Some(path) => PathBuf::from(path),
                    None => Self::config_path()?,
                };
                if path.exists() {
                    Self::load_file(&path)?
                } else {
                    tracing::debug!("No config file at {}, using defaults", path.display());
                    Config::default()
                }
            }
        };

        config.apply_env();
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup. Blank or unparsable values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = get("FRONTEND_URL") {
            self.server.frontend_url = url;
        }
        if let Some(env) = get("FOLIO_ENV")
            .or_else(|| get("NODE_ENV"))
            .and_then(|v| Environment::parse(&v))
        {
            self.server.environment = env;
        }

        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.ai.api_key = Some(Secret::new(key));
        }
        if let Some(model) = get("OPENROUTER_MODEL").or_else(|| get("AI_MODEL")) {
            self.ai.model = model;
        }
        if let Some(temperature) = get("AI_TEMPERATURE")
            .and_then(|v| v.trim().parse::<f32>().ok())
            .filter(|t| t.is_finite())
        {
            self.ai.temperature = temperature;
        }
        if let Some(max_tokens) = get("AI_MAX_TOKENS").and_then(|v| v.trim().parse().ok()) {
            self.ai.max_tokens = max_tokens;
        }

        if let Some(user) = get("EMAIL_USER") {
            self.mail.username = Some(user);
        }
        if let Some(password) = get("EMAIL_PASSWORD") {
            self.mail.password = Some(Secret::new(password));
        }
        if let Some(server) = get("SMTP_SERVER") {
            self.mail.server = server;
        }
    }
}
