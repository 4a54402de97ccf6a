//! Configuration management for the BookPress server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file in the working directory is read first when present.

use bookpress_contracts::topics;
use bookpress_openai::DEFAULT_BASE_URL;
use bookpress_publishing::enrichment::DEFAULT_IMAGE_SIZE;
use bookpress_publishing::enrichment::openai::{DEFAULT_CHAT_MODEL, DEFAULT_IMAGE_MODEL};
use bookpress_publishing::pipeline::DEFAULT_PUBLIC_BASE_URL;
use bookpress_publishing::render::glyph::DEFAULT_REPLACEMENT;
use bookpress_publishing::storage::DEFAULT_STORAGE_ROOT;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Document storage configuration
    pub storage: StorageConfig,
    /// AI provider configuration
    pub openai: OpenAiConfig,
    /// Publishing aggregate configuration
    pub publishing: PublishingConfig,
    /// Author lookup configuration
    pub authors: AuthorsConfig,
    /// Book catalog configuration
    pub catalog: CatalogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Base URL documents are linked under
    pub public_base_url: String,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// How long a command request waits for its outcome, in seconds
    pub command_timeout: u64,
}

impl ServerConfig {
    /// `host:port` to bind to
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the `pdfs/`, `temp/` and `web/` directories
    pub root: String,
    /// Character printed in place of glyphs the PDF fonts cannot encode
    pub glyph_replacement: char,
}

/// AI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key; publishing cannot start without one
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Chat model for prompt, category and summary
    pub chat_model: String,
    /// Image model for covers
    pub image_model: String,
    /// Cover size
    pub image_size: String,
    /// Request timeout in seconds
    pub request_timeout: u64,
}

/// Publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    /// Pipelines allowed to run at once (default: 1)
    pub max_concurrent_publishes: usize,
    /// Wait before re-announcing a persisted book, in milliseconds
    pub announcement_retry_delay_ms: u64,
    /// Announcement rounds before giving up
    pub max_announcement_rounds: u32,
    /// Topic publish requests arrive on
    pub manuscript_topic: String,
    /// Topic `Published` events go to
    pub publishing_topic: String,
}

/// Author lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorsConfig {
    /// Author service base URL; without one names come from `author-events`
    pub service_url: Option<String>,
}

/// Book catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Book ids priced as bestsellers
    pub bestsellers: Vec<String>,
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads a `.env` file first if one exists. Missing or unparseable
    /// variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        // A missing .env file is the normal case in production
        let _ = dotenvy::dotenv();

        Self {
            server: ServerConfig {
                host: string("HOST", "0.0.0.0"),
                port: parsed("PORT", 8080),
                public_base_url: string("PUBLIC_BASE_URL", DEFAULT_PUBLIC_BASE_URL),
                shutdown_timeout: parsed("SHUTDOWN_TIMEOUT", 30),
                command_timeout: parsed("COMMAND_TIMEOUT", 10),
            },
            storage: StorageConfig {
                root: string("STORAGE_ROOT", DEFAULT_STORAGE_ROOT),
                glyph_replacement: env::var("GLYPH_REPLACEMENT")
                    .ok()
                    .and_then(|s| s.chars().next())
                    .filter(char::is_ascii_graphic)
                    .unwrap_or(DEFAULT_REPLACEMENT),
            },
            openai: OpenAiConfig {
                api_key: optional("OPENAI_API_KEY"),
                base_url: string("OPENAI_BASE_URL", DEFAULT_BASE_URL),
                chat_model: string("OPENAI_CHAT_MODEL", DEFAULT_CHAT_MODEL),
                image_model: string("OPENAI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
                image_size: string("OPENAI_IMAGE_SIZE", DEFAULT_IMAGE_SIZE),
                request_timeout: parsed("OPENAI_TIMEOUT", 60),
            },
            publishing: PublishingConfig {
                max_concurrent_publishes: parsed("PUBLISHING_MAX_CONCURRENT", 1),
                announcement_retry_delay_ms: parsed("PUBLISHING_ANNOUNCE_RETRY_DELAY_MS", 5000),
                max_announcement_rounds: parsed("PUBLISHING_ANNOUNCE_MAX_ROUNDS", 3),
                manuscript_topic: string("MANUSCRIPT_TOPIC", topics::MANUSCRIPT_EVENTS),
                publishing_topic: string("PUBLISHING_TOPIC", topics::PUBLISHING_EVENTS),
            },
            authors: AuthorsConfig {
                service_url: optional("AUTHOR_SERVICE_URL"),
            },
            catalog: CatalogConfig {
                bestsellers: list("BOOKPRESS_BESTSELLERS"),
            },
        }
    }

    /// Graceful shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout)
    }

    /// Command request timeout
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.server.command_timeout)
    }
}
