//! # OpenAI-compatible API Client
//!
//! Minimal client for the two endpoints BookPress consumes:
//! `POST /chat/completions` and `POST /images/generations`.
//!
//! ## Example
//!
//! ```no_run
//! use bookpress_openai::{ChatMessage, ChatRequest, OpenAiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads OPENAI_API_KEY (and optionally OPENAI_BASE_URL)
//!     let client = OpenAiClient::from_env()?;
//!
//!     let request = ChatRequest::new(
//!         "gpt-3.5-turbo",
//!         vec![
//!             ChatMessage::system("You are an AI assistant helping with book publishing."),
//!             ChatMessage::user("Summarize this manuscript: ..."),
//!         ],
//!     );
//!
//!     let response = client.chat_completions(&request).await?;
//!     println!("{:?}", response.first_content());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod types;

pub use client::{DEFAULT_BASE_URL, OpenAiClient};
pub use error::OpenAiError;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, ImageData, ImageGenerationRequest,
    ImageGenerationResponse, ImageResponseFormat, Role, Usage,
};
