//! Request and response bodies

use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instruction that frames the conversation
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

/// One message in a chat completion request or response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author
    pub role: Role,
    /// Message text
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a request with the provider's default sampling
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
        }
    }
}

/// Token accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens in the completion
    #[serde(default)]
    pub completion_tokens: u32,
    /// Sum of both
    #[serde(default)]
    pub total_tokens: u32,
}

/// One completion alternative
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Position in `choices`
    #[serde(default)]
    pub index: u32,
    /// Generated message
    pub message: ChatMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Response of `POST /chat/completions`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completion id
    #[serde(default)]
    pub id: Option<String>,
    /// Generated alternatives
    pub choices: Vec<Choice>,
    /// Token usage, when reported
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Text of `choices[0].message.content`
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|choice| choice.message.content.as_str())
    }
}

/// How generated images are returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageResponseFormat {
    /// Hosted URL
    Url,
    /// Inline base64 PNG
    B64Json,
}

/// Body of `POST /images/generations`
#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationRequest {
    /// Model identifier
    pub model: String,
    /// Image description
    pub prompt: String,
    /// Number of images
    pub n: u32,
    /// Size such as `1024x1024`
    pub size: String,
    /// URL or inline bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ImageResponseFormat>,
}

/// One generated image
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    /// Hosted URL
    #[serde(default)]
    pub url: Option<String>,
    /// Inline base64 image
    #[serde(default)]
    pub b64_json: Option<String>,
    /// Prompt after provider-side rewriting
    #[serde(default)]
    pub revised_prompt: Option<String>,
}

/// Response of `POST /images/generations`
#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResponse {
    /// Unix timestamp
    #[serde(default)]
    pub created: Option<i64>,
    /// Generated images
    #[serde(default)]
    pub data: Vec<ImageData>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn chat_request_omits_unset_temperature() {
        let request = ChatRequest::new("gpt-3.5-turbo", vec![ChatMessage::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn chat_response_tolerates_missing_optional_fields() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Essay"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_content(), Some("Essay"));
        assert!(response.usage.is_none());
    }

    #[test]
    fn image_request_serializes_format_in_snake_case() {
        let request = ImageGenerationRequest {
            model: "dall-e-3".to_string(),
            prompt: "a lighthouse".to_string(),
            n: 1,
            size: "1024x1024".to_string(),
            response_format: Some(ImageResponseFormat::B64Json),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["response_format"], "b64_json");
    }
}
