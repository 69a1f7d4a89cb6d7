//! Response payloads for the OpenAI Audio Transcription API.
//!
//! The error envelope is shared by every OpenAI endpoint, so the chat
//! completion client decodes failures with the same types.

use serde::{Deserialize, Serialize};

/// Transcription response for the `json` format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// OpenAI API error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIErrorResponse {
    pub error: OpenAIError,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIError {
    pub message: String,

    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub param: Option<String>,

    #[serde(default)]
    pub code: Option<String>,
}

impl std::fmt::Display for OpenAIError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.error_type)
    }
}

impl std::error::Error for OpenAIError {}

/// Render a failed response body as a readable message.
pub fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OpenAIErrorResponse>(body) {
        Ok(parsed) => format!("OpenAI API error: {}", parsed.error),
        Err(_) => format!("OpenAI API error ({status}): {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_response_parsing() {
        let response: TranscriptionResponse =
            serde_json::from_str(r#"{"text": "Hello world"}"#).unwrap();
        assert_eq!(response.text, "Hello world");
    }

    #[test]
    fn test_error_parsing_and_display() {
        let json = r#"{"error": {"message": "Rate limit exceeded", "type": "rate_limit_error", "param": null, "code": "rate_limit"}}"#;
        let parsed: OpenAIErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error.code.as_deref(), Some("rate_limit"));
        assert_eq!(
            format!("{}", parsed.error),
            "Rate limit exceeded (rate_limit_error)"
        );
    }

    #[test]
    fn test_describe_error_falls_back_to_body() {
        let message = describe_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(message.contains("502"));
        assert!(message.contains("upstream down"));

        let message = describe_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error"}}"#,
        );
        assert_eq!(
            message,
            "OpenAI API error: Incorrect API key (invalid_request_error)"
        );
    }
}
