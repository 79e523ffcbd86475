use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::llm::orchestrator::GenerateContent;
use crate::llm::request::ImagePart;
use crate::utils::http::get_http_client;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const ERROR_BODY_LIMIT: usize = 2000;

/// A single failed or undecodable call to the generation service. The
/// message preserves the upstream error body (compacted) so the
/// orchestrator's classification can inspect it.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

#[derive(Debug, Deserialize)]
pub struct GeminiResponse {
    pub candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiContent {
    pub parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiInlineData {
    pub mime_type: String,
    pub data: String,
}

/// The first inline image of the response, as (mime type, base64 payload).
pub fn first_inline_image(response: &GeminiResponse) -> Option<(&str, &str)> {
    for candidate in response.candidates.as_deref().unwrap_or(&[]) {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[]);
        for part in parts {
            if let GeminiPart::InlineData { inline_data } = part {
                if inline_data.mime_type.starts_with("image/") {
                    return Some((&inline_data.mime_type, &inline_data.data));
                }
            }
        }
    }
    None
}

/// All non-empty text parts of the response, joined with newlines.
pub fn collect_text(response: &GeminiResponse) -> String {
    let mut text_parts = Vec::new();
    for candidate in response.candidates.as_deref().unwrap_or(&[]) {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[]);
        for part in parts {
            if let GeminiPart::Text { text } = part {
                if !text.trim().is_empty() {
                    text_parts.push(text.as_str());
                }
            }
        }
    }
    text_parts.join("\n")
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

/// Compacts an error body for the ServiceError message. JSON bodies are
/// re-serialized without whitespace so structured markers such as
/// `"code":500` survive substring classification.
fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => truncate_for_log(&value.to_string(), ERROR_BODY_LIMIT),
        Err(_) => truncate_for_log(trimmed, ERROR_BODY_LIMIT),
    }
}

fn summarize_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(Value::as_str)
                    .map(str::len)
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

/// Client for the Gemini `generateContent` endpoint. One call per
/// invocation; retry and fallback policy live in the orchestrator.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, timeout_secs: u64) -> Self {
        GeminiClient {
            http: get_http_client().clone(),
            api_key,
            model,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn redact_api_key(&self, text: &str) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }
}

impl GenerateContent for GeminiClient {
    async fn generate(
        &self,
        image_parts: &[ImagePart],
        instruction: &str,
    ) -> Result<GeminiResponse, ServiceError> {
        // Ordered image parts first, exactly one text part last.
        let mut parts: Vec<Value> = image_parts.iter().map(ImagePart::to_inline_part).collect();
        parts.push(json!({ "text": instruction }));

        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseModalities": ["IMAGE", "TEXT"] },
        });

        if tracing::enabled!(tracing::Level::DEBUG) {
            let summary = payload
                .pointer("/contents/0/parts")
                .and_then(Value::as_array)
                .map(|parts| summarize_parts(parts))
                .unwrap_or_default();
            debug!(target: "studio.gemini", model = %self.model, parts = %serde_json::Value::Array(summary));
        }

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_BASE, self.model, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                ServiceError(format!(
                    "Gemini request failed: {}",
                    self.redact_api_key(&err.to_string())
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError(format!(
                "Gemini request failed with status {}: {}",
                status,
                self.redact_api_key(&summarize_error_body(&body))
            )));
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(|err| ServiceError(format!("Gemini response could not be decoded: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_from(value: Value) -> GeminiResponse {
        serde_json::from_value(value).expect("valid response shape")
    }

    #[test]
    fn finds_the_first_inline_image() {
        let response = response_from(json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "BBBB" } }
                    ]
                }
            }]
        }));
        assert_eq!(first_inline_image(&response), Some(("image/png", "AAAA")));
    }

    #[test]
    fn ignores_non_image_inline_data() {
        let response = response_from(json!({
            "candidates": [{
                "content": {
                    "parts": [{ "inlineData": { "mimeType": "audio/wav", "data": "AAAA" } }]
                }
            }]
        }));
        assert_eq!(first_inline_image(&response), None);
    }

    #[test]
    fn collects_text_across_parts() {
        let response = response_from(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "first" }, { "text": "  " }, { "text": "second" }] }
            }]
        }));
        assert_eq!(collect_text(&response), "first\nsecond");
    }

    #[test]
    fn tolerates_empty_responses() {
        let response = response_from(json!({}));
        assert_eq!(first_inline_image(&response), None);
        assert_eq!(collect_text(&response), "");
    }

    #[test]
    fn compacts_json_error_bodies() {
        let body = "{\n  \"error\": {\n    \"code\": 500,\n    \"status\": \"INTERNAL\"\n  }\n}";
        let summary = summarize_error_body(body);
        assert!(summary.contains("\"code\":500"));
        assert!(summary.contains("INTERNAL"));
    }

    #[test]
    fn truncates_oversized_error_bodies() {
        let body = "x".repeat(ERROR_BODY_LIMIT + 100);
        let summary = summarize_error_body(&body);
        assert!(summary.ends_with("... (truncated)"));
    }

    #[test]
    fn redacts_the_api_key_from_messages() {
        let client = GeminiClient::new("secret-key".into(), "model".into(), 90);
        assert_eq!(
            client.redact_api_key("url?key=secret-key failed"),
            "url?key=[redacted] failed"
        );
    }
}
