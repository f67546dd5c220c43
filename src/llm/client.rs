//! Remote model client trait and provider implementations.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::types::{ModelVerdict, SYSTEM_PROMPT};

/// Per-attempt timeout for vision model calls.
pub const VISION_TIMEOUT_SECS: u64 = 25;

/// Remote classification client.
///
/// Implementations return `Ok` with an [`ModelVerdict::inconclusive`] value
/// on unparseable model output, and `Err` only on transport or API failure.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Classify a text artifact.
    async fn classify(&self, message: &str, sender: &str) -> Result<ModelVerdict>;

    /// Classify an image artifact. Providers without vision support reject.
    async fn classify_image(&self, image: &[u8], mime_type: &str) -> Result<ModelVerdict> {
        let _ = (image, mime_type);
        Err(Error::model(self.provider(), "image analysis not supported"))
    }

    /// Provider name for diagnostics.
    fn provider(&self) -> &'static str;
}

/// Configuration for model clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key
    pub api_key: String,
    /// Base URL override
    pub base_url: Option<String>,
    /// Model override
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            model: None,
            timeout_secs: 30,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Construct the HTTP client for this config.
    ///
    /// reqwest's default builder probes the system proxy configuration,
    /// which is known to panic inside locked-down sandboxes. Any panic or
    /// build error downgrades to a proxy-less client.
    fn http_client(&self) -> Client {
        let timeout = Duration::from_secs(self.timeout_secs);

        let attempt = catch_unwind(AssertUnwindSafe(|| {
            Client::builder().timeout(timeout).build()
        }));
        if let Ok(Ok(client)) = attempt {
            return client;
        }

        Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client")
    }
}

/// Groq text-model client (OpenAI-compatible chat completions).
pub struct GroqClient {
    config: ClientConfig,
    http: Client,
}

impl GroqClient {
    const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai";
    const DEFAULT_MODEL: &'static str = "llama-3.1-8b-instant";

    pub fn new(config: ClientConfig) -> Self {
        let http = config.http_client();
        Self { config, http }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }
}

// Groq API types
#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroqMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqMessage,
}

#[derive(Debug, Deserialize)]
struct GroqError {
    error: GroqErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GroqErrorDetail {
    message: String,
}

#[async_trait]
impl ModelClient for GroqClient {
    async fn classify(&self, message: &str, sender: &str) -> Result<ModelVerdict> {
        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        let api_request = GroqRequest {
            model,
            messages: vec![
                GroqMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                GroqMessage {
                    role: "user".to_string(),
                    content: format!("Sender: {sender}\nMessage: {message}"),
                },
            ],
            temperature: 0.1,
            max_tokens: 200,
        };

        let url = format!("{}/v1/chat/completions", self.base_url());

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::model("groq", format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::model("groq", format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<GroqError>(&body) {
                return Err(Error::model("groq", error.error.message));
            }
            return Err(Error::model("groq", format!("API error ({status}): {body}")));
        }

        let api_response: GroqResponse = serde_json::from_str(&body)
            .map_err(|e| Error::model("groq", format!("Failed to parse response: {e}")))?;

        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        Ok(ModelVerdict::parse(content).unwrap_or_else(|_| {
            debug!("groq returned non-JSON verdict, using safe default");
            ModelVerdict::inconclusive()
        }))
    }

    fn provider(&self) -> &'static str {
        "groq"
    }
}

/// Google Gemini client. Used for vision analysis and as a text fallback.
pub struct GeminiClient {
    config: ClientConfig,
    http: Client,
    vision_http: Client,
    vision_models: Vec<String>,
}

impl GeminiClient {
    const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com";
    const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

    pub fn new(config: ClientConfig, vision_models: Vec<String>) -> Self {
        let http = config.http_client();
        let vision_http = config
            .clone()
            .with_timeout(VISION_TIMEOUT_SECS)
            .http_client();
        Self {
            config,
            http,
            vision_http,
            vision_models,
        }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(Self::DEFAULT_BASE_URL)
    }

    async fn generate(
        &self,
        http: &Client,
        model: &str,
        parts: Vec<GeminiPart>,
    ) -> Result<ModelVerdict> {
        let api_request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            system_instruction: Some(GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart::text(SYSTEM_PROMPT)],
            }),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url(),
            model,
            self.config.api_key
        );

        let response = http
            .post(&url)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::model("gemini", format!("HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::model("gemini", format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Error::model("gemini", format!("API error ({status})")));
        }

        let api_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| Error::model("gemini", format!("Failed to parse response: {e}")))?;

        let content = api_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(ModelVerdict::parse(&content).unwrap_or_else(|_| {
            debug!("gemini returned non-JSON verdict, using safe default");
            ModelVerdict::inconclusive()
        }))
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    fn text(s: impl Into<String>) -> Self {
        Self {
            text: Some(s.into()),
            inline_data: None,
        }
    }

    fn image(mime_type: &str, data: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(GeminiInlineData {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(data),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn classify(&self, message: &str, sender: &str) -> Result<ModelVerdict> {
        let model = self
            .config
            .model
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_MODEL.to_string());

        self.generate(
            &self.http,
            &model,
            vec![GeminiPart::text(format!(
                "Sender: {sender}\nMessage: {message}"
            ))],
        )
        .await
    }

    /// Try each configured vision model in priority order, falling through
    /// on 4xx/5xx/timeout.
    async fn classify_image(&self, image: &[u8], mime_type: &str) -> Result<ModelVerdict> {
        for model in &self.vision_models {
            let parts = vec![
                GeminiPart::text("Extract the message from this screenshot and classify it."),
                GeminiPart::image(mime_type, image),
            ];
            match self.generate(&self.vision_http, model, parts).await {
                Ok(verdict) => return Ok(verdict),
                Err(e) => {
                    warn!(model = %model, error = %e, "vision model attempt failed");
                }
            }
        }

        Err(Error::model("gemini", "all vision models failed"))
    }

    fn provider(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new("test-key")
            .with_base_url("https://custom.api.com")
            .with_model("llama-3.3-70b")
            .with_timeout(10);

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, Some("https://custom.api.com".to_string()));
        assert_eq!(config.model, Some("llama-3.3-70b".to_string()));
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_gemini_image_part_encoding() {
        let part = GeminiPart::image("image/png", &[1, 2, 3]);
        let inline = part.inline_data.unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "AQID");
    }

    #[tokio::test]
    async fn test_default_image_rejection() {
        struct TextOnly;

        #[async_trait]
        impl ModelClient for TextOnly {
            async fn classify(&self, _m: &str, _s: &str) -> Result<ModelVerdict> {
                Ok(ModelVerdict::inconclusive())
            }
            fn provider(&self) -> &'static str {
                "text-only"
            }
        }

        let client = TextOnly;
        assert!(client.classify_image(&[0u8], "image/png").await.is_err());
    }
}
