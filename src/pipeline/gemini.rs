//! Inference backend seam and the Gemini `generateContent` implementation.
//!
//! [`InferenceBackend`] is the only place the conversion service touches the
//! network. Backends classify every failure into an [`InferenceError`]
//! variant where it is first observed, so callers never inspect message
//! text to decide whether to retry.

use crate::error::{DocuError, InferenceError};
use crate::pipeline::encode::InlineAttachment;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Everything needed for one inference call.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub attachment: InlineAttachment,
    pub instruction: String,
    /// Schema the JSON reply must conform to.
    pub response_schema: Value,
    pub temperature: Option<f32>,
}

/// What came back from a successful call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceReply {
    /// Concatenated text payload; `None` when the endpoint produced no text.
    pub text: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: Option<String>,
}

/// A multimodal model endpoint.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Submit one request. Must not retry internally.
    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InferenceError>;
}

/// Google Gemini REST backend.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, DocuError> {
        let client = Client::builder()
            .user_agent(concat!("docustructure/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocuError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl InferenceBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InferenceError> {
        let body = GenerateContentRequest::from_request(request);

        debug!(
            model = %self.model,
            attachment_b64 = request.attachment.data.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &text));
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| InferenceError::Api {
                status: status.as_u16(),
                detail: format!("unreadable response body: {e}"),
            })?;

        Ok(parsed.into_reply())
    }
}

/// Map a non-success HTTP response to an [`InferenceError`].
///
/// Uses the status code and the `error.status` / `error.details[].reason`
/// fields of Google's error envelope; the human-readable message is only
/// carried along as detail.
pub fn classify_failure(status: StatusCode, body: &str) -> InferenceError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let detail = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let google_status = envelope.as_ref().map(|e| e.error.status.as_str()).unwrap_or("");
    let key_invalid = envelope.as_ref().is_some_and(|e| {
        e.error
            .details
            .iter()
            .any(|d| d.reason.as_deref() == Some("API_KEY_INVALID"))
    });

    if status == StatusCode::SERVICE_UNAVAILABLE || google_status == "UNAVAILABLE" {
        return InferenceError::Overloaded { detail };
    }
    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || google_status == "UNAUTHENTICATED"
        || google_status == "PERMISSION_DENIED"
        || key_invalid
    {
        return InferenceError::AuthRejected {
            status: status.as_u16(),
            detail,
        };
    }
    InferenceError::Api {
        status: status.as_u16(),
        detail,
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: &'a InlineAttachment,
    },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl<'a> GenerateContentRequest<'a> {
    fn from_request(request: &'a InferenceRequest) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::InlineData {
                        inline_data: &request.attachment,
                    },
                    Part::Text {
                        text: &request.instruction,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
                temperature: request.temperature,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_reply(self) -> InferenceReply {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            warn!("Prompt blocked by provider: {}", reason);
        }

        let usage = self.usage_metadata.unwrap_or_default();
        let first = self.candidates.into_iter().next();
        let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());

        let text: String = first
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter(|p| p.thought != Some(true))
                    .filter_map(|p| p.text)
                    .collect()
            })
            .unwrap_or_default();

        InferenceReply {
            text: if text.trim().is_empty() { None } else { Some(text) },
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            finish_reason,
        }
    }
}
