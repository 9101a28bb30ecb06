//! Gemini client: the single point of entry for all Gemini API calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! All collaborator interactions MUST go through this module.
//!
//! Models are hardcoded, not configurable, to prevent drift. One request per
//! user-initiated operation; failures surface immediately with no automatic
//! retries.

use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

/// Model used for structure generation, evaluation, and chat.
pub const TEXT_MODEL: &str = "gemini-3-pro-preview";
/// Model used for image generation.
pub const IMAGE_MODEL: &str = "gemini-3-pro-image-preview";

const JSON_MIME: &str = "application/json";
/// Generated images are always square.
const IMAGE_ASPECT_RATIO: &str = "1:1";
/// Total deadline for single-shot calls. Streamed replies are exempt: they
/// are bounded per chunk by STREAM_IDLE_TIMEOUT instead, so a long reply is
/// never cut off while it is still producing.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest tolerated gap between chunks of a streamed reply.
const STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gemini returned no text content")]
    EmptyContent,

    #[error("Gemini returned no image data")]
    NoImage,

    #[error("Stream stalled: no data for {}s", STREAM_IDLE_TIMEOUT.as_secs())]
    StreamStalled,
}

// ────────────────────────────────────────────────────────────────────────────
// Request wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> Content<'a> {
    fn turn(role: &'a str, text: &'a str) -> Self {
        Content {
            role: Some(role),
            parts: vec![Part { text }],
        }
    }

    fn system(text: &'a str) -> Self {
        Content {
            role: None,
            parts: vec![Part { text }],
        }
    }
}

/// Request knobs forwarded as `generationConfig`. Build with struct update
/// syntax from `Default` and set only what the call needs.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_budget: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: &'static str,
    pub image_size: &'static str,
}

/// Output resolution for image generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::OneK => "1K",
            ImageSize::TwoK => "2K",
            ImageSize::FourK => "4K",
        }
    }
}

/// One prior exchange in the consultant chat, as supplied by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Response wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

/// Base64 payload of a generated image, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

impl GenerateResponse {
    /// Text of the first candidate's first text part.
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.text.as_deref())
    }

    /// First inline image payload, if any.
    fn first_inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
    }

    fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    error: GeminiApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client shared by every collaborator-facing feature.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    // Streamed replies get their own client: the total request deadline on
    // `client` would cap the whole reply, however long.
    stream_client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            stream_client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            api_key,
        }
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model, self.api_key
        )
    }

    /// Makes a single generateContent call and parses the response envelope.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<GenerateResponse, GeminiError> {
        let response = self
            .client
            .post(self.generate_url(model))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: prompt_tokens={:?}, candidate_tokens={:?}, total_tokens={:?}",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        Ok(parsed)
    }

    /// Calls the text model and deserializes the response text as JSON.
    /// `responseMimeType` is forced to JSON; markdown code fences are
    /// stripped if the model wraps its output in them anyway.
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        config: GenerationConfig,
    ) -> Result<T, GeminiError> {
        let config = GenerationConfig {
            response_mime_type: Some(JSON_MIME),
            ..config
        };
        let request = GenerateRequest {
            contents: vec![Content::turn("user", prompt)],
            system_instruction: Some(Content::system(system)),
            generation_config: Some(config),
        };

        let response = self.generate(TEXT_MODEL, &request).await?;
        let text = match response.first_text() {
            Some(t) => t,
            None => {
                if let Some(reason) = response.finish_reason() {
                    warn!("Gemini returned no usable text (finish_reason: {reason})");
                }
                return Err(GeminiError::EmptyContent);
            }
        };

        let text = strip_json_fences(text);
        serde_json::from_str(text).map_err(GeminiError::Parse)
    }

    /// Generates one image and returns its inline payload.
    pub async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
    ) -> Result<InlineData, GeminiError> {
        let request = GenerateRequest {
            contents: vec![Content::turn("user", prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: IMAGE_ASPECT_RATIO,
                    image_size: size.as_str(),
                }),
                ..Default::default()
            }),
        };

        let response = self.generate(IMAGE_MODEL, &request).await?;
        response
            .first_inline_data()
            .cloned()
            .ok_or(GeminiError::NoImage)
    }

    /// Streams a chat reply as an ordered sequence of text fragments.
    ///
    /// The request is not issued until the stream is first polled, and
    /// dropping the stream cancels the in-flight call. Fragments must be
    /// appended in yield order; the sequence is not restartable. There is
    /// no total deadline: the reply may run as long as chunks keep arriving
    /// within the idle bound.
    pub fn stream_chat(
        &self,
        history: Vec<ChatTurn>,
        message: String,
    ) -> impl Stream<Item = Result<String, GeminiError>> + Send + 'static {
        let client = self.stream_client.clone();
        let url = self.stream_url(TEXT_MODEL);

        async_stream::try_stream! {
            let mut contents: Vec<Content<'_>> = history
                .iter()
                .map(|turn| Content::turn(turn.role.as_str(), &turn.text))
                .collect();
            contents.push(Content::turn("user", &message));

            let request = GenerateRequest {
                contents,
                system_instruction: Some(Content::system(prompts::CHAT_SYSTEM)),
                generation_config: None,
            };

            let response = client.post(&url).json(&request).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                Err(GeminiError::Api {
                    status: status.as_u16(),
                    message,
                })?;
                // Unreachable: the `?` above always propagates. Present so the
                // borrow checker sees this branch diverge before `response` is
                // consumed again below.
                return;
            }

            let mut body = response.bytes_stream();
            let mut buf: Vec<u8> = Vec::new();

            while let Some(chunk) = next_chunk(&mut body).await? {
                buf.extend_from_slice(&chunk);

                while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    if let Some(delta) = parse_sse_line(&line)? {
                        yield delta;
                    }
                }
            }

            // A conforming stream ends every line with a newline, but don't
            // drop a final fragment if the upstream closes without one.
            if !buf.is_empty() {
                if let Some(delta) = parse_sse_line(&buf)? {
                    yield delta;
                }
            }
        }
    }
}

/// Next chunk of a streamed body. A gap longer than the idle timeout fails
/// the stream rather than hanging it.
async fn next_chunk<S>(body: &mut S) -> Result<Option<Bytes>, GeminiError>
where
    S: Stream<Item = reqwest::Result<Bytes>> + Unpin,
{
    match tokio::time::timeout(STREAM_IDLE_TIMEOUT, body.next()).await {
        Ok(Some(chunk)) => Ok(Some(chunk?)),
        Ok(None) => Ok(None),
        Err(_) => Err(GeminiError::StreamStalled),
    }
}

/// Parses one SSE line from a streamGenerateContent response. Returns the
/// text delta carried by a `data:` line; blanks, comments, and other fields
/// yield nothing.
fn parse_sse_line(line: &[u8]) -> Result<Option<String>, GeminiError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim(),
        None => return Ok(None),
    };
    if payload.is_empty() {
        return Ok(None);
    }

    let chunk: GenerateResponse = serde_json::from_str(payload)?;
    Ok(chunk
        .first_text()
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_generate_request_wire_shape() {
        let request = GenerateRequest {
            contents: vec![Content::turn("user", "hello")],
            system_instruction: Some(Content::system("be brief")),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some(JSON_MIME),
                thinking_config: Some(ThinkingConfig {
                    thinking_budget: 2048,
                }),
                ..Default::default()
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            2048
        );
        assert!(json["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_image_config_wire_shape() {
        let config = GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: IMAGE_ASPECT_RATIO,
                image_size: ImageSize::TwoK.as_str(),
            }),
            ..Default::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["imageConfig"]["aspectRatio"], "1:1");
        assert_eq!(json["imageConfig"]["imageSize"], "2K");
    }

    #[test]
    fn test_image_size_serde_labels() {
        assert_eq!(serde_json::to_string(&ImageSize::FourK).unwrap(), r#""4K""#);
        let parsed: ImageSize = serde_json::from_str(r#""1K""#).unwrap();
        assert_eq!(parsed, ImageSize::OneK);
        assert_eq!(ImageSize::default(), ImageSize::OneK);
    }

    #[test]
    fn test_chat_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::Model).unwrap(), r#""model""#);
        let parsed: ChatRole = serde_json::from_str(r#""user""#).unwrap();
        assert_eq!(parsed, ChatRole::User);
    }

    #[test]
    fn test_response_text_and_usage_parse() {
        let json = r#"{
            "candidates": [
                {
                    "content": { "parts": [{ "text": "{\"ok\":true}" }] },
                    "finishReason": "STOP"
                }
            ],
            "usageMetadata": {
                "promptTokenCount": 12,
                "candidatesTokenCount": 34,
                "totalTokenCount": 46
            }
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text(), Some("{\"ok\":true}"));
        assert_eq!(response.finish_reason(), Some("STOP"));
        assert!(response.first_inline_data().is_none());
    }

    #[test]
    fn test_response_inline_data_parse() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
                        ]
                    }
                }
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        let inline = response.first_inline_data().unwrap();
        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data, "aGVsbG8=");
        assert!(response.first_text().is_none());
    }

    #[test]
    fn test_parse_sse_line_extracts_delta() {
        let line = br#"data: {"candidates":[{"content":{"parts":[{"text":"Hello"}]}}]}"#;
        let delta = parse_sse_line(line).unwrap();
        assert_eq!(delta.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_parse_sse_line_skips_blanks_and_comments() {
        assert!(parse_sse_line(b"\n").unwrap().is_none());
        assert!(parse_sse_line(b": keep-alive\n").unwrap().is_none());
        assert!(parse_sse_line(b"event: message\n").unwrap().is_none());
        assert!(parse_sse_line(b"data: \n").unwrap().is_none());
    }

    #[test]
    fn test_parse_sse_line_rejects_bad_json() {
        assert!(parse_sse_line(b"data: {not json}\n").is_err());
    }

    #[test]
    fn test_parse_sse_line_drops_empty_delta() {
        let line = br#"data: {"candidates":[{"content":{"parts":[{"text":""}]}}]}"#;
        assert!(parse_sse_line(line).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_chunk_passes_chunks_through_in_order() {
        let mut body = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"data: a\n")),
            Ok(Bytes::from_static(b"data: b\n")),
        ]);

        let first = next_chunk(&mut body).await.unwrap().unwrap();
        assert_eq!(&first[..], b"data: a\n");
        let second = next_chunk(&mut body).await.unwrap().unwrap();
        assert_eq!(&second[..], b"data: b\n");
        assert!(next_chunk(&mut body).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_chunk_fails_when_the_stream_stalls() {
        let mut body = futures::stream::pending::<reqwest::Result<Bytes>>();
        assert!(matches!(
            next_chunk(&mut body).await,
            Err(GeminiError::StreamStalled)
        ));
    }
}
