//! 답변 생성 모듈 - Gemini generateContent
//!
//! 질의와 검색된 페이지로 프롬프트를 만들어 생성 모델에 보내고,
//! 응답의 첫 번째 텍스트 파트를 답변으로 사용합니다.
//! 재시도는 하지 않습니다. 실패는 호출자(세션)가 보고합니다.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::embedding::{describe_api_error, DEFAULT_BASE_URL};
use crate::error::{QnaError, Result};

/// 기본 생성 모델
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-1.5-pro";

/// 프롬프트 구성
///
/// 형식: `Query: {query}\nRelevant Passage: {passage}`
pub fn build_prompt(query: &str, passage: &str) -> String {
    format!("Query: {}\nRelevant Passage: {}", query, passage)
}

// ============================================================================
// AnswerGenerator Trait
// ============================================================================

/// 답변 생성기 트레이트
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str, passage: &str) -> Result<String>;
}

// ============================================================================
// Gemini Generator
// ============================================================================

/// Gemini 생성 모델 구현체
#[derive(Debug)]
pub struct GeminiGenerator {
    api_key: String,
    client: reqwest::Client,
    base_url: Url,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String) -> Result<Self> {
        // 긴 답변 생성을 고려한 타임아웃
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| QnaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| QnaError::Config(format!("Invalid base URL: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url,
            model: DEFAULT_GENERATION_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// 모델 교체 (`models/` 접두사 없이)
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.as_str().trim_end_matches('/'),
            self.model.trim_start_matches("models/")
        )
    }
}

// ============================================================================
// API Types
// ============================================================================

/// source: https://ai.google.dev/api/generate-content
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// 첫 후보의 첫 텍스트 파트
    fn first_text(self) -> Result<String> {
        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            QnaError::GenerationService("Response contained no candidates".to_string())
        })?;

        let finish_reason = candidate.finish_reason.unwrap_or_default();
        candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                QnaError::GenerationService(format!(
                    "Response contained no text (finish reason: {})",
                    if finish_reason.is_empty() {
                        "unknown"
                    } else {
                        finish_reason.as_str()
                    }
                ))
            })
    }
}

#[async_trait]
impl AnswerGenerator for GeminiGenerator {
    async fn generate(&self, query: &str, passage: &str) -> Result<String> {
        let prompt = build_prompt(query, passage);
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: &prompt }],
            }],
        };

        tracing::debug!("Generating answer with {} ({} chars)", self.model, prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                QnaError::GenerationService(format!("Failed to send generation request: {}", e))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            QnaError::GenerationService(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(QnaError::GenerationService(describe_api_error(status, &body)));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            QnaError::GenerationService(format!("Failed to parse generation response: {}", e))
        })?;

        parsed.first_text()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-pro:generateContent";

    fn generator_for(server: &MockServer) -> GeminiGenerator {
        GeminiGenerator::new("fake_key".to_string())
            .unwrap()
            .with_base_url(Url::parse(&server.uri()).unwrap())
    }

    #[test]
    fn test_build_prompt_format() {
        assert_eq!(
            build_prompt("What color is the sky?", "The sky is blue."),
            "Query: What color is the sky?\nRelevant Passage: The sky is blue."
        );
    }

    #[test]
    fn test_endpoint_accepts_prefixed_model() {
        let generator = GeminiGenerator::new("k".to_string())
            .unwrap()
            .with_model("models/gemini-1.5-flash");
        assert!(generator
            .endpoint()
            .ends_with("/v1beta/models/gemini-1.5-flash:generateContent"));
    }

    #[tokio::test]
    async fn test_generate_returns_first_part() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(body_json(json!({
                "contents": [{ "parts": [{
                    "text": "Query: What color is the sky?\nRelevant Passage: The sky is blue."
                }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Blue." }, { "text": "ignored" }], "role": "model" },
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = generator_for(&server)
            .generate("What color is the sky?", "The sky is blue.")
            .await
            .unwrap();
        assert_eq!(answer, "Blue.");
    }

    #[tokio::test]
    async fn test_generate_service_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            })))
            .mount(&server)
            .await;

        let err = generator_for(&server).generate("q", "p").await.unwrap_err();
        assert!(matches!(err, QnaError::GenerationService(_)));
        assert!(err.to_string().contains("The model is overloaded."));
        // 생성 호출은 재시도하지 않음
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_blocked_response_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY" }]
            })))
            .mount(&server)
            .await;

        let err = generator_for(&server).generate("q", "p").await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
