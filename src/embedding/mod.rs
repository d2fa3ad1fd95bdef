//! 임베딩 모듈 - Gemini API를 통한 텍스트 벡터화
//!
//! 문서 모드와 질의 모드 두 가지 태스크 타입으로 텍스트를 벡터로 변환합니다.
//! 일시적 오류(타임아웃, 429, 5xx)는 지수 백오프로 재시도하고,
//! 영구 오류(잘못된 입력, 인증 실패)는 즉시 실패합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = GeminiEmbedding::new(api_key)?;
//! let embedding = embedder.embed("Hello, world!", EmbeddingMode::Query).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{QnaError, Result};

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 모드
///
/// 같은 텍스트라도 모드에 따라 다른 태스크 힌트로 인코딩됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// 저장 대상 문서 (질의와 비교될 벡터)
    Document,
    /// 검색 질의 (저장된 문서와 비교될 벡터)
    Query,
}

impl EmbeddingMode {
    /// Gemini `taskType` 값
    pub fn task_type(self) -> &'static str {
        match self {
            EmbeddingMode::Document => "RETRIEVAL_DOCUMENT",
            EmbeddingMode::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>>;

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Retry Policy
// ============================================================================

/// 재시도 정책 (일시적 오류 전용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최초 요청 이후 최대 재시도 횟수
    pub max_retries: u32,
    /// 첫 재시도 전 대기 시간. 이후 매번 2배
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// `attempt`번째 실패 후 대기 시간 (0부터 시작)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// 재시도 대상 HTTP 상태 (rate limit, 서버 일시 오류)
fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

// ============================================================================
// Google Gemini Embedding
// ============================================================================

/// Gemini API 기본 주소
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// 기본 임베딩 모델
/// source: https://ai.google.dev/gemini-api/docs/embeddings
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";

/// 기본 임베딩 차원 (text-embedding-004)
pub const DEFAULT_DIMENSION: usize = 768;

/// Google Gemini 임베딩 구현체
#[derive(Debug)]
pub struct GeminiEmbedding {
    api_key: String,
    client: reqwest::Client,
    base_url: Url,
    model: String,
    dimension: usize,
    retry: RetryPolicy,
}

impl GeminiEmbedding {
    /// 새 Gemini 임베딩 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| QnaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| QnaError::Config(format!("Invalid base URL: {}", e)))?;

        Ok(Self {
            api_key,
            client,
            base_url,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            retry: RetryPolicy::default(),
        })
    }

    /// API 주소 교체 (프록시, 테스트 서버)
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// 모델 교체 (`models/` 접두사는 없으면 붙임)
    pub fn with_model(mut self, model: impl AsRef<str>) -> Self {
        self.model = normalize_model_name(model.as_ref());
        self
    }

    /// 출력 차원 지정 (`outputDimensionality`로 매 요청에 전송)
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// 요청 타임아웃 교체 (본문 수신까지 포함)
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QnaError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 재시도 가능하면 백오프 후 true
    async fn wait_before_retry(&self, attempt: u32, reason: &str) -> bool {
        if attempt >= self.retry.max_retries {
            return false;
        }
        let backoff = self.retry.backoff(attempt);
        tracing::warn!(
            "{}, retrying in {:?} (attempt {}/{})",
            reason,
            backoff,
            attempt + 1,
            self.retry.max_retries
        );
        tokio::time::sleep(backoff).await;
        true
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/{}:embedContent",
            self.base_url.as_str().trim_end_matches('/'),
            self.model
        )
    }
}

/// 모델 이름을 `models/<name>` 형태로 맞춤
fn normalize_model_name(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

/// Gemini API 요청 본문
/// source: https://ai.google.dev/api/embeddings#method:-models.embedcontent
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
    #[serde(rename = "outputDimensionality")]
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

/// Gemini API 응답
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini API 에러 응답 (임베딩/생성 공용)
#[derive(Debug, Deserialize)]
pub(crate) struct GeminiError {
    pub(crate) error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeminiErrorDetail {
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) status: String,
}

/// 에러 응답 본문을 사람이 읽을 메시지로 변환
pub(crate) fn describe_api_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<GeminiError>(body) {
        Ok(error) => format!("Gemini API error ({}): {}", error.error.status, error.error.message),
        Err(_) => format!("Gemini API error ({}): {}", status, body),
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        // 빈 텍스트는 API 호출 없이 영벡터
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let request = EmbedRequest {
            model: &self.model,
            content: EmbedContent {
                parts: vec![EmbedPart { text }],
            },
            task_type: mode.task_type(),
            output_dimensionality: self.dimension,
        };
        let endpoint = self.endpoint();

        let mut last_error = String::new();

        // 재시도 루프 (일시적 오류 시 지수 백오프)
        for attempt in 0..=self.retry.max_retries {
            tracing::debug!(
                "Embedding request ({:?}, {} chars, attempt {})",
                mode,
                text.len(),
                attempt + 1
            );

            // API 키는 URL이 아닌 헤더로 전송
            let response = match self
                .client
                .post(&endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) if e.is_builder() => {
                    return Err(QnaError::EmbeddingService(format!(
                        "Invalid embedding request: {}",
                        e
                    )));
                }
                Err(e) => {
                    last_error = format!("Failed to send embedding request: {}", e);
                    if self.wait_before_retry(attempt, "Request failed").await {
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();

            // 본문 수신 중 끊김/타임아웃도 전송 오류와 같이 재시도
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    last_error = format!("Failed to read embedding response: {}", e);
                    if self.wait_before_retry(attempt, "Reading response failed").await {
                        continue;
                    }
                    break;
                }
            };

            if status.is_success() {
                let parsed: EmbedResponse = serde_json::from_str(&body).map_err(|e| {
                    QnaError::EmbeddingService(format!("Failed to parse embedding response: {}", e))
                })?;
                let values = parsed.embedding.values;
                if values.len() != self.dimension {
                    return Err(QnaError::EmbeddingService(format!(
                        "Unexpected embedding dimension: got {}, expected {}",
                        values.len(),
                        self.dimension
                    )));
                }
                return Ok(values);
            }

            if !is_transient_status(status) {
                // 영구 오류 - 즉시 실패
                return Err(QnaError::EmbeddingService(describe_api_error(status, &body)));
            }

            last_error = describe_api_error(status, &body);
            self.wait_before_retry(attempt, &format!("Transient error ({})", status))
                .await;
        }

        // 모든 재시도 실패
        Err(QnaError::EmbeddingService(format!(
            "Embedding failed after {} retries: {}",
            self.retry.max_retries, last_error
        )))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Tests
// ============================================================================
