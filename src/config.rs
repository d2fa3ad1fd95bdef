//! 설정 - 환경변수 + CLI 인자
//!
//! API 키는 환경변수에서만 읽습니다.
//! 나머지는 기본값 위에 CLI 인자를 덮어씁니다.

use std::path::PathBuf;

use url::Url;

use crate::embedding::{RetryPolicy, DEFAULT_BASE_URL, DEFAULT_DIMENSION, DEFAULT_EMBEDDING_MODEL};
use crate::error::{QnaError, Result};
use crate::generation::DEFAULT_GENERATION_MODEL;
use crate::knowledge::DEFAULT_COLLECTION;

/// API 키 환경변수 (우선순위 순)
pub const API_KEY_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// 검색 페이지 수. 단일 페이지만 프롬프트에 넣음
pub const TOP_K: usize = 1;

// ============================================================================
// API Key Management
// ============================================================================

/// API 키 로드 (환경변수에서)
///
/// 우선순위:
/// 1. `GOOGLE_API_KEY` 환경변수
/// 2. `GEMINI_API_KEY` 환경변수
pub fn get_api_key() -> Result<String> {
    for var in API_KEY_VARS {
        if let Ok(key) = std::env::var(var) {
            if !key.trim().is_empty() {
                tracing::debug!("Using API key from {}", var);
                return Ok(key.trim().to_string());
            }
        }
    }

    Err(QnaError::Config(
        "API key not found. Set GOOGLE_API_KEY (or GEMINI_API_KEY) environment variable.\n\
         Get your API key at: https://aistudio.google.com/app/apikey"
            .to_string(),
    ))
}

/// API 키 존재 여부 확인
pub fn has_api_key() -> bool {
    get_api_key().is_ok()
}

// ============================================================================
// Settings
// ============================================================================

/// 세션 설정
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: Url,
    pub embedding_model: String,
    /// 요청할 임베딩 차원 (`outputDimensionality`)
    pub embedding_dimension: usize,
    pub generation_model: String,
    pub collection: String,
    /// `Some`이면 LanceDB 영속 저장소, `None`이면 메모리
    pub data_dir: Option<PathBuf>,
    /// 첫 실행 시 경로 질문 대신 사용할 PDF
    pub pdf_path: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl Settings {
    /// 기본값 + 환경변수 API 키
    pub fn from_env() -> Result<Self> {
        Self::with_api_key(get_api_key()?)
    }

    pub fn with_api_key(api_key: String) -> Result<Self> {
        Ok(Self {
            api_key,
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_DIMENSION,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            data_dir: None,
            pdf_path: None,
            retry: RetryPolicy::default(),
        })
    }
}

/// API 주소 파싱 (http/https만 허용)
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| QnaError::Config(format!("Invalid base URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(QnaError::Config(format!(
            "Unsupported base URL scheme '{}': {}",
            other, raw
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
