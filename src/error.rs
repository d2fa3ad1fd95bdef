//! 에러 타입
//!
//! 라이브러리 계층은 `QnaError`를 반환하고,
//! 바이너리 경계(`main`, `cli::run`)에서 anyhow로 감쌉니다.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QnaError {
    /// PDF 경로가 없거나 유효한 PDF가 아님
    #[error("cannot read PDF {path:?}: {reason}")]
    FileNotFoundOrUnreadable { path: PathBuf, reason: String },

    /// 임베딩 API 영구 실패 (재시도 소진 포함)
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// 생성 API 실패
    #[error("generation service error: {0}")]
    GenerationService(String),

    /// 이미 저장된 페이지 ID
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// 벡터 저장소 백엔드 에러
    #[error("vector store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl QnaError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::FileNotFoundOrUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn store(reason: impl ToString) -> Self {
        Self::Store(reason.to_string())
    }
}

pub type Result<T, E = QnaError> = std::result::Result<T, E>;
