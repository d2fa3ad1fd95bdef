//! pdf-qna - PDF 질의응답 시스템
//!
//! PDF를 페이지 단위로 임베딩해 저장하고,
//! 질문과 가장 가까운 페이지 하나를 Gemini에 넘겨 답변을 생성합니다.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod knowledge;
pub mod session;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::{get_api_key, has_api_key, Settings};
pub use embedding::{EmbeddingMode, EmbeddingProvider, GeminiEmbedding, RetryPolicy};
pub use error::{QnaError, Result};
pub use extractor::{PageExtractor, PdfExtractor};
pub use generation::{build_prompt, AnswerGenerator, GeminiGenerator};
pub use knowledge::{
    Collection, LanceVectorStore, MemoryVectorStore, Passage, PassageStore, VectorEntry,
    VectorStore,
};
pub use session::{QueryOutcome, Session, SessionState};
