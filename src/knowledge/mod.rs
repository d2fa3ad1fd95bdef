//! Knowledge 모듈 - 페이지 저장소
//!
//! - Collection: 임베딩을 내장한 `PassageStore` 구현
//! - Memory: 프로세스 수명 동안만 유지되는 기본 백엔드
//! - LanceDB: `--persist` 시 디스크 영속 백엔드

mod collection;
mod lance;
mod memory;
mod vector;

use std::path::{Path, PathBuf};

// Re-exports
pub use collection::{Collection, Passage, PassageStore, DEFAULT_COLLECTION};
pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;
pub use vector::{cosine_similarity, SearchResult, VectorEntry, VectorStore};

/// 데이터 디렉토리 경로 (`<data_local_dir>/.pdf-qna/`)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pdf-qna")
}

/// 데이터 디렉토리 안의 LanceDB 경로
pub fn lance_path(data_dir: &Path) -> PathBuf {
    data_dir.join("vectors.lance")
}
