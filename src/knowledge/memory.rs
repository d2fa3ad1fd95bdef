//! In-memory Vector Store
//!
//! 프로세스 수명 동안만 유지되는 휘발성 저장소입니다.
//! 전수 코사인 유사도 비교로 검색합니다.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{QnaError, Result};

use super::vector::{cosine_similarity, SearchResult, VectorEntry, VectorStore};

/// 메모리 벡터 저장소
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    entries: RwLock<Vec<VectorEntry>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> QnaError {
    QnaError::store(format!("Lock error: {}", e))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn insert_batch(&self, entries: &[VectorEntry]) -> Result<usize> {
        let mut stored = self.entries.write().map_err(lock_error)?;
        stored.extend_from_slice(entries);
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let stored = self.entries.read().map_err(lock_error)?;

        let mut results: Vec<SearchResult> = stored
            .iter()
            .map(|entry| SearchResult {
                id: entry.id.clone(),
                text: entry.text.clone(),
                similarity: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        // 안정 정렬: 동점은 삽입 순서 유지
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(lock_error)?.len())
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        let stored = self.entries.read().map_err(lock_error)?;
        Ok(stored.iter().any(|entry| entry.id == id))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
