//! Passage Collection - 임베딩을 내장한 페이지 저장소
//!
//! `(id, text)`를 받아 문서 모드로 임베딩 후 저장하고,
//! 질의 텍스트를 질의 모드로 임베딩하여 최근접 페이지를 찾습니다.

use std::sync::Arc;

use async_trait::async_trait;

use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{QnaError, Result};

use super::vector::{VectorEntry, VectorStore};

/// 기본 컬렉션 이름
pub const DEFAULT_COLLECTION: &str = "QnA";

/// 검색된 페이지
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub id: String,
    pub text: String,
}

// ============================================================================
// PassageStore Trait
// ============================================================================

/// 페이지 저장소 트레이트
///
/// 세션 컨트롤러는 이 인터페이스만 알며, 백엔드(메모리/LanceDB)는 교체 가능합니다.
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// 페이지 추가 (문서 모드 임베딩)
    ///
    /// 같은 ID가 이미 있으면 `DuplicateId`.
    async fn insert(&self, id: &str, text: &str) -> Result<()>;

    /// 저장된 페이지 수
    async fn count(&self) -> Result<usize>;

    /// 질의와 가장 가까운 `k`개 페이지 (가까운 순)
    async fn query(&self, text: &str, k: usize) -> Result<Vec<Passage>>;
}

// ============================================================================
// Collection
// ============================================================================

/// 임베딩 프로바이더 + 벡터 인덱스 조합
pub struct Collection {
    name: String,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Box<dyn VectorStore>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Box<dyn VectorStore>,
    ) -> Self {
        let name = name.into();
        tracing::info!(
            "Collection '{}' using {} backend with {} embeddings",
            name,
            index.backend(),
            embedder.name()
        );
        Self {
            name,
            embedder,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl PassageStore for Collection {
    async fn insert(&self, id: &str, text: &str) -> Result<()> {
        if self.index.contains(id).await? {
            return Err(QnaError::DuplicateId(id.to_string()));
        }

        let embedding = self.embedder.embed(text, EmbeddingMode::Document).await?;

        self.index
            .insert_batch(&[VectorEntry {
                id: id.to_string(),
                text: text.to_string(),
                embedding,
            }])
            .await?;

        tracing::debug!("Inserted {} into '{}' ({} chars)", id, self.name, text.len());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.index.count().await
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<Passage>> {
        // 빈 저장소는 임베딩 호출 없이 빈 결과
        if k == 0 || self.index.count().await? == 0 {
            return Ok(vec![]);
        }

        let embedding = self.embedder.embed(text, EmbeddingMode::Query).await?;
        let results = self.index.search(&embedding, k).await?;

        tracing::debug!(
            "Query matched {:?}",
            results
                .iter()
                .map(|r| (r.id.as_str(), r.similarity))
                .collect::<Vec<_>>()
        );

        Ok(results
            .into_iter()
            .map(|r| Passage {
                id: r.id,
                text: r.text,
            })
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
