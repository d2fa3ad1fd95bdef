//! LanceDB Vector Store - 디스크 영속 벡터 검색
//!
//! `--persist` / `--data-dir` 지정 시 사용하는 백엔드입니다.
//! 재시작해도 수집된 페이지가 남아 있으므로 재수집이 생략됩니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;

use crate::error::{QnaError, Result};

use super::vector::{SearchResult, VectorEntry, VectorStore};

// ============================================================================
// LanceVectorStore
// ============================================================================

/// LanceDB 벡터 저장소 구현
///
/// 테이블 하나가 컬렉션 하나에 대응합니다.
/// 영벡터(빈 페이지)는 `blank` 컬럼으로 표시해 코사인 검색에서 제외하고,
/// 결과가 모자랄 때만 뒤에 채웁니다.
pub struct LanceVectorStore {
    db: Connection,
    table_name: String,
    dimension: i32,
}

impl LanceVectorStore {
    /// LanceDB 저장소 열기
    ///
    /// # Arguments
    /// * `path` - .lance 디렉토리 경로
    /// * `table_name` - 컬렉션 이름
    /// * `dimension` - 임베딩 차원
    pub async fn open(path: &Path, table_name: &str, dimension: usize) -> Result<Self> {
        // 부모 디렉토리 생성
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| QnaError::store("Invalid path encoding"))?;

        let dimension = i32::try_from(dimension)
            .map_err(|_| QnaError::store(format!("Embedding dimension too large: {}", dimension)))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .map_err(|e| QnaError::store(format!("Failed to connect to LanceDB: {}", e)))?;

        tracing::debug!("LanceDB opened at {:?} (table={})", path, table_name);

        Ok(Self {
            db,
            table_name: table_name.to_string(),
            dimension,
        })
    }

    /// 벡터 테이블 스키마 생성
    fn create_schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("blank", DataType::Boolean, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(&self, entries: &[VectorEntry]) -> Result<RecordBatch> {
        if entries.is_empty() {
            return Err(QnaError::store("Cannot create batch from empty entries"));
        }

        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != self.dimension as usize)
        {
            return Err(QnaError::store(format!(
                "Embedding for {} has dimension {}, table expects {}",
                bad.id,
                bad.embedding.len(),
                self.dimension
            )));
        }

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
        let blanks: Vec<bool> = entries
            .iter()
            .map(|e| e.embedding.iter().all(|v| *v == 0.0))
            .collect();

        // 임베딩을 FixedSizeList로 변환
        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            self.dimension,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .map_err(|e| QnaError::store(format!("Failed to create embedding array: {}", e)))?;

        RecordBatch::try_new(
            Arc::new(self.create_schema()),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(texts)),
                Arc::new(BooleanArray::from(blanks)),
                Arc::new(embeddings_list),
            ],
        )
        .map_err(|e| QnaError::store(format!("Failed to create RecordBatch: {}", e)))
    }

    /// 테이블 존재 여부 확인
    async fn table_exists(&self) -> Result<bool> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| QnaError::store(format!("Failed to list tables: {}", e)))?;
        Ok(names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<lancedb::table::Table> {
        self.db
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| QnaError::store(format!("Failed to open table: {}", e)))
    }
}

/// 결과 스트림을 `SearchResult`로 변환
///
/// `_distance`(코사인 거리)가 있으면 `1 - distance`, 없거나 NaN이면 0.0.
async fn collect_results<S, E>(stream: S) -> Result<Vec<SearchResult>>
where
    S: futures::Stream<Item = std::result::Result<RecordBatch, E>>,
    E: std::fmt::Display,
{
    let batches: Vec<RecordBatch> = stream
        .try_collect()
        .await
        .map_err(|e| QnaError::store(format!("Failed to read search results: {}", e)))?;

    let mut results = Vec::new();

    for batch in batches {
        let ids = batch
            .column_by_name("id")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| QnaError::store("Missing id column"))?;

        let texts = batch
            .column_by_name("text")
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
            .ok_or_else(|| QnaError::store("Missing text column"))?;

        // _distance 컬럼 (벡터 검색 시 LanceDB가 자동 추가)
        let distances = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

        for i in 0..batch.num_rows() {
            let similarity = distances
                .map(|d| 1.0 - d.value(i))
                .filter(|s| !s.is_nan())
                .unwrap_or(0.0);

            results.push(SearchResult {
                id: ids.value(i).to_string(),
                text: texts.value(i).to_string(),
                similarity,
            });
        }
    }

    Ok(results)
}

/// 필터 식의 문자열 리터럴 이스케이프
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn insert_batch(&self, entries: &[VectorEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let batch = self.entries_to_batch(entries)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if self.table_exists().await? {
            // 기존 테이블에 추가
            self.open_table()
                .await?
                .add(batches)
                .execute()
                .await
                .map_err(|e| QnaError::store(format!("Failed to add vectors to table: {}", e)))?;
        } else {
            // 새 테이블 생성
            self.db
                .create_table(&self.table_name, batches)
                .execute()
                .await
                .map_err(|e| QnaError::store(format!("Failed to create table: {}", e)))?;
        }

        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        if limit == 0 || !self.table_exists().await? {
            return Ok(vec![]);
        }

        let table = self.open_table().await?;

        // 코사인 검색 (영벡터 제외)
        let stream = table
            .vector_search(query_embedding.to_vec())
            .map_err(|e| QnaError::store(format!("Failed to create vector search: {}", e)))?
            .distance_type(DistanceType::Cosine)
            .only_if("blank = false")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| QnaError::store(format!("Failed to execute vector search: {}", e)))?;

        let mut search_results = collect_results(stream).await?;

        // 모자라면 빈 페이지로 채움 (유사도 0)
        if search_results.len() < limit {
            let stream = table
                .query()
                .only_if("blank = true")
                .limit(limit - search_results.len())
                .execute()
                .await
                .map_err(|e| QnaError::store(format!("Failed to query blank rows: {}", e)))?;
            search_results.extend(collect_results(stream).await?);
        }

        Ok(search_results)
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await? {
            return Ok(0);
        }

        self.open_table()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| QnaError::store(format!("Failed to count rows: {}", e)))
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        if !self.table_exists().await? {
            return Ok(false);
        }

        let filter = format!("id = {}", quote_literal(id));
        let count = self
            .open_table()
            .await?
            .count_rows(Some(filter))
            .await
            .map_err(|e| QnaError::store(format!("Failed to count rows for id: {}", e)))?;

        Ok(count > 0)
    }

    fn backend(&self) -> &'static str {
        "lancedb"
    }
}

// ============================================================================
// Tests
// ============================================================================
