//! 콘텐츠 추출 모듈
//!
//! PDF 파일에서 페이지별 텍스트를 추출합니다.
//! - PDF 파일: pdf-extract로 텍스트 추출

pub mod pdf;

use std::path::Path;

use async_trait::async_trait;

use crate::error::{QnaError, Result};

// ============================================================================
// PageExtractor Trait
// ============================================================================

/// 페이지 추출기 트레이트
///
/// 파일 경로를 받아 문서 순서대로 페이지 텍스트 목록을 반환합니다.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<Vec<String>>;
}

// ============================================================================
// PDF Extractor
// ============================================================================

/// pdf-extract 기반 PDF 추출기
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PageExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<String>> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        // 파서 내부 panic도 JoinError로 잡혀 읽기 실패로 보고됨
        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || pdf::extract_text_from_pdf(&owned))
            .await
            .map_err(|e| QnaError::unreadable(path, format!("PDF extraction task failed: {}", e)))??;

        tracing::debug!("Extracted {} pages from {:?}", pages.len(), path);
        Ok(pages)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pdf_extractor_missing_file() {
        let extractor = PdfExtractor::new();
        let result = extractor.extract(Path::new("no-such-file.pdf")).await;
        assert!(matches!(
            result,
            Err(QnaError::FileNotFoundOrUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_pdf_extractor_reads_pages() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&crate::testing::minimal_pdf(&["The sky is blue.", "Water boils at 100C."]))
            .unwrap();

        let pages = PdfExtractor::new().extract(file.path()).await.unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("sky"));
        assert!(pages[1].contains("Water"));
    }
}
