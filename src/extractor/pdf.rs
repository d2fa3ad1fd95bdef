//! PDF 텍스트 추출 모듈
//!
//! pdf-extract 크레이트를 사용하여 PDF에서 페이지별 텍스트를 추출합니다.

use std::path::Path;

use crate::error::{QnaError, Result};

/// PDF에서 페이지별 텍스트 추출
///
/// 문서 순서대로 페이지당 하나의 문자열을 반환합니다.
/// 텍스트가 없는 페이지(스캔 이미지 등)는 빈 문자열로 남깁니다.
pub fn extract_text_from_pdf(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| QnaError::unreadable(path, e))?;
    extract_text_from_bytes(path, &bytes)
}

/// 메모리의 PDF 바이트에서 페이지별 텍스트 추출
///
/// `path`는 에러 메시지용입니다.
pub fn extract_text_from_bytes(path: &Path, bytes: &[u8]) -> Result<Vec<String>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| QnaError::unreadable(path, e))?;

    let empty_pages = pages.iter().filter(|p| p.trim().is_empty()).count();
    if empty_pages > 0 {
        tracing::warn!(
            "{} of {} pages in {:?} have no extractable text. It might be a scanned document.",
            empty_pages,
            pages.len(),
            path
        );
    }

    Ok(pages)
}

// ============================================================================
// Tests
// ============================================================================
