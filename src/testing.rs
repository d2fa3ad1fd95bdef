//! 테스트용 결정적 가짜 구현
//!
//! 네트워크 없이 세션/저장소를 검증하기 위한 임베더, 생성기, 추출기입니다.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::error::{QnaError, Result};
use crate::extractor::PageExtractor;
use crate::generation::AnswerGenerator;

/// 키워드 사전 (차원 = 사전 크기)
const VOCABULARY: &[&str] = &[
    "sky", "blue", "color", "water", "boils", "temperature", "paris", "france",
];

/// 사전 단어 출현 횟수를 벡터로 쓰는 임베더
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    modes: Mutex<Vec<EmbeddingMode>>,
    fail_on: Option<EmbeddingMode>,
    fail_all: bool,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 호출 실패
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// 질의 모드 호출만 실패
    pub fn failing_queries() -> Self {
        Self {
            fail_on: Some(EmbeddingMode::Query),
            ..Self::default()
        }
    }

    /// 지금까지 호출된 모드 순서
    pub fn modes(&self) -> Vec<EmbeddingMode> {
        self.modes.lock().unwrap().clone()
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; VOCABULARY.len()];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if let Some(i) = VOCABULARY.iter().position(|v| *v == word) {
                vector[i] += 1.0;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str, mode: EmbeddingMode) -> Result<Vec<f32>> {
        self.modes.lock().unwrap().push(mode);
        if self.fail_all || self.fail_on == Some(mode) {
            return Err(QnaError::EmbeddingService(
                "Gemini API error (PERMISSION_DENIED): API key not valid.".to_string(),
            ));
        }
        Ok(Self::vectorize(text))
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }

    fn name(&self) -> &str {
        "keyword-fake"
    }
}

/// 프롬프트를 기록하고 고정 형식 답변을 돌려주는 생성기
#[derive(Debug, Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// 호출된 (query, passage) 목록
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for RecordingGenerator {
    async fn generate(&self, query: &str, passage: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), passage.to_string()));
        if self.fail {
            return Err(QnaError::GenerationService(
                "Gemini API error (UNAVAILABLE): The model is overloaded.".to_string(),
            ));
        }
        Ok(format!("answer to '{}'", query))
    }
}

/// 고정 페이지를 돌려주는 추출기
#[derive(Debug, Default)]
pub struct StaticExtractor {
    pages: Vec<String>,
    requested: Mutex<Vec<PathBuf>>,
}

impl StaticExtractor {
    pub fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// 요청된 경로 목록
    pub fn requested(&self) -> Vec<PathBuf> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageExtractor for StaticExtractor {
    async fn extract(&self, path: &Path) -> Result<Vec<String>> {
        self.requested.lock().unwrap().push(path.to_path_buf());
        if path.to_str() == Some("missing.pdf") {
            return Err(QnaError::unreadable(path, "No such file or directory"));
        }
        Ok(self.pages.clone())
    }
}

/// 페이지별 텍스트 한 줄씩 담은 최소 PDF (Helvetica, 빈 문자열은 빈 페이지)
pub fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let page_count = pages.len();
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let content = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 24 Tf 72 720 Td ({}) Tj ET", text)
        };
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    xref.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    pdf.extend_from_slice(xref.as_bytes());
    pdf
}
