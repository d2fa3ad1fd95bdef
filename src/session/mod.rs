//! 대화형 세션 컨트롤러
//!
//! 상태는 두 가지입니다.
//! - Ingesting: 시작 시 저장소가 비어 있을 때만. PDF 경로를 받아 페이지별로 저장
//! - Querying: 질문을 한 줄씩 읽어 검색 → 답변 생성 → 출력. `exit`로 종료
//!
//! 입력은 async 리더, 출력은 `std::io::Write`로 받아 테스트에서 메모리 버퍼로 구동합니다.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::TOP_K;
use crate::error::{QnaError, Result};
use crate::extractor::PageExtractor;
use crate::generation::AnswerGenerator;
use crate::knowledge::{Passage, PassageStore};

pub const PDF_PROMPT: &str = "Enter the path to your PDF: ";
pub const QUESTION_PROMPT: &str = "Your question: ";

const MSG_NO_DOCUMENTS: &str = "No documents found in the database. Please add your PDF.";
const MSG_INGESTED: &str = "Document added successfully. You can now ask questions.";
const MSG_READY: &str = "Ask me anything! (Type 'exit' to quit)";
const MSG_NO_PASSAGE: &str = "No relevant passage found.";
const MSG_GOODBYE: &str = "Goodbye!";

// ============================================================================
// Types
// ============================================================================

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ingesting,
    Querying,
}

/// 질문 한 건의 결과
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// 저장소에 검색 대상이 없음
    NoPassage,
    Answered {
        answer: String,
        /// 프롬프트에 들어간 한 줄짜리 페이지 텍스트
        passage: String,
    },
}

/// 페이지 ID (`page-<index>`, 0부터)
pub fn page_id(index: usize) -> String {
    format!("page-{}", index)
}

/// 종료 명령 여부 (앞뒤 공백 무시, 대소문자 무시)
pub fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("exit")
}

/// 검색된 페이지들을 공백으로 잇고 줄바꿈을 공백으로 치환
pub fn one_line(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .replace("\r\n", " ")
        .replace('\n', " ")
}

// ============================================================================
// Session
// ============================================================================

/// 세션 컨텍스트
///
/// 저장소, 추출기, 생성기를 명시적으로 주입받습니다.
pub struct Session {
    store: Arc<dyn PassageStore>,
    extractor: Arc<dyn PageExtractor>,
    generator: Arc<dyn AnswerGenerator>,
    pdf_path: Option<PathBuf>,
}

impl Session {
    pub fn new(
        store: Arc<dyn PassageStore>,
        extractor: Arc<dyn PageExtractor>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            store,
            extractor,
            generator,
            pdf_path: None,
        }
    }

    /// 첫 실행 시 경로를 묻지 않고 이 PDF를 사용
    pub fn with_pdf_path(mut self, pdf_path: Option<PathBuf>) -> Self {
        self.pdf_path = pdf_path;
        self
    }

    /// 시작 상태 결정
    pub async fn initial_state(&self) -> Result<SessionState> {
        if self.store.count().await? == 0 {
            Ok(SessionState::Ingesting)
        } else {
            Ok(SessionState::Querying)
        }
    }

    /// PDF 수집
    ///
    /// 페이지 순서대로 `page-<index>`로 저장합니다. 빈 페이지도 저장합니다.
    /// 중간 실패 시 이미 저장된 페이지는 그대로 남습니다.
    pub async fn ingest(&self, path: &Path) -> Result<usize> {
        let pages = self.extractor.extract(path).await?;

        for (index, text) in pages.iter().enumerate() {
            self.store.insert(&page_id(index), text).await?;
        }

        tracing::info!("Ingested {} pages from {:?}", pages.len(), path);
        Ok(pages.len())
    }

    /// 질문 한 건 처리: 검색 → 답변 생성
    pub async fn ask(&self, query: &str) -> Result<QueryOutcome> {
        let passages = self.store.query(query, TOP_K).await?;
        if passages.is_empty() {
            return Ok(QueryOutcome::NoPassage);
        }

        let passage = one_line(&passages);
        let answer = self.generator.generate(query, &passage).await?;

        Ok(QueryOutcome::Answered { answer, passage })
    }

    /// 대화형 루프 실행
    ///
    /// 수집 단계의 실패는 에러로 반환(프로그램 종료)하고,
    /// 질문 단계의 실패는 출력 후 루프를 이어갑니다.
    pub async fn run<R, W>(&self, input: &mut R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        if self.initial_state().await? == SessionState::Ingesting {
            writeln!(output, "{}", MSG_NO_DOCUMENTS)?;

            let path = match &self.pdf_path {
                Some(path) => path.clone(),
                None => match prompt_line(input, output, PDF_PROMPT).await? {
                    Some(line) => PathBuf::from(line.trim()),
                    None => return Err(QnaError::unreadable("", "no PDF path provided")),
                },
            };

            self.ingest(&path).await?;
            writeln!(output, "{}", MSG_INGESTED)?;
        }

        writeln!(output, "{}", MSG_READY)?;

        while let Some(line) = prompt_line(input, output, QUESTION_PROMPT).await? {
            let query = line.trim();
            if is_exit_command(query) {
                break;
            }

            match self.ask(query).await {
                Ok(QueryOutcome::NoPassage) => writeln!(output, "{}", MSG_NO_PASSAGE)?,
                Ok(QueryOutcome::Answered { answer, passage }) => {
                    writeln!(output, "Answer: {}", answer)?;
                    writeln!(output, "Passage: {}", passage)?;
                }
                Err(e) => {
                    tracing::warn!("Query failed: {}", e);
                    writeln!(output, "Error: {}", e)?;
                }
            }
        }

        writeln!(output, "{}", MSG_GOODBYE)?;
        Ok(())
    }
}

/// 프롬프트 출력 후 한 줄 읽기. EOF면 `None`
async fn prompt_line<R, W>(input: &mut R, output: &mut W, prompt: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        // 프롬프트 뒤 줄바꿈
        writeln!(output)?;
        return Ok(None);
    }

    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

// ============================================================================
// Tests
// ============================================================================
