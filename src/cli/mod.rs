//! CLI 모듈
//!
//! 인자 없이 실행하면 메모리 저장소로 대화형 세션을 시작합니다.
//! 선택 인자로 영속 저장소, 모델, API 주소를 바꿀 수 있습니다.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;

use crate::config::{parse_base_url, Settings};
use crate::embedding::{EmbeddingProvider, GeminiEmbedding};
use crate::extractor::PdfExtractor;
use crate::generation::GeminiGenerator;
use crate::knowledge::{
    get_data_dir, lance_path, Collection, LanceVectorStore, MemoryVectorStore, VectorStore,
};
use crate::session::Session;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pdf-qna")]
#[command(version, about = "PDF 질의응답 - Gemini 임베딩 검색 + 답변 생성", long_about = None)]
pub struct Cli {
    /// 첫 실행 시 경로를 묻지 않고 이 PDF를 수집
    #[arg(long)]
    pub pdf: Option<PathBuf>,

    /// 기본 데이터 디렉토리에 영속 저장 (LanceDB)
    #[arg(long, conflicts_with = "data_dir")]
    pub persist: bool,

    /// 지정한 디렉토리에 영속 저장 (LanceDB)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// 임베딩 모델
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// 임베딩 차원 (모델이 지원하는 값)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub embedding_dimension: Option<u32>,

    /// 답변 생성 모델
    #[arg(long)]
    pub generation_model: Option<String>,

    /// Gemini API 주소
    #[arg(long)]
    pub base_url: Option<String>,

    /// 로그 상세도 (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// 기본 로그 레벨
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }

    /// 환경변수 설정 위에 CLI 인자 적용
    pub fn apply(&self, mut settings: Settings) -> Result<Settings> {
        if let Some(ref model) = self.embedding_model {
            settings.embedding_model = model.clone();
        }
        if let Some(dimension) = self.embedding_dimension {
            settings.embedding_dimension = dimension as usize;
        }
        if let Some(ref model) = self.generation_model {
            settings.generation_model = model.clone();
        }
        if let Some(ref raw) = self.base_url {
            settings.base_url = parse_base_url(raw)?;
        }
        if self.persist {
            settings.data_dir = Some(get_data_dir());
        }
        if let Some(ref dir) = self.data_dir {
            settings.data_dir = Some(dir.clone());
        }
        settings.pdf_path = self.pdf.clone();
        Ok(settings)
    }
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 실행
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    let settings = cli.apply(settings)?;

    let session = build_session(&settings).await?;

    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = std::io::stdout();

    session
        .run(&mut input, &mut output)
        .await
        .context("Session aborted")?;

    output.flush()?;
    Ok(())
}

/// 설정으로 세션 구성
pub async fn build_session(settings: &Settings) -> Result<Session> {
    let embedder = GeminiEmbedding::new(settings.api_key.clone())?
        .with_base_url(settings.base_url.clone())
        .with_model(&settings.embedding_model)
        .with_dimension(settings.embedding_dimension)
        .with_retry_policy(settings.retry);
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);

    let index: Box<dyn VectorStore> = match settings.data_dir {
        Some(ref dir) => {
            let path = lance_path(dir);
            Box::new(
                LanceVectorStore::open(&path, &settings.collection, embedder.dimension())
                    .await
                    .with_context(|| format!("Failed to open vector store at {:?}", path))?,
            )
        }
        None => Box::new(MemoryVectorStore::new()),
    };

    let store = Arc::new(Collection::new(settings.collection.clone(), embedder, index));

    let generator = GeminiGenerator::new(settings.api_key.clone())?
        .with_base_url(settings.base_url.clone())
        .with_model(settings.generation_model.clone());

    Ok(Session::new(store, Arc::new(PdfExtractor::new()), Arc::new(generator))
        .with_pdf_path(settings.pdf_path.clone()))
}

// ============================================================================
// Tests
// ============================================================================
