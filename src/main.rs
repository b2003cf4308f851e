use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use docqa_core::bootstrap;
use docqa_core::{Answer, DocQa, DocumentSource, IngestProgress, Persona, Session};
use docqa_llm::any::AnyProvider;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "Ask questions about a PDF and get answers grounded in its text"
)]
struct Cli {
    /// Document to ingest (PDF, or plain text / markdown)
    document: PathBuf,

    /// Questions to ask. Read line by line from stdin when omitted
    questions: Vec<String>,

    /// Path to the TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persona preset (strict-legal-auditor, technical-writer, onboarding-buddy)
    #[arg(long, conflicts_with = "persona_prompt")]
    persona: Option<Persona>,

    /// Free-text system prompt instead of a preset persona
    #[arg(long)]
    persona_prompt: Option<String>,

    /// Number of passages retrieved per question
    #[arg(long)]
    top_k: Option<usize>,

    /// Print the retrieved passages under each answer
    #[arg(long, default_value_t = false)]
    show_sources: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = bootstrap::resolve_config_path(cli.config.as_deref());
    let mut config = bootstrap::load_config(&config_path).await?;
    if let Some(k) = cli.top_k {
        config.retrieval.top_k = k;
    }
    let (docqa, mut session) = bootstrap::build(&config).await?;
    if let Some(prompt) = cli.persona_prompt.clone() {
        session.persona = Persona::custom(prompt);
    } else if let Some(persona) = cli.persona.clone() {
        session.persona = persona;
    }

    ingest(&docqa, &session, &cli.document).await?;

    if cli.questions.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            ask(&docqa, &mut session, question, cli.show_sources).await;
        }
    } else {
        for question in &cli.questions {
            ask(&docqa, &mut session, question, cli.show_sources).await;
        }
    }
    Ok(())
}

async fn ingest(
    docqa: &DocQa<AnyProvider>,
    session: &Session,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    let task = docqa.spawn_ingest(session, DocumentSource::from_path(path))?;
    let cancel = task.cancellation_token();
    let mut progress = task.progress();

    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = *progress.borrow_and_update();
            match state {
                IngestProgress::Embedding { done, total } => {
                    tracing::info!(done, total, "embedding");
                }
                IngestProgress::Ready => break,
                other => tracing::info!("{other:?}"),
            }
        }
    });
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling ingestion");
            cancel.cancel();
        }
    });

    let result = task.join().await;
    ctrl_c.abort();
    reporter.abort();

    let collection = result.with_context(|| format!("failed to ingest {}", path.display()))?;
    println!(
        "Indexed {} ({} pages, {} chunks)",
        collection.source, collection.page_count, collection.chunk_count
    );
    Ok(())
}

async fn ask(docqa: &DocQa<AnyProvider>, session: &mut Session, question: &str, show_sources: bool) {
    match docqa.ask(session, question).await {
        Ok(answer) => print_answer(&answer, show_sources),
        Err(e) => eprintln!("error: {e}"),
    }
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{}", answer.answer);
    let pages = answer.source_pages();
    if !pages.is_empty() {
        println!("[Sources: pages {}]", pages.join(", "));
    }
    if show_sources {
        for (i, source) in answer.sources.iter().enumerate() {
            println!("\nSource {} ({}):\n> {}", i + 1, source.citation(), source.text);
        }
    }
    println!();
}
