//! `crag`: ask questions about a directory of documents.
//!
//! ```text
//! crag --docs ./docs --question "What is Chichen Itza?"
//! crag --docs ./docs                       # interactive
//! crag --docs ./docs --base-url http://localhost:11434/v1 --model llama3.2
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use crag_engine::{
    AnswerRecord, CorpusSlot, CragConfig, CragPipeline, DirectoryLoader, DuckDuckGoSearch,
    Embedder, GenerativeModel, HashingEmbedder, Ingestor, OpenAIChatModel, OpenAIEmbedder,
    RecursiveChunker,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "crag=info,crag_engine=info";

#[derive(Parser, Debug)]
#[command(name = "crag", version, about = "Failure-aware retrieval-augmented question answering")]
struct Cli {
    /// Directory of .txt/.md documents to ingest at startup.
    #[arg(long)]
    docs: Option<PathBuf>,

    /// JSON file with pipeline configuration; missing fields keep defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Answer one question and exit instead of starting the prompt.
    #[arg(long, short)]
    question: Option<String>,

    /// Chat model name.
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Base URL of an OpenAI-compatible server for chat and OpenAI embeddings;
    /// no API key is sent when set.
    #[arg(long)]
    base_url: Option<String>,

    /// Embedding model for `--embedder openai`.
    #[arg(long, default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// Embedding backend for documents and questions.
    #[arg(long, value_enum, default_value_t = EmbedderKind::Hashing)]
    embedder: EmbedderKind,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// Print the full answer record, trace included, as JSON.
    #[arg(long)]
    record_json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Offline hashing embedder.
    Hashing,
    /// OpenAI embeddings API (needs `OPENAI_API_KEY` unless `--base-url` is set).
    Openai,
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<CragConfig> {
    let Some(path) = path else {
        return Ok(CragConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file '{}'", path.display()))?;
    Ok(CragConfig::from_json(&json)?)
}

fn openai_embedder(base_url: Option<&str>, model: &str) -> Result<OpenAIEmbedder> {
    Ok(match base_url {
        Some(base_url) => OpenAIEmbedder::compatible(base_url, model),
        None => OpenAIEmbedder::from_env()?.with_model(model),
    })
}

fn build_embedder(cli: &Cli) -> Result<Arc<dyn Embedder>> {
    Ok(match cli.embedder {
        EmbedderKind::Hashing => Arc::new(HashingEmbedder::default()),
        EmbedderKind::Openai => {
            Arc::new(openai_embedder(cli.base_url.as_deref(), &cli.embedding_model)?)
        }
    })
}

fn build_model(cli: &Cli) -> Result<Arc<dyn GenerativeModel>> {
    Ok(match &cli.base_url {
        Some(base_url) => Arc::new(OpenAIChatModel::compatible(base_url, &cli.model)),
        None => Arc::new(OpenAIChatModel::from_env()?.with_model(&cli.model)),
    })
}

async fn ingest(ingestor: &Ingestor, slot: &CorpusSlot, dir: &Path) -> Result<()> {
    let corpus = ingestor
        .build_from(&DirectoryLoader::new(), dir)
        .await
        .with_context(|| format!("failed to ingest '{}'", dir.display()))?;
    if corpus.is_empty() {
        warn!(dir = %dir.display(), "no text found; every question will go to the web");
    }
    let corpus = slot.publish(corpus).await;
    println!("Indexed {} chunks from {}", corpus.len(), dir.display());
    Ok(())
}

fn print_record(record: &AnswerRecord, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }

    println!();
    println!(
        "Retrieval: max similarity {:.3} | avg similarity {:.3} | chunks {}",
        record.stats.max_similarity, record.stats.avg_similarity, record.stats.count
    );
    println!();
    println!("Answer ({}):", record.source);
    println!("{}", record.answer);

    if !record.retrieved_chunks.is_empty() {
        println!();
        println!("Retrieved chunks:");
        for (rank, chunk) in record.retrieved_chunks.iter().enumerate() {
            println!("  [{}] similarity {:.3}", rank + 1, chunk.similarity);
            println!("      {}", preview(&chunk.text, 160));
        }
    }

    println!();
    println!("Decision:");
    println!("{}", serde_json::to_string_pretty(&record.decision_summary())?);
    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

async fn ask(pipeline: &CragPipeline, slot: &CorpusSlot, question: &str, json: bool) -> Result<()> {
    let record = pipeline.answer_current(slot, question).await?;
    print_record(&record, json)
}

async fn repl(
    pipeline: &CragPipeline,
    ingestor: &Ingestor,
    slot: &CorpusSlot,
    record_json: bool,
) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question, `:load <dir>` to replace the documents, `:quit` to exit.");

    loop {
        let line = match editor.readline("crag> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        editor.add_history_entry(input)?;

        if input == ":quit" || input == ":q" {
            break;
        }
        let result = match input.strip_prefix(":load") {
            Some(dir) if !dir.trim().is_empty() => {
                ingest(ingestor, slot, Path::new(dir.trim())).await
            }
            Some(_) => {
                println!("usage: :load <dir>");
                Ok(())
            }
            None => ask(pipeline, slot, input, record_json).await,
        };
        if let Err(e) = result {
            eprintln!("error: {e:#}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(cli.config.as_deref())?;
    let embedder = build_embedder(&cli)?;
    let model = build_model(&cli)?;
    let search = DuckDuckGoSearch::new()?.with_max_results(config.web_max_results);

    let ingestor = Ingestor::new(
        embedder.clone(),
        Arc::new(RecursiveChunker::new(config.chunk_size, config.chunk_overlap)),
    );
    let pipeline = CragPipeline::builder()
        .config(config)
        .embedder(embedder)
        .model(model)
        .web_search(Arc::new(search))
        .build()?;
    info!(model = %cli.model, embedder = ?cli.embedder, "pipeline ready");

    let slot = CorpusSlot::new();
    if let Some(dir) = &cli.docs {
        ingest(&ingestor, &slot, dir).await?;
    }

    match &cli.question {
        Some(question) => ask(&pipeline, &slot, question, cli.record_json).await,
        None => repl(&pipeline, &ingestor, &slot, cli.record_json).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_reaches_the_openai_embedder() {
        let cli = Cli::parse_from([
            "crag",
            "--embedder",
            "openai",
            "--base-url",
            "http://localhost:11434/v1",
            "--embedding-model",
            "nomic-embed-text",
        ]);
        let embedder = openai_embedder(cli.base_url.as_deref(), &cli.embedding_model).unwrap();
        assert_eq!(embedder.base_url(), "http://localhost:11434/v1");
        assert_eq!(embedder.model(), "nomic-embed-text");
    }

    #[test]
    fn hashing_is_the_default_embedder() {
        let cli = Cli::parse_from(["crag"]);
        assert_eq!(cli.embedder, EmbedderKind::Hashing);
        assert!(build_embedder(&cli).is_ok());
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        assert_eq!(preview("Yucatán  peninsula", 7), "Yucatán…");
        assert_eq!(preview("short", 10), "short");
    }
}
