use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use grimoire_llm::ollama::OllamaProvider;
use grimoire_rag::{Config, Engine, RagError};
use tokio_stream::StreamExt;

#[derive(Parser)]
#[command(name = "grimoire", version, about = "Ask questions about your own documents")]
struct Cli {
    /// Configuration file. Missing file means built-in defaults.
    #[arg(long, default_value = "grimoire.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from every supported file in the source directory.
    Ingest {
        /// Override the configured source directory.
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Answer a question from the indexed corpus, citing sources.
    Ask {
        /// The question. Multiple words are joined with spaces.
        #[arg(required = true)]
        query: Vec<String>,

        /// Print the complete answer at once instead of streaming tokens.
        #[arg(long)]
        no_stream: bool,
    },
    /// Show whether an index exists and how big it is.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    if let Command::Ingest { source: Some(dir) } = &cli.command {
        config.ingest.source_dir.clone_from(dir);
    }

    let provider = OllamaProvider::new(
        &config.llm.base_url,
        config.llm.model.clone(),
        config.llm.embedding_model.clone(),
    );
    provider
        .health_check()
        .await
        .context("Ollama is not reachable; start it or set GRIMOIRE_LLM_BASE_URL")?;

    let engine = Engine::new(provider, config).await?;

    match cli.command {
        Command::Ingest { .. } => ingest(&engine).await,
        Command::Ask { query, no_stream } => ask(&engine, &query.join(" "), no_stream).await,
        Command::Status => status(&engine).await,
    }
}

async fn ingest(engine: &Engine<OllamaProvider>) -> anyhow::Result<()> {
    let report = engine.run_ingestion().await?;
    println!(
        "Indexed {} chunk(s) from {} document(s) in {:.1}s",
        report.chunks_indexed,
        report.documents_loaded,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn ask(engine: &Engine<OllamaProvider>, query: &str, no_stream: bool) -> anyhow::Result<()> {
    if !engine.open_existing().await? {
        anyhow::bail!("no index found; run `grimoire ingest` first");
    }

    let sources = if no_stream {
        let answer = engine.run_query(query).await.map_err(describe)?;
        println!("{}", answer.text);
        answer.sources
    } else {
        let streaming = engine.run_query_stream(query).await.map_err(describe)?;
        let mut stream = streaming.stream;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            stdout.write_all(chunk?.as_bytes())?;
            stdout.flush()?;
        }
        println!();
        streaming.sources
    };

    if !sources.is_empty() {
        println!("\nSources:");
        for passage in &sources {
            println!("  {}", passage.source);
        }
    }
    Ok(())
}

async fn status(engine: &Engine<OllamaProvider>) -> anyhow::Result<()> {
    let path = engine.config().ingest.index_path.clone();
    match engine.open_existing().await {
        Ok(true) => {
            println!(
                "index: {} ({} entries, dimension {})",
                path.display(),
                engine.index_len().await.unwrap_or(0),
                engine.dimension()
            );
        }
        Ok(false) => println!("no index at {}; run `grimoire ingest`", path.display()),
        Err(e) => println!("index at {} is unusable: {e}", path.display()),
    }
    Ok(())
}

/// Turn query-path errors into actionable one-liners.
fn describe(err: RagError) -> anyhow::Error {
    match err {
        RagError::EmptyQuery => anyhow::anyhow!("the question is empty"),
        RagError::NoContext => {
            anyhow::anyhow!("nothing relevant found in the index; ingest more documents")
        }
        RagError::NotReady => anyhow::anyhow!("no index loaded; run `grimoire ingest` first"),
        other => other.into(),
    }
}
