//! `ragbot`: answer questions over a PDF knowledge base.
//!
//! ```bash
//! # Register documents
//! ragbot add https://example.org/annual-report.pdf
//!
//! # Build and persist the index from the first 100 entries
//! ragbot build --kb knowledge_base.txt --store store -n 100
//!
//! # Chat against the persisted index
//! ragbot chat --store store
//!
//! # One-off session over a single PDF, nothing persisted
//! ragbot ask-pdf ./paper.pdf
//! ```
//!
//! Credentials and models come from `RAGBOT_*` environment variables, optionally
//! loaded from a `.env` file.

mod provider;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use ragbot_cli::RemotePdfLoader;
use ragbot_core::LanguageModel;
use ragbot_rag::{
    Assistant, Corpus, DEFAULT_KNOWLEDGE_BASE, DocumentLoader, GREETING, IndexBuilder,
    IndexProgress, IndexStage, KnowledgeBase, RagConfig, Retriever, Session, load_documents,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Default directory of the persisted index.
const DEFAULT_STORE: &str = "store";

/// Retrieval-augmented assistant over PDF documents.
#[derive(Parser, Debug)]
#[command(name = "ragbot", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Chat model, overriding `RAGBOT_CHAT_MODEL`.
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(flatten)]
    tuning: Tuning,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append a PDF URL or path to the knowledge base.
    Add {
        /// Location of the PDF.
        url: String,
        /// Knowledge base file.
        #[arg(long, default_value = DEFAULT_KNOWLEDGE_BASE)]
        kb: PathBuf,
    },
    /// Index the knowledge base and save the store.
    Build {
        /// Knowledge base file.
        #[arg(long, default_value = DEFAULT_KNOWLEDGE_BASE)]
        kb: PathBuf,
        /// Directory the store is written to.
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
        /// Number of knowledge base entries to index.
        #[arg(short = 'n', long, default_value_t = 100)]
        limit: usize,
    },
    /// Chat against a saved store.
    Chat {
        /// Directory of the store.
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
    /// Chat about a single PDF without saving anything.
    AskPdf {
        /// URL or path of the PDF.
        path: String,
    },
}

/// Retrieval settings shared by every subcommand.
#[derive(ClapArgs, Debug)]
struct Tuning {
    /// Maximum characters per chunk.
    #[arg(long, global = true, default_value_t = 500)]
    chunk_size: usize,
    /// Characters shared by consecutive chunks.
    #[arg(long, global = true, default_value_t = 100)]
    chunk_overlap: usize,
    /// Chunks fetched per retriever and query variant.
    #[arg(long, global = true, default_value_t = 3)]
    top_k: usize,
    /// Paraphrases generated per question.
    #[arg(long, global = true, default_value_t = 3)]
    variants: usize,
}

impl Tuning {
    fn config(&self, max_documents: usize) -> Result<RagConfig> {
        let config = RagConfig::builder()
            .chunking(self.chunk_size, self.chunk_overlap)
            .top_k(self.top_k)
            .query_variants(self.variants)
            .max_documents(max_documents)
            .build();
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ragbot=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match &args.command {
        Command::Add { url, kb } => add(url, kb),
        Command::Build { kb, store, limit } => {
            build(&args, kb, store, args.tuning.config(*limit)?).await
        }
        Command::Chat { store } => chat(&args, store, args.tuning.config(100)?).await,
        Command::AskPdf { path } => ask_pdf(&args, path, args.tuning.config(1)?).await,
    }
}

fn add(url: &str, kb: &Path) -> Result<()> {
    let knowledge_base = KnowledgeBase::new(kb);
    if knowledge_base.append(url)? {
        println!("Added {} to {}", url.trim(), kb.display());
    } else {
        println!("{} is already in {}", url.trim(), kb.display());
    }
    Ok(())
}

async fn build(
    args: &Args,
    kb: &Path,
    store: &Path,
    config: RagConfig,
) -> Result<()> {
    let model = Arc::new(provider::connect(args.model.as_deref())?);
    let locations = KnowledgeBase::new(kb).first(config.max_documents)?;
    if locations.is_empty() {
        bail!("{} has no entries, add some with `ragbot add <url>`", kb.display());
    }

    let loader = RemotePdfLoader::new()?;
    let documents = load_documents(&loader, &locations, config.max_documents, report).await;
    if documents.is_empty() {
        bail!("none of the {} documents could be loaded", locations.len());
    }

    let corpus = IndexBuilder::new(model, config)
        .build_and_save(documents, store, report)
        .await?;
    println!(
        "Indexed {} chunks from {} locations into {}",
        corpus.len(),
        locations.len(),
        store.display()
    );
    Ok(())
}

async fn chat(args: &Args, store: &Path, config: RagConfig) -> Result<()> {
    let model = Arc::new(provider::connect(args.model.as_deref())?);
    let corpus = Corpus::load(store, Arc::clone(&model))
        .with_context(|| {
            format!(
                "cannot open the store at {}, run `ragbot build` first",
                store.display()
            )
        })?;
    tracing::info!(chunks = corpus.len(), store = %store.display(), "store loaded");

    let assistant = Assistant::new(model, corpus.retriever(&config), &config);
    converse(&assistant).await
}

async fn ask_pdf(args: &Args, path: &str, config: RagConfig) -> Result<()> {
    let model = Arc::new(provider::connect(args.model.as_deref())?);
    let document = RemotePdfLoader::new()?.load(path).await?;
    let corpus = IndexBuilder::new(Arc::clone(&model), config.clone())
        .build(vec![document], report)
        .await?;
    if corpus.is_empty() {
        bail!("{path} contains no indexable text");
    }

    let assistant = Assistant::new(model, corpus.retriever(&config), &config);
    converse(&assistant).await
}

/// Runs the chat loop until end of input or `/quit`.
async fn converse<L: LanguageModel, R: Retriever>(assistant: &Assistant<L, R>) -> Result<()> {
    let mut session = Session::with_greeting();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Commands: /quit, /clear\n");
    println!("Assistant> {GREETING}\n");
    loop {
        print!("You> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" | "/q" => break,
            "/clear" => {
                session = Session::with_greeting();
                println!("History cleared.\n");
                continue;
            }
            _ => {}
        }

        match assistant.get_response(&mut session, question).await {
            Ok(answer) => println!("\nAssistant> {answer}\n"),
            Err(error) => {
                tracing::warn!(%error, "turn failed");
                println!("\n\x1b[31m{}\x1b[0m\n", error.user_message());
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn report(progress: IndexProgress) {
    let current = progress.current.as_deref().unwrap_or("");
    match &progress.stage {
        IndexStage::Loading => {
            eprintln!("[{}/{}] loading {current}", progress.processed + 1, progress.total);
        }
        IndexStage::Skipped { reason } => eprintln!("skipped {current}: {reason}"),
        IndexStage::Chunking => eprintln!("chunking {current}"),
        IndexStage::Embedding => {
            eprintln!("embedding {}/{} chunks", progress.processed, progress.total);
        }
        IndexStage::Indexing => eprintln!("indexing {} chunks", progress.total),
        IndexStage::Saving => eprintln!("saving"),
        IndexStage::Done => eprintln!("done"),
    }
}
