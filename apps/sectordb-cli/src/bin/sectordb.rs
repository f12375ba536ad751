use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use sectordb_core::config::{Config, Settings};
use sectordb_core::data_processor::DataProcessor;
use sectordb_core::types::ConversationState;
use sectordb_embed::load_embedder;
use sectordb_rag::{MemoryConversationStore, Pipeline};
use sectordb_vector::ChunkWriter;

const USAGE: &str = "Usage: sectordb <command> [args...]

Commands:
  ingest <name> <txt_dir>            build knowledge base <name> from .txt files
  classify \"<description>\"           print NACE code and sector tag
  ask \"<description>\" \"<question>\"   classify, then answer one question
  chat                               interactive session on stdin";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{}", USAGE); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn arg(args: &[String], i: usize, what: &str) -> Result<String> {
    match args.get(i) {
        Some(a) if !a.trim().is_empty() => Ok(a.clone()),
        _ => bail!("missing {}\n\n{}", what, USAGE),
    }
}

async fn ingest(settings: &Settings, name: &str, txt_dir: PathBuf) -> Result<()> {
    println!("📥 Ingesting {} into knowledge base '{}'", txt_dir.display(), name);
    let chunks = DataProcessor::new().process_directory(&txt_dir)?;
    let embedder = load_embedder(&settings.embedding)?;
    let writer = ChunkWriter::create(&settings.knowledge.root_dir, name, embedder).await?.with_progress(true);
    let written = writer.write(&chunks).await?;
    println!("✅ Ingest complete ({} chunks in {})", written, settings.knowledge.root_dir.join(name).display());
    Ok(())
}

async fn classify(settings: &Settings, description: &str) -> Result<()> {
    let pipeline = Pipeline::from_settings(settings).await?;
    let result = pipeline.classifier.classify(description).await;
    println!("NACE code:  {}", result.sector_code);
    println!("Sector tag: {}", result.sector_tag);
    Ok(())
}

async fn ask(settings: &Settings, description: &str, question: &str) -> Result<()> {
    let pipeline = Pipeline::from_settings(settings).await?;
    let classification = pipeline.classifier.classify(description).await;
    println!("🏭 {} ({})", classification.sector_code, classification.sector_tag);
    let state = ConversationState::new(description, classification);
    let outcome = pipeline.engine.answer(question, &state).await;
    println!("\n{}", outcome.answer_html);
    println!("\n📝 Context used:\n{}", outcome.context_used);
    Ok(())
}

async fn chat(settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::from_settings(settings).await?;
    let service = pipeline.chat_service(Arc::new(MemoryConversationStore::new()));
    println!("Describe your company to start. Empty line or Ctrl-D quits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() { break; }
        let reply = service.handle_message("cli", &line).await?;
        println!("\n{}\n", reply.answer);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let (cmd, args) = parse_args();
    if matches!(cmd.as_str(), "-h" | "--help" | "help") { println!("{}", USAGE); return Ok(()); }
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    match cmd.as_str() {
        "ingest" => ingest(&settings, &arg(&args, 0, "<name>")?, PathBuf::from(arg(&args, 1, "<txt_dir>")?)).await,
        "classify" => classify(&settings, &arg(&args, 0, "<description>")?).await,
        "ask" => ask(&settings, &arg(&args, 0, "<description>")?, &arg(&args, 1, "<question>")?).await,
        "chat" => chat(&settings).await,
        _ => { eprintln!("Unknown command: {}\n\n{}", cmd, USAGE); std::process::exit(1); }
    }
}
