use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use sectordb_core::config::{KnowledgeSettings, RetrievalSettings};
use sectordb_core::error::Error;
use sectordb_core::traits::{ChunkSource, CompletionClient, Embedder};
use sectordb_core::types::{ClassificationResult, ConversationState, TextChunk, AGNOSTIC};
use sectordb_embed::{FakeEmbedder, LexicalReranker};
use sectordb_rag::prompt::{APOLOGY, SYSTEM_INSTRUCTION};
use sectordb_rag::{IndexRegistry, MemoryConversationStore, Pipeline, SectorTaxonomy};
use sectordb_vector::{ChunkWriter, MemoryIndex};

/// Replays canned replies in order and records every prompt it was sent.
#[derive(Default)]
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        let replies = replies.into_iter().map(|r| r.map(String::from).map_err(String::from)).collect();
        Arc::new(Self { replies: Mutex::new(replies), prompts: Mutex::new(Vec::new()) })
    }

    fn prompt(&self, i: usize) -> String { self.prompts.lock()[i].clone() }
}

#[async_trait]
impl CompletionClient for ScriptedLlm {
    async fn complete(&self, system_instruction: &str, prompt: &str, temperature: f32) -> Result<String> {
        assert_eq!(system_instruction, SYSTEM_INSTRUCTION);
        assert_eq!(temperature, 0.0);
        self.prompts.lock().push(prompt.to_string());
        match self.replies.lock().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow!(e)),
            None => Err(anyhow!("script exhausted")),
        }
    }
}

fn embedder() -> Arc<dyn Embedder> { Arc::new(FakeEmbedder::new(64)) }

async fn write_base(root: &Path, name: &str, texts: &[&str]) {
    let chunks: Vec<TextChunk> = texts.iter().enumerate().map(|(i, t)| TextChunk::new(format!("{name}:{i}"), name, *t)).collect();
    ChunkWriter::create(root, name, embedder()).await.unwrap().write(&chunks).await.unwrap();
}

async fn seeded_root() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    write_base(tmp.path(), "nace_db", &[
        "B06.1 Extraction of crude petroleum from offshore oil drilling platforms",
        "H49.4 Freight transport by road",
        "A01.1 Growing of non-perennial crops",
    ]).await;
    write_base(tmp.path(), "default_db", &[
        "ESRS 2 sets out general disclosure requirements",
        "G1 covers governance and business conduct",
    ]).await;
    write_base(tmp.path(), "oil_gas_db", &[
        "Methane flaring emissions from upstream oil operations are reported under E1",
    ]).await;
    tmp
}

fn knowledge(root: &Path) -> KnowledgeSettings {
    KnowledgeSettings { root_dir: root.to_path_buf(), ..Default::default() }
}

fn taxonomy() -> SectorTaxonomy {
    SectorTaxonomy::from_pairs([("B06.1", "Oil & Gas Company"), ("H49.4", "Road Transport")])
}

async fn pipeline(root: &Path, llm: Arc<ScriptedLlm>) -> Pipeline {
    let registry = IndexRegistry::load(&knowledge(root), embedder()).await.expect("registry");
    Pipeline::from_parts(registry, taxonomy(), Arc::new(LexicalReranker), llm, &RetrievalSettings::default()).expect("pipeline")
}

#[tokio::test]
async fn oil_company_is_answered_from_the_merged_view() {
    let tmp = seeded_root().await;
    let llm = ScriptedLlm::new(vec![Ok("b06. 1"), Ok("- Report **methane** under E1\n")]);
    let p = pipeline(tmp.path(), llm.clone()).await;

    let description = "We operate offshore oil drilling platforms";
    let classification = p.classifier.classify(description).await;
    assert_eq!(classification.sector_code, "B06.1");
    assert_eq!(classification.sector_tag, "Oil & Gas Company");
    assert!(llm.prompt(0).contains("B06.1 Extraction of crude petroleum"));

    let state = ConversationState::new(description, classification);
    let outcome = p.engine.answer("How do we report methane flaring emissions?", &state).await;
    assert!(outcome.context_used.contains("Methane flaring emissions"), "sector chunk retrieved: {}", outcome.context_used);
    assert!(outcome.context_used.contains("ESRS 2 sets out"), "default chunks kept in the view");
    assert!(outcome.answer_html.contains("<li>Report <strong>methane</strong> under E1</li>"));

    let prompt = llm.prompt(1);
    assert!(prompt.contains("Question: How do we report methane flaring emissions?"));
    assert!(prompt.contains("Company description: We operate offshore oil drilling platforms"));
    assert!(prompt.contains("ESRS standards to follow: Agnostic Standards + Oil & Gas Company"));
}

#[tokio::test]
async fn agnostic_company_never_sees_sector_chunks() {
    let tmp = seeded_root().await;
    let llm = ScriptedLlm::new(vec![Ok("answer")]);
    let p = pipeline(tmp.path(), llm).await;
    let state = ConversationState::new("We grow wheat", ClassificationResult::agnostic());
    let outcome = p.engine.answer("How do we report methane flaring emissions?", &state).await;
    assert!(!outcome.context_used.contains("Methane"));
    assert!(outcome.context_used.contains("G1 covers governance"));
}

#[tokio::test]
async fn llm_failure_degrades_to_apology_with_context() {
    let tmp = seeded_root().await;
    let llm = ScriptedLlm::new(vec![Err("upstream 503"), Err("upstream 503")]);
    let p = pipeline(tmp.path(), llm).await;

    let classification = p.classifier.classify("We haul freight by road").await;
    assert_eq!(classification, ClassificationResult::agnostic());

    let state = ConversationState::new("We haul freight by road", classification);
    let outcome = p.engine.answer("What is ESRS 2?", &state).await;
    assert!(outcome.answer_html.contains(APOLOGY));
    assert!(outcome.context_used.contains("ESRS 2 sets out general disclosure requirements"));
}

#[tokio::test]
async fn unmatched_model_output_is_agnostic_and_known_code_is_mapped() {
    let tmp = seeded_root().await;
    let llm = ScriptedLlm::new(vec![Ok("I cannot tell."), Ok("NACE code: h49.4")]);
    let p = pipeline(tmp.path(), llm).await;
    let unknown = p.classifier.classify("We do many things").await;
    assert_eq!(unknown.sector_code, AGNOSTIC);
    assert_eq!(unknown.sector_tag, AGNOSTIC);
    let road = p.classifier.classify("We haul freight by road").await;
    assert_eq!(road, ClassificationResult { sector_code: "H49.4".into(), sector_tag: "Road Transport".into() });
}

#[tokio::test]
async fn unmapped_code_keeps_code_with_agnostic_tag() {
    let tmp = seeded_root().await;
    let llm = ScriptedLlm::new(vec![Ok("A01.1")]);
    let p = pipeline(tmp.path(), llm).await;
    let result = p.classifier.classify("We grow wheat").await;
    assert_eq!(result.sector_code, "A01.1");
    assert_eq!(result.sector_tag, AGNOSTIC);
}

#[tokio::test]
async fn missing_default_base_stops_startup() {
    let tmp = TempDir::new().unwrap();
    write_base(tmp.path(), "nace_db", &["A01.1 crops"]).await;
    match IndexRegistry::load(&knowledge(tmp.path()), embedder()).await {
        Err(Error::IndexLoad { name, .. }) => assert_eq!(name, "default_db"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("registry must not start without the default base"),
    }
}

#[tokio::test]
async fn missing_optional_bases_degrade_to_default() {
    let tmp = TempDir::new().unwrap();
    write_base(tmp.path(), "default_db", &["ESRS 2 general disclosures"]).await;
    let registry = IndexRegistry::load(&knowledge(tmp.path()), embedder()).await.expect("registry");
    assert!(registry.classification().is_none());
    assert_eq!(registry.sectors().count(), 0);
    assert_eq!(registry.merged_view("Oil & Gas Company").name(), "default_db");

    let llm = ScriptedLlm::new(vec![]);
    let p = Pipeline::from_parts(registry, taxonomy(), Arc::new(LexicalReranker), llm.clone(), &RetrievalSettings::default()).unwrap();
    assert_eq!(p.classifier.classify("We drill for oil").await, ClassificationResult::agnostic());
    assert!(llm.prompts.lock().is_empty(), "no model call without a classification index");
}

#[tokio::test]
async fn merged_view_from_parts_is_default_then_sector() {
    let rows = |ids: &[&str]| -> Vec<sectordb_vector::IndexedChunk> {
        let e = embedder();
        ids.iter()
            .map(|id| {
                let chunk = TextChunk::new(*id, "t", format!("text {id}"));
                let vector = e.embed_batch(&[chunk.content.clone()]).unwrap().remove(0);
                sectordb_vector::IndexedChunk { chunk, vector }
            })
            .collect()
    };
    let default_rows = rows(&["b1", "b2"]);
    let view = MemoryIndex::concat("Road Transport", &default_rows, &rows(&["d1", "d2"]), embedder());
    let ids: Vec<String> = view.chunks().map(|c| c.id.clone()).collect();
    assert_eq!(ids, vec!["b1", "b2", "d1", "d2"]);

    let default: Arc<dyn ChunkSource> = Arc::new(MemoryIndex::new("default_db", default_rows, embedder()));
    let mut merged: HashMap<String, Arc<dyn ChunkSource>> = HashMap::new();
    merged.insert("Road Transport".into(), Arc::new(view));
    let registry = IndexRegistry::from_parts(default, None, merged);
    assert_eq!(registry.merged_view("Road Transport").name(), "Road Transport");
    assert_eq!(registry.merged_view(AGNOSTIC).name(), "default_db");
}

#[tokio::test]
async fn chat_flow_welcomes_then_answers_and_records_history() {
    let tmp = seeded_root().await;
    let llm = ScriptedLlm::new(vec![Ok("B06.1"), Ok("First answer"), Ok("Second answer")]);
    let p = pipeline(tmp.path(), llm.clone()).await;
    let store = Arc::new(MemoryConversationStore::new());
    let chat = p.chat_service(store.clone());

    let first = chat.handle_message("s1", "We operate offshore oil drilling platforms").await.unwrap();
    assert!(first.is_first_message);
    assert!(first.answer.contains("falls under NACE sector B06.1"));
    assert!(first.context.is_empty());

    let second = chat.handle_message("s1", "What about methane flaring?").await.unwrap();
    assert!(!second.is_first_message);
    assert_eq!(second.answer.trim(), "<p>First answer</p>");

    chat.handle_message("s1", "And scope 3?").await.unwrap();
    let third_prompt = llm.prompt(2);
    assert!(third_prompt.contains("Q: What about methane flaring?\nA: <p>First answer</p>"));

    let history = sectordb_rag::store::load_state(store.as_ref(), "s1").await.unwrap().unwrap().history;
    assert_eq!(history.len(), 2);
    assert!(chat.handle_message("s1", "   ").await.is_err());
    assert_eq!(first.to_json()["is_first_message"], true);
}

/// Knowledge source whose every search fails, as a dropped store would.
struct UnreachableSource;

#[async_trait]
impl ChunkSource for UnreachableSource {
    fn name(&self) -> &str { "unreachable_db" }

    async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<TextChunk>> {
        Err(anyhow!("storage unreachable"))
    }
}

fn unreachable_pipeline(llm: Arc<ScriptedLlm>) -> Pipeline {
    let source: Arc<dyn ChunkSource> = Arc::new(UnreachableSource);
    let registry = IndexRegistry::from_parts(source.clone(), Some(source), HashMap::new());
    Pipeline::from_parts(registry, taxonomy(), Arc::new(LexicalReranker), llm, &RetrievalSettings::default()).expect("pipeline")
}

#[tokio::test]
async fn answer_retrieval_failure_is_apology_without_context_or_model_call() {
    let llm = ScriptedLlm::new(vec![Ok("never used")]);
    let p = unreachable_pipeline(llm.clone());
    let state = ConversationState::new("We haul freight by road", ClassificationResult::agnostic());
    let outcome = p.engine.answer("What is ESRS 2?", &state).await;
    assert_eq!(outcome.answer_html, APOLOGY);
    assert!(outcome.context_used.is_empty());
    assert!(llm.prompts.lock().is_empty(), "no model call after failed retrieval");
}

#[tokio::test]
async fn classify_retrieval_failure_asks_model_with_empty_context() {
    let llm = ScriptedLlm::new(vec![Ok("H49.4")]);
    let p = unreachable_pipeline(llm.clone());
    let result = p.classifier.classify("We haul freight by road").await;
    assert_eq!(result, ClassificationResult { sector_code: "H49.4".into(), sector_tag: "Road Transport".into() });
    assert_eq!(llm.prompts.lock().len(), 1);
    assert!(llm.prompt(0).ends_with("Context:\n\n"), "context section is empty: {:?}", llm.prompt(0));
}
