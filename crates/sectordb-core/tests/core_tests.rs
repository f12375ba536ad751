use std::fs;
use std::io::Write;
use tempfile::TempDir;

use sectordb_core::data_processor::{ChunkingConfig, DataProcessor};

#[test]
fn process_directory_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let file_path = dir.join("a.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Short text").unwrap();

    let processor = DataProcessor::new();
    let chunks = processor.process_directory(dir).expect("process");

    assert_eq!(chunks.len(), 1, "one small paragraph becomes one chunk");
    assert_eq!(chunks[0].content.trim(), "Short text");
    assert_eq!(chunks[0].id, "a:0");
    assert!(chunks[0].source.ends_with("a.txt"));
}

#[test]
fn process_directory_limited_two_files_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let processor = DataProcessor::new();
    let chunks = processor
        .process_directory_limited(dir, 1)
        .expect("process limited");

    // Only chunks from one document should be present
    let mut sources = std::collections::HashSet::new();
    for c in &chunks { sources.insert(c.source.clone()); }
    assert_eq!(sources.len(), 1, "limited to one source document");
}

#[test]
fn paragraphs_become_separate_chunks_in_order() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("esrs.txt"), "E1 climate\n\n\n\nE2 pollution\n\nE3 water").unwrap();

    let chunks = DataProcessor::new().process_directory(tmp.path()).expect("process");
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["E1 climate", "E2 pollution", "E3 water"]);
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["esrs:0", "esrs:1", "esrs:2"]);
}

#[test]
fn long_paragraph_is_split_with_overlap() {
    let tmp = TempDir::new().unwrap();
    let words: Vec<String> = (0..40).map(|i| format!("w{i}")).collect();
    fs::write(tmp.path().join("long.txt"), words.join(" ")).unwrap();

    // 20 tokens -> 15 words per piece, 3 words of overlap
    let processor = DataProcessor::with_config(ChunkingConfig { max_tokens: 20, overlap_percent: 0.2 });
    let chunks = processor.process_directory(tmp.path()).expect("process");
    assert!(chunks.len() >= 3);
    assert!(chunks[0].content.starts_with("w0 "));
    assert!(chunks[1].content.starts_with("w12 "));
    assert!(chunks.last().unwrap().content.ends_with("w39"));
}
