use quarry_core::indexer::count_terms;
use quarry_core::{Indexer, Normalizer, ParserRegistry, Schedule, TaskRunner};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn indexer() -> Indexer {
    Indexer::new(
        Arc::new(ParserRegistry::with_defaults()),
        Arc::new(Normalizer::default()),
        TaskRunner::new(50, Schedule::Barrier),
    )
}

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn tf_counts_sum_to_term_total() {
    let idx = indexer();
    let doc = idx.index_text("mem.txt", "The fishing boats were fishing. Friendly boats!");
    let sum: u32 = doc.term_frequencies.values().map(|t| t.count).sum();
    assert_eq!(sum as usize, doc.terms);
    assert_eq!(doc.terms, 7);
    for record in doc.term_frequencies.values() {
        assert_eq!(record.tf, record.count as f64 / doc.terms as f64);
    }
    assert_eq!(doc.term_frequencies["fish"].count, 2);
    assert_eq!(doc.term_frequencies["boat"].count, 2);
    assert_eq!(doc.term_frequencies["friend"].count, 1);
}

#[test]
fn text_is_lowercased_before_ngrams() {
    let doc = indexer().index_text("mem.txt", "Hello World.");
    assert_eq!(doc.ngrams.bigram("hello", "world"), 1);
    assert_eq!(doc.ngrams.bigram("Hello", "World"), 0);
}

#[test]
fn count_terms_handles_empty_input() {
    let (counts, total) = count_terms(&[]);
    assert!(counts.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn documents_append_to_shared_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.txt", "cat cat dog");
    let b = write(dir.path(), "b.html", "<html><body><p>cat bird</p></body></html>");
    let c = write(dir.path(), "c.xml", "<doc><p>cat</p></doc>");

    let progress = AtomicUsize::new(0);
    let result = indexer()
        .build_index(vec![a.clone(), b.clone(), c.clone()], |_| {
            progress.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(progress.load(Ordering::SeqCst), 3);
    assert_eq!(result.indexed.len(), 3);

    let cat = &result.token_map["cat"];
    assert_eq!(cat.len(), 3);
    let mut locators: Vec<&str> = cat.iter().map(|t| t.locator.as_str()).collect();
    locators.sort();
    let mut expected = vec![a.as_str(), b.as_str(), c.as_str()];
    expected.sort();
    assert_eq!(locators, expected);

    let from_a = cat.iter().find(|t| t.locator == a).unwrap();
    assert_eq!(from_a.count, 2);
    assert!((from_a.tf - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(result.token_map["dog"].len(), 1);
    assert_eq!(result.token_map["bird"].len(), 1);

    let start: u64 = result.unigrams.iter().filter(|u| u.token == "<start>").map(|u| u.count).sum();
    assert_eq!(start, 3);
}

#[tokio::test]
async fn failed_documents_contribute_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "good.txt", "alpha beta.");
    let unknown = write(dir.path(), "deck.pptx", "gamma delta.");
    let missing = dir.path().join("gone.txt").to_string_lossy().into_owned();

    let progress = AtomicUsize::new(0);
    let result = indexer()
        .build_index(vec![unknown, good.clone(), missing], |_| {
            progress.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(result.indexed, vec![good]);
    assert_eq!(progress.load(Ordering::SeqCst), 1);
    assert!(result.token_map.contains_key("alpha"));
    assert!(!result.token_map.contains_key("gamma"));
    assert!(result.bigrams.iter().all(|b| b.before != "gamma" && b.after != "gamma"));
    let start: u64 = result.unigrams.iter().filter(|u| u.token == "<start>").map(|u| u.count).sum();
    assert_eq!(start, 1);
}

#[tokio::test]
async fn many_documents_under_barriers() {
    let dir = tempfile::tempdir().unwrap();
    let locators: Vec<String> = (0..120).map(|i| write(dir.path(), &format!("{i}.txt"), "shared word")).collect();
    let result = indexer().build_index(locators, |_| {}).await;
    assert_eq!(result.indexed.len(), 120);
    assert_eq!(result.token_map["share"].len(), 120);
}
