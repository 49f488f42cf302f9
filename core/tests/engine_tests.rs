use async_trait::async_trait;
use quarry_core::{
    spawn_schedule, Bigram, Document, DocumentId, EngineConfig, Error, MemoryStore, PassSummary, Result, SearchEngine,
    Store, TermFrequency, TokenEntry,
};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

fn engine(store: Arc<dyn Store>) -> SearchEngine {
    SearchEngine::new(EngineConfig::default(), store).unwrap()
}

#[tokio::test]
async fn index_then_search_and_complete() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pets/cats.txt", "Cats purr. Cats sleep all day.");
    write(dir.path(), "pets/dogs.html", "<html><body><p>Dogs bark. Dogs and cats play.</p></body></html>");
    write(dir.path(), "notes.xml", "<notes><n>Birds sing.</n></notes>");
    write(dir.path(), "skip.bin", "ignored");

    let store = Arc::new(MemoryStore::new());
    let engine = engine(store.clone());
    let added = engine.add_directory(dir.path()).await.unwrap();
    assert_eq!(added.len(), 3);
    assert!(added.iter().any(|d| d.title == "cats"));

    let summary = engine.index_pending().await.unwrap();
    assert_eq!((summary.pending, summary.indexed, summary.skipped), (3, 3, 0));
    assert!(summary.tokens > 0 && summary.bigrams > 0);
    assert_eq!(store.count_indexed_documents().await.unwrap(), 3);
    assert!(store.unindexed_documents().await.unwrap().is_empty());

    let outcome = engine.search("barking dogs").await.unwrap();
    assert_eq!(outcome.query, "barking dogs");
    let titles: Vec<&str> = outcome.documents.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["dogs"]);

    let outcome = engine.search("cat").await.unwrap();
    assert_eq!(outcome.documents.len(), 2);
    assert_eq!(outcome.documents[0].title, "cats");

    let complete = engine.autocomplete("cat").await.unwrap();
    assert_eq!(complete.query, "cat");
    assert_eq!(complete.suggestions.len(), 5);
    assert!(complete.suggestions[0].starts_with("cats "));

    // nothing pending: a second pass is a no-op
    assert_eq!(engine.index_pending().await.unwrap(), PassSummary::default());
}

#[tokio::test]
async fn reindexing_appends_postings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.txt", "desk lamp");
    let store = Arc::new(MemoryStore::new());
    let engine = engine(store.clone());

    engine.add_document(&path, None, None).await.unwrap();
    engine.index_pending().await.unwrap();
    assert_eq!(store.get_token("desk").await.unwrap().unwrap().postings.len(), 1);

    engine.add_document(&path, Some("again"), None).await.unwrap();
    engine.index_pending().await.unwrap();
    assert_eq!(store.get_token("desk").await.unwrap().unwrap().postings.len(), 2);
    assert_eq!(store.unigram_count("desk").await.unwrap(), 2);
}

#[tokio::test]
async fn shared_locator_documents_each_get_postings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.txt", "walrus tusks");
    let store = Arc::new(MemoryStore::new());
    let engine = engine(store.clone());

    let first = engine.add_document(&path, Some("first"), None).await.unwrap();
    let second = engine.add_document(&path, Some("second"), None).await.unwrap();
    let summary = engine.index_pending().await.unwrap();
    assert_eq!((summary.pending, summary.indexed, summary.skipped), (2, 2, 0));
    assert_eq!(store.count_indexed_documents().await.unwrap(), 2);

    let entry = store.get_token("walrus").await.unwrap().unwrap();
    let mut ids: Vec<DocumentId> = entry.postings.iter().map(|p| p.document_id).collect();
    ids.sort();
    let mut expected = vec![first.id, second.id];
    expected.sort();
    assert_eq!(ids, expected);
    // the file is parsed once
    assert_eq!(store.unigram_count("walrus").await.unwrap(), 1);

    let outcome = engine.search("walrus").await.unwrap();
    let mut titles: Vec<&str> = outcome.documents.iter().map(|h| h.title.as_str()).collect();
    titles.sort();
    assert_eq!(titles, vec!["first", "second"]);
}

#[tokio::test]
async fn unparseable_documents_stay_pending() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "good.txt", "alpha beta");
    let deck = write(dir.path(), "deck.pptx", "alpha gamma");
    let store = Arc::new(MemoryStore::new());
    let engine = engine(store.clone());

    engine.add_document(&good, None, None).await.unwrap();
    engine.add_document(&deck, None, None).await.unwrap();
    engine.add_document(&dir.path().join("gone.txt").to_string_lossy(), None, None).await.unwrap();

    let summary = engine.index_pending().await.unwrap();
    assert_eq!((summary.pending, summary.indexed, summary.skipped), (3, 1, 2));
    let pending: Vec<String> = store.unindexed_documents().await.unwrap().into_iter().map(|d| d.title).collect();
    assert_eq!(pending.len(), 2);
    assert!(pending.contains(&"deck".to_string()));
    assert!(store.get_token("gamma").await.unwrap().is_none());
}

#[tokio::test]
async fn add_document_validates_input() {
    let engine = engine(Arc::new(MemoryStore::new()));
    assert!(matches!(engine.add_document("  ", None, None).await, Err(Error::InvalidInput(_))));

    let doc = engine.add_document("/tmp/report.final.txt", None, Some("q3")).await.unwrap();
    assert_eq!(doc.title, "report.final");
    assert_eq!(doc.description, "q3");
    assert!(!doc.indexed);

    let missing = engine.add_directory("/definitely/not/here").await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    assert!(engine.can_parse("HTML"));
    assert!(!engine.can_parse("docx"));
    assert_eq!(engine.supported_extensions(), vec!["htm", "html", "txt", "xml"]);
}

/// Delegates to a [`MemoryStore`] but can be told to fail bigram updates.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_bigrams: AtomicBool,
}

#[async_trait]
impl Store for FlakyStore {
    async fn add_document(&self, locator: &str, title: &str, description: &str) -> Result<Document> {
        self.inner.add_document(locator, title, description).await
    }
    async fn unindexed_documents(&self) -> Result<Vec<Document>> {
        self.inner.unindexed_documents().await
    }
    async fn mark_indexed(&self, id: &DocumentId) -> Result<()> {
        self.inner.mark_indexed(id).await
    }
    async fn upsert_token_postings(
        &self,
        token: &str,
        records: &[TermFrequency],
        locators: &HashMap<String, Vec<DocumentId>>,
    ) -> Result<()> {
        self.inner.upsert_token_postings(token, records, locators).await
    }
    async fn get_token(&self, token: &str) -> Result<Option<TokenEntry>> {
        self.inner.get_token(token).await
    }
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        self.inner.get_document(id).await
    }
    async fn count_indexed_documents(&self) -> Result<u64> {
        self.inner.count_indexed_documents().await
    }
    async fn increment_unigram(&self, token: &str, delta: u64) -> Result<()> {
        self.inner.increment_unigram(token, delta).await
    }
    async fn increment_bigram(&self, before: &str, after: &str, delta: u64) -> Result<()> {
        if self.fail_bigrams.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("disk full")));
        }
        self.inner.increment_bigram(before, after, delta).await
    }
    async fn unigram_count(&self, token: &str) -> Result<u64> {
        self.inner.unigram_count(token).await
    }
    async fn bigram(&self, before: &str, after: &str) -> Result<Option<Bigram>> {
        self.inner.bigram(before, after).await
    }
    async fn top_bigrams_by_prefix(&self, prefix: &str, n: usize) -> Result<Vec<Bigram>> {
        self.inner.top_bigrams_by_prefix(prefix, n).await
    }
}

#[tokio::test]
async fn store_failure_leaves_documents_pending() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.txt", "retry me");
    let store = Arc::new(FlakyStore::default());
    store.fail_bigrams.store(true, Ordering::SeqCst);
    let engine = engine(store.clone());
    engine.add_document(&path, None, None).await.unwrap();

    assert!(engine.index_pending().await.is_err());
    assert_eq!(store.unindexed_documents().await.unwrap().len(), 1);
    // the scheduler entry point swallows the error
    engine.run_indexing_pass().await;
    assert_eq!(store.count_indexed_documents().await.unwrap(), 0);

    store.fail_bigrams.store(false, Ordering::SeqCst);
    let summary = engine.index_pending().await.unwrap();
    assert_eq!(summary.indexed, 1);
    // postings from the failed attempts were already appended
    assert_eq!(store.get_token("retri").await.unwrap().unwrap().postings.len(), 3);
}

#[tokio::test]
async fn sled_engine_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write(dir.path(), "docs/a.txt", "persistent storage engine");
    let config = EngineConfig { store_path: dir.path().join("index"), ..EngineConfig::default() };

    {
        let engine = SearchEngine::open(config.clone()).unwrap();
        engine.add_document(&doc, None, None).await.unwrap();
        engine.index_pending().await.unwrap();
    }

    let engine = SearchEngine::open(config).unwrap();
    let outcome = engine.search("storage").await.unwrap();
    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(outcome.documents[0].title, "a");
}

#[tokio::test]
async fn schedule_runs_a_pass_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "a.txt", "scheduled text");
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(engine(store.clone()));
    engine.add_document(&path, None, None).await.unwrap();

    let handle = spawn_schedule(engine.clone(), Duration::from_secs(3600));
    for _ in 0..200 {
        if store.count_indexed_documents().await.unwrap() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();
    assert_eq!(store.count_indexed_documents().await.unwrap(), 1);
}
