use crate::autocomplete::{Autocomplete, Completer};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::index::{Document, DocumentId};
use crate::indexer::{BuildIndexResult, Indexer};
use crate::ngram::NgramCounts;
use crate::parsers::ParserRegistry;
use crate::runner::TaskRunner;
use crate::search::{Ranker, SearchHit};
use crate::store::{SledStore, Store};
use crate::tokenizer::Normalizer;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub documents: Vec<SearchHit>,
    pub elapsed_millis: u128,
}

/// What one indexing pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub pending: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub tokens: usize,
    pub unigrams: usize,
    pub bigrams: usize,
}

pub struct SearchEngine {
    config: EngineConfig,
    store: Arc<dyn Store>,
    registry: Arc<ParserRegistry>,
    indexer: Indexer,
    ranker: Ranker,
    completer: Completer,
    merge_runner: TaskRunner,
    pass_lock: Mutex<()>,
}

impl SearchEngine {
    pub fn new(config: EngineConfig, store: Arc<dyn Store>) -> Result<Self> {
        Self::with_registry(config, store, ParserRegistry::with_defaults())
    }

    pub fn with_registry(config: EngineConfig, store: Arc<dyn Store>, registry: ParserRegistry) -> Result<Self> {
        let normalizer = Arc::new(match &config.stop_words_path {
            Some(path) => Normalizer::from_stop_words_file(path, config.remove_stop_words)?,
            None => Normalizer::new(config.remove_stop_words),
        });
        let registry = Arc::new(registry);
        let runner = |limit| TaskRunner::new(limit, config.schedule);
        let indexer = Indexer::new(registry.clone(), normalizer.clone(), runner(config.index_concurrency));
        let ranker = Ranker::new(
            store.clone(),
            normalizer,
            runner(config.token_concurrency),
            runner(config.document_concurrency),
            config.max_results,
        );
        let completer = Completer::new(store.clone(), config.suggestions, config.completion_steps);
        Ok(Self {
            merge_runner: runner(config.index_concurrency),
            config,
            store,
            registry,
            indexer,
            ranker,
            completer,
            pass_lock: Mutex::new(()),
        })
    }

    /// Engine over a [`SledStore`] at `config.store_path`.
    pub fn open(config: EngineConfig) -> Result<Self> {
        let store = SledStore::open(&config.store_path)?;
        tracing::info!(path = %config.store_path.display(), "opened store");
        Self::new(config, Arc::new(store))
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn store(&self) -> &Arc<dyn Store> { &self.store }

    pub fn indexer(&self) -> &Indexer { &self.indexer }

    pub fn can_parse(&self, extension: &str) -> bool { self.registry.can_parse(extension) }

    pub fn supported_extensions(&self) -> Vec<String> { self.registry.supported_extensions() }

    /// Create an unindexed document. Title defaults to the file stem.
    pub async fn add_document(&self, locator: &str, title: Option<&str>, description: Option<&str>) -> Result<Document> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(Error::InvalidInput("empty locator".into()));
        }
        let title = match title {
            Some(t) => t.to_string(),
            None => Path::new(locator).file_stem().and_then(|s| s.to_str()).unwrap_or_default().to_string(),
        };
        let doc = self.store.add_document(locator, &title, description.unwrap_or_default()).await?;
        tracing::debug!(id = %doc.id, locator, "added document");
        Ok(doc)
    }

    /// Add every parseable file under `dir`, recursively.
    pub async fn add_directory<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<Document>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::NotFound(dir.to_path_buf()));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if !p.is_file() {
                continue;
            }
            if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                if self.can_parse(ext) {
                    files.push(p.to_string_lossy().into_owned());
                }
            }
        }
        let mut added = Vec::with_capacity(files.len());
        for file in files {
            added.push(self.add_document(&file, None, None).await?);
        }
        tracing::info!(dir = %dir.display(), added = added.len(), "added directory");
        Ok(added)
    }

    /// Index every unindexed document and merge the result into the store.
    ///
    /// Documents are only marked indexed after all merges succeeded. A store failure aborts the
    /// pass and leaves them unindexed, so a retry may append their postings a second time.
    pub async fn index_pending(&self) -> Result<PassSummary> {
        let _pass = self.pass_lock.lock().await;
        let documents = self.store.unindexed_documents().await?;
        if documents.is_empty() {
            tracing::debug!("no documents to index");
            return Ok(PassSummary::default());
        }

        let started = Instant::now();
        // documents sharing a locator are parsed once and each gets its own postings
        let mut by_locator: HashMap<String, Vec<DocumentId>> = HashMap::new();
        let mut locators: Vec<String> = Vec::new();
        for doc in &documents {
            let ids = by_locator.entry(doc.locator.clone()).or_default();
            if ids.is_empty() {
                locators.push(doc.locator.clone());
            }
            ids.push(doc.id);
        }
        let build = self
            .indexer
            .build_index(locators, |locator| tracing::debug!(locator, "indexed document"))
            .await;
        tracing::debug!(
            documents = documents.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built new index"
        );

        let to_mark: Vec<DocumentId> = {
            let built: HashSet<&str> = build.indexed.iter().map(String::as_str).collect();
            documents.iter().filter(|d| built.contains(d.locator.as_str())).map(|d| d.id).collect()
        };
        let summary = PassSummary {
            pending: documents.len(),
            indexed: to_mark.len(),
            skipped: documents.len() - to_mark.len(),
            tokens: build.token_map.len(),
            unigrams: build.unigrams.len(),
            bigrams: build.bigrams.len(),
        };
        self.merge(build, &by_locator).await?;

        let store = &self.store;
        let marked = self.merge_runner.run(to_mark, |id| async move { store.mark_indexed(&id).await }).await;
        marked.into_iter().collect::<Result<Vec<_>>>()?;
        self.store.flush().await?;

        tracing::info!(
            indexed = summary.indexed,
            skipped = summary.skipped,
            tokens = summary.tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "indexing pass complete"
        );
        Ok(summary)
    }

    async fn merge(&self, build: BuildIndexResult, by_locator: &HashMap<String, Vec<DocumentId>>) -> Result<()> {
        let store = &self.store;
        let started = Instant::now();
        let upserts = self
            .merge_runner
            .run(build.token_map, |(token, records)| async move {
                store.upsert_token_postings(&token, &records, by_locator).await
            })
            .await;
        upserts.into_iter().collect::<Result<Vec<_>>>()?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "updated the index");

        let mut ngrams = NgramCounts::default();
        for u in build.unigrams {
            ngrams.add_unigram(&u.token, u.count);
        }
        for b in build.bigrams {
            ngrams.add_bigram(&b.before, &b.after, b.count);
        }
        let unigrams = self
            .merge_runner
            .run(ngrams.unigrams, |(token, delta)| async move { store.increment_unigram(&token, delta).await })
            .await;
        unigrams.into_iter().collect::<Result<Vec<_>>>()?;
        let bigrams = self
            .merge_runner
            .run(ngrams.bigrams, |((before, after), delta)| async move {
                store.increment_bigram(&before, &after, delta).await
            })
            .await;
        bigrams.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    /// Scheduler entry point: one full pass, failures only logged.
    pub async fn run_indexing_pass(&self) {
        if let Err(err) = self.index_pending().await {
            tracing::error!(error = %err, "indexing pass failed");
        }
    }

    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let started = Instant::now();
        let documents = self.ranker.search(query).await?;
        let elapsed_millis = started.elapsed().as_millis();
        tracing::info!(query, hits = documents.len(), elapsed_ms = elapsed_millis as u64, "search");
        Ok(SearchOutcome { query: query.to_string(), documents, elapsed_millis })
    }

    pub async fn autocomplete(&self, query: &str) -> Result<Autocomplete> {
        let suggestions = self.completer.suggest(query).await?;
        Ok(Autocomplete { query: query.to_string(), suggestions })
    }
}

/// Run [`SearchEngine::run_indexing_pass`] every `period`, starting immediately.
pub fn spawn_schedule(engine: Arc<SearchEngine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            tracing::info!("starting scheduled indexing pass");
            engine.run_indexing_pass().await;
        }
    })
}
