use crate::error::Result;
use crate::index::{Bigram, TermFrequency, Unigram};
use crate::ngram::{NgramBuilder, NgramCounts};
use crate::parsers::ParserRegistry;
use crate::runner::TaskRunner;
use crate::tokenizer::Normalizer;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything one document contributes to a build.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    pub locator: String,
    pub terms: usize,
    pub term_frequencies: HashMap<String, TermFrequency>,
    pub ngrams: NgramCounts,
}

/// Merged output of [`Indexer::build_index`].
#[derive(Debug, Default)]
pub struct BuildIndexResult {
    /// token -> one record per document containing it
    pub token_map: HashMap<String, Vec<TermFrequency>>,
    pub unigrams: Vec<Unigram>,
    pub bigrams: Vec<Bigram>,
    /// Locators that parsed successfully; everything else stays eligible for a later pass.
    pub indexed: Vec<String>,
}

/// Count normalized terms. Returns the per-token counts and the total.
pub fn count_terms(tokens: &[String]) -> (HashMap<String, u32>, usize) {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for token in tokens {
        *counts.entry(token.clone()).or_insert(0) += 1;
    }
    (counts, tokens.len())
}

/// `count / total` for every token, tagged with the source locator.
pub fn term_frequencies(counts: HashMap<String, u32>, total: usize, locator: &str) -> HashMap<String, TermFrequency> {
    counts
        .into_iter()
        .map(|(token, count)| {
            let tf = count as f64 / total as f64;
            (token, TermFrequency { count, tf, locator: locator.to_string() })
        })
        .collect()
}

#[derive(Clone)]
pub struct Indexer {
    registry: Arc<ParserRegistry>,
    normalizer: Arc<Normalizer>,
    ngrams: NgramBuilder,
    runner: TaskRunner,
}

impl Indexer {
    pub fn new(registry: Arc<ParserRegistry>, normalizer: Arc<Normalizer>, runner: TaskRunner) -> Self {
        Self { registry, normalizer, ngrams: NgramBuilder, runner }
    }

    /// Index already extracted text.
    pub fn index_text(&self, locator: &str, text: &str) -> DocumentIndex {
        let text = text.to_lowercase();
        let ngrams = self.ngrams.build(&text);
        let tokens = self.normalizer.normalize(&text);
        let (counts, terms) = count_terms(&tokens);
        DocumentIndex { locator: locator.to_string(), terms, term_frequencies: term_frequencies(counts, terms, locator), ngrams }
    }

    /// Parse one document and index its text. Blocking.
    pub fn index_document(&self, locator: &str) -> Result<DocumentIndex> {
        let text = self.registry.parse(locator)?;
        Ok(self.index_text(locator, &text))
    }

    /// Index a batch concurrently. Documents that fail to parse are logged and left out entirely.
    pub async fn build_index<F>(&self, locators: Vec<String>, on_progress: F) -> BuildIndexResult
    where
        F: Fn(&str) + Send + Sync,
    {
        let on_progress = &on_progress;
        let results = self
            .runner
            .run(locators, |locator| {
                let indexer = self.clone();
                async move {
                    let job = {
                        let locator = locator.clone();
                        tokio::task::spawn_blocking(move || indexer.index_document(&locator))
                    };
                    match job.await {
                        Ok(Ok(doc)) => {
                            on_progress(&locator);
                            Some(doc)
                        }
                        Ok(Err(err)) => {
                            tracing::warn!(locator = %locator, error = %err, "skipping document");
                            None
                        }
                        Err(err) => {
                            tracing::error!(locator = %locator, error = %err, "indexing task failed");
                            None
                        }
                    }
                }
            })
            .await;

        let mut out = BuildIndexResult::default();
        let mut ngrams = NgramCounts::default();
        for doc in results.into_iter().flatten() {
            for (token, record) in doc.term_frequencies {
                out.token_map.entry(token).or_default().push(record);
            }
            ngrams.merge(doc.ngrams);
            out.indexed.push(doc.locator);
        }
        out.unigrams = ngrams.to_unigrams();
        out.bigrams = ngrams.to_bigrams();
        tracing::debug!(
            documents = out.indexed.len(),
            tokens = out.token_map.len(),
            unigrams = out.unigrams.len(),
            bigrams = out.bigrams.len(),
            "built index batch"
        );
        out
    }
}
