use crate::error::Result;
use crate::index::{DocumentId, TokenEntry};
use crate::runner::TaskRunner;
use crate::store::Store;
use crate::tokenizer::Normalizer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub description: String,
    pub locator: String,
}

/// `1 + ln(N / (df + 1))`, with N clamped to at least one document.
pub fn idf(total_documents: u64, postings: usize) -> f64 {
    let n = total_documents.max(1) as f64;
    1.0 + (n / (postings as f64 + 1.0)).ln()
}

/// Sum `tf * idf` per document over every fetched token. Keeps first-seen order.
pub fn accumulate_scores(entries: &[TokenEntry], total_documents: u64) -> Vec<(DocumentId, f64)> {
    let mut scores: Vec<(DocumentId, f64)> = Vec::new();
    let mut slots: HashMap<DocumentId, usize> = HashMap::new();
    for entry in entries {
        let idf = idf(total_documents, entry.postings.len());
        for posting in &entry.postings {
            let slot = *slots.entry(posting.document_id).or_insert_with(|| {
                scores.push((posting.document_id, 0.0));
                scores.len() - 1
            });
            scores[slot].1 += posting.tf * idf;
        }
    }
    scores
}

/// Highest score first; equal scores keep their order.
pub fn rank(mut scores: Vec<(DocumentId, f64)>, limit: usize) -> Vec<(DocumentId, f64)> {
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scores.truncate(limit);
    scores
}

/// TF-IDF ranking over the stored inverted index.
pub struct Ranker {
    store: Arc<dyn Store>,
    normalizer: Arc<Normalizer>,
    token_runner: TaskRunner,
    document_runner: TaskRunner,
    max_results: usize,
}

impl Ranker {
    pub fn new(
        store: Arc<dyn Store>,
        normalizer: Arc<Normalizer>,
        token_runner: TaskRunner,
        document_runner: TaskRunner,
        max_results: usize,
    ) -> Self {
        Self { store, normalizer, token_runner, document_runner, max_results }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let mut seen = HashSet::new();
        let tokens: Vec<String> = self
            .normalizer
            .normalize(query)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let store = &self.store;
        let fetched = self
            .token_runner
            .run(tokens, |token| async move { store.get_token(&token).await })
            .await;
        let entries: Vec<TokenEntry> = fetched.into_iter().collect::<Result<Vec<_>>>()?.into_iter().flatten().collect();
        let total = self.store.count_indexed_documents().await?;

        let scores = accumulate_scores(&entries, total);
        if scores.is_empty() {
            tracing::debug!(query, "no matching documents");
            return Ok(Vec::new());
        }
        let ranked = rank(scores, self.max_results);

        let documents = self
            .document_runner
            .run(ranked, |(id, _)| async move { store.get_document(&id).await })
            .await;
        let mut hits = Vec::new();
        for doc in documents {
            // ids deleted out-of-band resolve to None and are dropped
            if let Some(doc) = doc? {
                hits.push(SearchHit { title: doc.title, description: doc.description, locator: doc.locator });
            }
        }
        Ok(hits)
    }
}
