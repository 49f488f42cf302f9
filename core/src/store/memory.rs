use super::{postings_from, rank_and_pad, Store};
use crate::error::Result;
use crate::index::{Bigram, Document, DocumentId, TermFrequency, TokenEntry};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use time::OffsetDateTime;

#[derive(Default)]
struct Inner {
    documents: BTreeMap<DocumentId, Document>,
    tokens: HashMap<String, TokenEntry>,
    unigrams: HashMap<String, u64>,
    bigrams: BTreeMap<(String, String), Bigram>,
}

/// Process-local store with the same semantics as [`super::SledStore`]. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Insert a fully formed document, e.g. one that is already indexed.
    pub fn insert_document(&self, doc: Document) {
        self.inner.write().documents.insert(doc.id, doc);
    }

    /// Replace a token's postings wholesale.
    pub fn insert_token(&self, entry: TokenEntry) {
        self.inner.write().tokens.insert(entry.token.clone(), entry);
    }

    pub fn remove_document(&self, id: &DocumentId) -> Option<Document> {
        self.inner.write().documents.remove(id)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add_document(&self, locator: &str, title: &str, description: &str) -> Result<Document> {
        let doc = Document::new(locator, title, description);
        self.inner.write().documents.insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn unindexed_documents(&self) -> Result<Vec<Document>> {
        Ok(self.inner.read().documents.values().filter(|d| !d.indexed).cloned().collect())
    }

    async fn mark_indexed(&self, id: &DocumentId) -> Result<()> {
        match self.inner.write().documents.get_mut(id) {
            Some(doc) => doc.mark_indexed(OffsetDateTime::now_utc()),
            None => tracing::warn!(%id, "cannot mark missing document as indexed"),
        }
        Ok(())
    }

    async fn upsert_token_postings(
        &self,
        token: &str,
        records: &[TermFrequency],
        locators: &HashMap<String, Vec<DocumentId>>,
    ) -> Result<()> {
        let postings = postings_from(token, records, locators);
        let mut inner = self.inner.write();
        let entry = inner
            .tokens
            .entry(token.to_string())
            .or_insert_with(|| TokenEntry { token: token.to_string(), postings: Vec::new() });
        entry.postings.extend(postings);
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<TokenEntry>> {
        Ok(self.inner.read().tokens.get(token).cloned())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        Ok(self.inner.read().documents.get(id).cloned())
    }

    async fn count_indexed_documents(&self) -> Result<u64> {
        Ok(self.inner.read().documents.values().filter(|d| d.indexed).count() as u64)
    }

    async fn increment_unigram(&self, token: &str, delta: u64) -> Result<()> {
        *self.inner.write().unigrams.entry(token.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn increment_bigram(&self, before: &str, after: &str, delta: u64) -> Result<()> {
        let mut inner = self.inner.write();
        let bigram = inner
            .bigrams
            .entry((before.to_string(), after.to_string()))
            .or_insert_with(|| Bigram::new(before, after, 0));
        bigram.count += delta;
        Ok(())
    }

    async fn unigram_count(&self, token: &str) -> Result<u64> {
        Ok(self.inner.read().unigrams.get(token).copied().unwrap_or(0))
    }

    async fn bigram(&self, before: &str, after: &str) -> Result<Option<Bigram>> {
        Ok(self.inner.read().bigrams.get(&(before.to_string(), after.to_string())).cloned())
    }

    async fn top_bigrams_by_prefix(&self, prefix: &str, n: usize) -> Result<Vec<Bigram>> {
        let folded = prefix.to_lowercase();
        let matches = self
            .inner
            .read()
            .bigrams
            .values()
            .filter(|b| b.before.to_lowercase().starts_with(&folded))
            .cloned()
            .collect();
        Ok(rank_and_pad(matches, prefix, n))
    }
}
