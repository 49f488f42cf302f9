//! Persistence for documents, the inverted index and the n-gram tables.
//!
//! Every operation is atomic on its own; nothing here spans a transaction.

mod disk;
mod memory;

pub use disk::SledStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::index::{Bigram, Document, DocumentId, Posting, TermFrequency, TokenEntry};
use crate::tokenizer::END;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Store: Send + Sync {
    async fn add_document(&self, locator: &str, title: &str, description: &str) -> Result<Document>;

    async fn unindexed_documents(&self) -> Result<Vec<Document>>;

    async fn mark_indexed(&self, id: &DocumentId) -> Result<()>;

    /// Append one posting per (record, document) to `token`'s list, creating the entry if needed.
    /// A locator shared by several documents yields one posting for each of them.
    /// Records whose locator is missing from `locators` are skipped.
    /// Not idempotent: the same records pushed twice are stored twice.
    async fn upsert_token_postings(
        &self,
        token: &str,
        records: &[TermFrequency],
        locators: &HashMap<String, Vec<DocumentId>>,
    ) -> Result<()>;

    async fn get_token(&self, token: &str) -> Result<Option<TokenEntry>>;

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>>;

    async fn count_indexed_documents(&self) -> Result<u64>;

    async fn increment_unigram(&self, token: &str, delta: u64) -> Result<()>;

    async fn increment_bigram(&self, before: &str, after: &str, delta: u64) -> Result<()>;

    async fn unigram_count(&self, token: &str) -> Result<u64>;

    async fn bigram(&self, before: &str, after: &str) -> Result<Option<Bigram>>;

    /// Up to `n` bigrams whose `before` starts with `prefix` (ignoring case), highest count first,
    /// padded to exactly `n` with zero-count `(prefix, <end>)` entries.
    async fn top_bigrams_by_prefix(&self, prefix: &str, n: usize) -> Result<Vec<Bigram>>;

    /// Make completed writes durable. No-op for stores without a disk.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Sort `matches` by count descending (stable), keep `n` and pad with `<end>` placeholders.
pub(crate) fn rank_and_pad(mut matches: Vec<Bigram>, prefix: &str, n: usize) -> Vec<Bigram> {
    matches.sort_by(|a, b| b.count.cmp(&a.count));
    matches.truncate(n);
    while matches.len() < n {
        matches.push(Bigram::new(prefix, END, 0));
    }
    matches
}

pub(crate) fn postings_from(
    token: &str,
    records: &[TermFrequency],
    locators: &HashMap<String, Vec<DocumentId>>,
) -> Vec<Posting> {
    let mut postings = Vec::with_capacity(records.len());
    for r in records {
        match locators.get(&r.locator) {
            Some(ids) if !ids.is_empty() => {
                postings.extend(ids.iter().map(|id| Posting { tf: r.tf, document_id: *id }));
            }
            _ => tracing::warn!(token, locator = %r.locator, "no document for locator; posting dropped"),
        }
    }
    postings
}
