use super::{postings_from, rank_and_pad, Store};
use crate::error::Result;
use crate::index::{Bigram, Document, DocumentId, TermFrequency, TokenEntry};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

const DOCUMENTS: &str = "documents";
const TOKENS: &str = "tokens";
const UNIGRAMS: &str = "unigrams";
const BIGRAMS: &str = "bigrams";
const META: &str = "meta";
const INDEXED_COUNT: &[u8] = b"indexed_documents";

/// Embedded on-disk store. Values are bincode; one sled tree per collection.
pub struct SledStore {
    root: Option<PathBuf>,
    db: Db,
    documents: Tree,
    tokens: Tree,
    unigrams: Tree,
    bigrams: Tree,
    /// Derived counters, kept in step with `documents`.
    meta: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let db = sled::open(root.as_ref())?;
        Self::from_db(db, Some(root.as_ref().to_path_buf()))
    }

    /// Store that is deleted when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db, None)
    }

    fn from_db(db: Db, root: Option<PathBuf>) -> Result<Self> {
        let store = Self {
            documents: db.open_tree(DOCUMENTS)?,
            tokens: db.open_tree(TOKENS)?,
            unigrams: db.open_tree(UNIGRAMS)?,
            bigrams: db.open_tree(BIGRAMS)?,
            meta: db.open_tree(META)?,
            root,
            db,
        };
        if store.meta.get(INDEXED_COUNT)?.is_none() {
            // stores written before the counter existed
            let mut count: u64 = 0;
            for doc in store.documents() {
                if doc?.indexed {
                    count += 1;
                }
            }
            store.meta.insert(INDEXED_COUNT, bincode::serialize(&count)?)?;
        }
        Ok(store)
    }

    pub fn root(&self) -> Option<&Path> { self.root.as_deref() }

    fn documents(&self) -> impl Iterator<Item = Result<Document>> + '_ {
        self.documents.iter().map(|item| -> Result<Document> {
            let (_, bytes) = item?;
            Ok(bincode::deserialize(&bytes)?)
        })
    }
}

/// Bigram key: lowercased `before`, then the exact pair, NUL separated. A byte-prefix scan on a
/// lowercased anchor is then a case-insensitive prefix match on `before`.
fn bigram_key(before: &str, after: &str) -> Vec<u8> {
    let folded = before.to_lowercase();
    let mut key = Vec::with_capacity(folded.len() + before.len() + after.len() + 2);
    key.extend_from_slice(folded.as_bytes());
    key.push(0);
    key.extend_from_slice(before.as_bytes());
    key.push(0);
    key.extend_from_slice(after.as_bytes());
    key
}

fn load<T: DeserializeOwned>(tree: &Tree, key: &[u8]) -> Result<Option<T>> {
    match tree.get(key)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

/// Read-modify-write with compare-and-swap, retried until no concurrent writer interferes.
/// `f` returning `None` leaves the key untouched.
fn update<T, F>(tree: &Tree, key: &[u8], mut f: F) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(Option<T>) -> Option<T>,
{
    loop {
        let current = tree.get(key)?;
        let value = match &current {
            Some(bytes) => Some(bincode::deserialize::<T>(bytes)?),
            None => None,
        };
        let Some(next) = f(value) else { return Ok(None) };
        let encoded = bincode::serialize(&next)?;
        if tree.compare_and_swap(key, current, Some(encoded))?.is_ok() {
            return Ok(Some(next));
        }
    }
}

#[async_trait]
impl Store for SledStore {
    async fn add_document(&self, locator: &str, title: &str, description: &str) -> Result<Document> {
        let doc = Document::new(locator, title, description);
        self.documents.insert(doc.id.as_bytes(), bincode::serialize(&doc)?)?;
        Ok(doc)
    }

    async fn unindexed_documents(&self) -> Result<Vec<Document>> {
        let mut out = Vec::new();
        for doc in self.documents() {
            let doc = doc?;
            if !doc.indexed {
                out.push(doc);
            }
        }
        Ok(out)
    }

    async fn mark_indexed(&self, id: &DocumentId) -> Result<()> {
        let now = OffsetDateTime::now_utc();
        let mut newly_indexed = false;
        let updated = update::<Document, _>(&self.documents, id.as_bytes(), |doc| {
            let mut doc = doc?;
            newly_indexed = !doc.indexed;
            doc.mark_indexed(now);
            Some(doc)
        })?;
        if updated.is_none() {
            tracing::warn!(%id, "cannot mark missing document as indexed");
        } else if newly_indexed {
            update::<u64, _>(&self.meta, INDEXED_COUNT, |count| Some(count.unwrap_or(0) + 1))?;
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
        update::<TokenEntry, _>(&self.tokens, token.as_bytes(), |entry| {
            let mut entry = entry.unwrap_or_else(|| TokenEntry { token: token.to_string(), postings: Vec::new() });
            entry.postings.extend(postings.iter().cloned());
            Some(entry)
        })?;
        Ok(())
    }

    async fn get_token(&self, token: &str) -> Result<Option<TokenEntry>> {
        load(&self.tokens, token.as_bytes())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        load(&self.documents, id.as_bytes())
    }

    async fn count_indexed_documents(&self) -> Result<u64> {
        Ok(load(&self.meta, INDEXED_COUNT)?.unwrap_or(0))
    }

    async fn increment_unigram(&self, token: &str, delta: u64) -> Result<()> {
        update::<u64, _>(&self.unigrams, token.as_bytes(), |count| Some(count.unwrap_or(0) + delta))?;
        Ok(())
    }

    async fn increment_bigram(&self, before: &str, after: &str, delta: u64) -> Result<()> {
        update::<Bigram, _>(&self.bigrams, &bigram_key(before, after), |bigram| {
            let mut bigram = bigram.unwrap_or_else(|| Bigram::new(before, after, 0));
            bigram.count += delta;
            Some(bigram)
        })?;
        Ok(())
    }

    async fn unigram_count(&self, token: &str) -> Result<u64> {
        Ok(load(&self.unigrams, token.as_bytes())?.unwrap_or(0))
    }

    async fn bigram(&self, before: &str, after: &str) -> Result<Option<Bigram>> {
        load(&self.bigrams, &bigram_key(before, after))
    }

    async fn top_bigrams_by_prefix(&self, prefix: &str, n: usize) -> Result<Vec<Bigram>> {
        let mut matches = Vec::new();
        for item in self.bigrams.scan_prefix(prefix.to_lowercase().as_bytes()) {
            let (_, bytes) = item?;
            matches.push(bincode::deserialize::<Bigram>(&bytes)?);
        }
        Ok(rank_and_pad(matches, prefix, n))
    }

    async fn flush(&self) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.flush()).await??;
        Ok(())
    }
}
