use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

pub type DocumentId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    /// Path or URL the parser reads from.
    pub locator: String,
    pub title: String,
    pub description: String,
    pub indexed: bool,
    /// Unix seconds on the wire; bincode cannot decode self-describing formats like RFC 3339.
    #[serde(with = "time::serde::timestamp::option")]
    pub last_indexed: Option<OffsetDateTime>,
}

impl Document {
    /// A fresh, unindexed document.
    pub fn new(locator: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            locator: locator.into(),
            title: title.into(),
            description: description.into(),
            indexed: false,
            last_indexed: None,
        }
    }

    pub fn mark_indexed(&mut self, at: OffsetDateTime) {
        self.indexed = true;
        self.last_indexed = Some(at);
    }
}

/// One (token, document) entry of the inverted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub tf: f64, // count / terms in document
    pub document_id: DocumentId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub postings: Vec<Posting>,
}

/// A token's frequency in one document, still keyed by the document's locator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermFrequency {
    pub count: u32,
    pub tf: f64,
    pub locator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unigram {
    pub token: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bigram {
    pub before: String,
    pub after: String,
    pub count: u64,
    // reserved for scoring; the indexer leaves both at zero
    pub probability: f64,
    pub log_probability: f64,
}

impl Bigram {
    pub fn new(before: impl Into<String>, after: impl Into<String>, count: u64) -> Self {
        Self { before: before.into(), after: after.into(), count, probability: 0.0, log_probability: 0.0 }
    }
}
