//! Indexing, ranking and autocomplete engine.
//!
//! Documents are parsed by extension, normalized and folded into a TF-IDF inverted index plus a
//! bigram model; [`SearchEngine`] ties the pieces to a [`store::Store`].

pub mod autocomplete;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod indexer;
pub mod ngram;
pub mod parsers;
pub mod runner;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use autocomplete::{Autocomplete, Completer};
pub use config::EngineConfig;
pub use engine::{spawn_schedule, PassSummary, SearchEngine, SearchOutcome};
pub use error::{Error, Result};
pub use index::{Bigram, Document, DocumentId, Posting, TermFrequency, TokenEntry, Unigram};
pub use indexer::{BuildIndexResult, Indexer};
pub use ngram::{NgramBuilder, NgramCounts};
pub use parsers::{FileParser, ParserRegistry};
pub use runner::{Schedule, TaskRunner};
pub use search::{Ranker, SearchHit};
pub use store::{MemoryStore, SledStore, Store};
pub use tokenizer::Normalizer;
