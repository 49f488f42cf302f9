use crate::error::Result;
use crate::index::Bigram;
use crate::store::Store;
use crate::tokenizer::END;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Autocomplete {
    pub query: String,
    pub suggestions: Vec<String>,
}

/// Extends a partial query by walking the bigram model.
///
/// Each candidate is completed greedily: take the single most frequent continuation of the
/// current anchor until `<end>` comes up or `max_steps` tokens were appended. There is no cycle
/// detection; the step bound is what stops `a -> b -> a -> ...`. Suggestions may repeat.
pub struct Completer {
    store: Arc<dyn Store>,
    suggestions: usize,
    max_steps: usize,
}

impl Completer {
    pub fn new(store: Arc<dyn Store>, suggestions: usize, max_steps: usize) -> Self {
        Self { store, suggestions, max_steps }
    }

    pub async fn suggest(&self, query: &str) -> Result<Vec<String>> {
        let words: Vec<&str> = query.split_whitespace().collect();
        let Some((anchor, head)) = words.split_last() else {
            return Ok(Vec::new());
        };
        let candidates = self.store.top_bigrams_by_prefix(anchor, self.suggestions).await?;
        let head = head.join(" ");
        try_join_all(candidates.into_iter().map(|bigram| self.complete(&head, bigram))).await
    }

    async fn complete(&self, head: &str, bigram: Bigram) -> Result<String> {
        // the typed anchor is swapped for the stored token it prefixes
        let partial = if head.is_empty() { bigram.before } else { format!("{head} {}", bigram.before) };
        if bigram.after == END {
            return Ok(partial);
        }
        let mut built = format!("{partial} {}", bigram.after);
        let mut anchor = bigram.after;
        for _ in 0..self.max_steps {
            let next = self.store.top_bigrams_by_prefix(&anchor, 1).await?;
            match next.into_iter().next() {
                Some(b) if b.after != END => {
                    built.push(' ');
                    built.push_str(&b.after);
                    anchor = b.after;
                }
                _ => break,
            }
        }
        Ok(built)
    }
}
