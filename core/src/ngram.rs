use crate::index::{Bigram, Unigram};
use crate::tokenizer::{sentence_tokens, sentences};
use std::collections::HashMap;

/// Keyed unigram/bigram counts for one text or a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramCounts {
    pub unigrams: HashMap<String, u64>,
    pub bigrams: HashMap<(String, String), u64>,
}

impl NgramCounts {
    pub fn add_unigram(&mut self, token: &str, delta: u64) {
        *self.unigrams.entry(token.to_string()).or_insert(0) += delta;
    }

    pub fn add_bigram(&mut self, before: &str, after: &str, delta: u64) {
        *self.bigrams.entry((before.to_string(), after.to_string())).or_insert(0) += delta;
    }

    pub fn unigram(&self, token: &str) -> u64 {
        self.unigrams.get(token).copied().unwrap_or(0)
    }

    pub fn bigram(&self, before: &str, after: &str) -> u64 {
        self.bigrams.get(&(before.to_string(), after.to_string())).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: NgramCounts) {
        for (token, count) in other.unigrams {
            *self.unigrams.entry(token).or_insert(0) += count;
        }
        for (pair, count) in other.bigrams {
            *self.bigrams.entry(pair).or_insert(0) += count;
        }
    }

    pub fn to_unigrams(&self) -> Vec<Unigram> {
        self.unigrams.iter().map(|(token, &count)| Unigram { token: token.clone(), count }).collect()
    }

    pub fn to_bigrams(&self) -> Vec<Bigram> {
        self.bigrams.iter().map(|((b, a), &count)| Bigram::new(b.clone(), a.clone(), count)).collect()
    }
}

/// Builds the autocomplete language model from raw (already lowercased) text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NgramBuilder;

impl NgramBuilder {
    pub fn build(&self, text: &str) -> NgramCounts {
        let mut counts = NgramCounts::default();
        for sentence in sentences(text) {
            let tokens = sentence_tokens(sentence);
            for i in 1..tokens.len() {
                if i == 1 {
                    counts.add_unigram(&tokens[0], 1);
                }
                counts.add_unigram(&tokens[i], 1);
                counts.add_bigram(&tokens[i - 1], &tokens[i], 1);
            }
        }
        counts
    }
}
