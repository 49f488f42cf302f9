use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Sentinel opening every sentence in the n-gram model.
pub const START: &str = "<start>";
/// Sentinel closing every sentence in the n-gram model.
pub const END: &str = "<end>";

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"\p{P}").expect("valid regex");
    static ref SPECIAL: Regex = Regex::new(r"[^0-9a-zA-Z\s]+").expect("valid regex");
}

const STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
];

/// Remove unicode punctuation, then anything outside `[0-9a-zA-Z\s]`.
pub fn strip(text: &str) -> String {
    let no_punct = PUNCTUATION.replace_all(text, "");
    SPECIAL.replace_all(&no_punct, "").into_owned()
}

/// Split on `.` into trimmed, non-empty sentences.
pub fn sentences(text: &str) -> Vec<&str> {
    text.split('.').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Tokens of one sentence bounded by [`START`] and [`END`]. No stemming.
pub fn sentence_tokens(sentence: &str) -> Vec<String> {
    let clean = strip(sentence);
    let mut tokens = Vec::with_capacity(8);
    tokens.push(START.to_string());
    tokens.extend(clean.split_whitespace().map(str::to_string));
    tokens.push(END.to_string());
    tokens
}

/// Document/query normalizer: strip, split, lowercase, optionally drop stop words, stem (English).
pub struct Normalizer {
    stemmer: Stemmer,
    stop_words: HashSet<String>,
    remove_stop_words: bool,
}

impl Normalizer {
    /// Built-in English stop-word list.
    pub fn new(remove_stop_words: bool) -> Self {
        Self::with_stop_words(STOPWORDS.iter().map(|w| w.to_string()), remove_stop_words)
    }

    pub fn with_stop_words<I>(words: I, remove_stop_words: bool) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        // list entries go through the same stripping as the text they are matched against
        let stop_words = words
            .into_iter()
            .map(|w| strip(w.trim()).to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { stemmer: Stemmer::create(Algorithm::English), stop_words, remove_stop_words }
    }

    /// Stop words from a file, one per line.
    pub fn from_stop_words_file<P: AsRef<Path>>(path: P, remove_stop_words: bool) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::with_stop_words(text.lines().map(str::to_string), remove_stop_words))
    }

    pub fn removes_stop_words(&self) -> bool { self.remove_stop_words }

    pub fn is_stop_word(&self, token: &str) -> bool { self.stop_words.contains(token) }

    pub fn stem(&self, token: &str) -> String { self.stemmer.stem(token).into_owned() }

    pub fn normalize(&self, text: &str) -> Vec<String> {
        let clean = strip(text.trim());
        clean
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|t| !(self.remove_stop_words && self.is_stop_word(t)))
            .map(|t| self.stem(&t))
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self { Self::new(false) }
}
