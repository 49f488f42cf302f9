use crate::error::{Error, Result};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Turns one local file into plain text.
pub trait FileParser: Send + Sync {
    fn parse_local_file(&self, path: &Path) -> Result<String>;
}

fn read_existing(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    Ok(fs::read(path)?)
}

pub struct TxtParser;

impl FileParser for TxtParser {
    fn parse_local_file(&self, path: &Path) -> Result<String> {
        let bytes = read_existing(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Text content of `<body>`; scripts and styles are skipped.
pub struct HtmlParser;

impl FileParser for HtmlParser {
    fn parse_local_file(&self, path: &Path) -> Result<String> {
        let bytes = read_existing(path)?;
        let doc = Html::parse_document(&String::from_utf8_lossy(&bytes));
        Ok(body_text(&doc))
    }
}

fn body_text(doc: &Html) -> String {
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    let Some(body) = doc.select(&selector).next() else {
        return String::new();
    };
    let mut parts: Vec<&str> = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let skipped = node
            .parent()
            .and_then(|p| p.value().as_element().map(|el| matches!(el.name(), "script" | "style")))
            .unwrap_or(false);
        let text = text.trim();
        if !skipped && !text.is_empty() {
            parts.push(text);
        }
    }
    // element boundaries separate words
    parts.join(" ")
}

/// Concatenated text nodes of the document element.
pub struct XmlParser;

impl FileParser for XmlParser {
    fn parse_local_file(&self, path: &Path) -> Result<String> {
        let bytes = read_existing(path)?;
        let fragment = Html::parse_fragment(&String::from_utf8_lossy(&bytes));
        let text: Vec<&str> = fragment.root_element().text().map(str::trim).filter(|t| !t.is_empty()).collect();
        Ok(text.join(" "))
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Extension -> parser lookup.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn FileParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self { Self::default() }

    /// txt, html/htm and xml.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let html: Arc<dyn FileParser> = Arc::new(HtmlParser);
        registry.parsers.insert("txt".into(), Arc::new(TxtParser));
        registry.parsers.insert("html".into(), html.clone());
        registry.parsers.insert("htm".into(), html);
        registry.parsers.insert("xml".into(), Arc::new(XmlParser));
        registry
    }

    pub fn register(&mut self, ext: &str, parser: Arc<dyn FileParser>) -> Result<()> {
        let ext = normalize_extension(ext);
        if self.parsers.contains_key(&ext) {
            return Err(Error::DuplicateParser(ext));
        }
        self.parsers.insert(ext, parser);
        Ok(())
    }

    pub fn get(&self, ext: &str) -> Option<Arc<dyn FileParser>> {
        self.parsers.get(&normalize_extension(ext)).cloned()
    }

    pub fn can_parse(&self, ext: &str) -> bool {
        self.parsers.contains_key(&normalize_extension(ext))
    }

    pub fn supported_extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self.parsers.keys().cloned().collect();
        exts.sort();
        exts
    }

    /// Resolve the parser by the locator's extension and extract its text.
    pub fn parse(&self, locator: &str) -> Result<String> {
        let path = Path::new(locator);
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let parser = self.get(ext).ok_or_else(|| Error::UnsupportedExtension(ext.to_string()))?;
        parser.parse_local_file(path)
    }
}
