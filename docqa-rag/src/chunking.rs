//! Splitting documents into chunks before embedding.
//!
//! - [`FixedSizeChunker`]: sliding character window with overlap
//! - [`RecursiveChunker`]: paragraphs first, then sentences, then words
//! - [`MarkdownChunker`]: one chunk per header section, oversized sections
//!   split recursively
//!
//! Sizes are counted in `char`s, so no chunk ever ends inside a UTF-8
//! sequence.

use crate::config::ChunkingConfig;
use crate::document::{Chunk, Document};

/// Boundaries tried in order by the recursive splitters.
const SEPARATORS: [&str; 5] = ["\n\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
///
/// Chunks come back without embeddings. Every chunk carries the document's
/// metadata plus `chunk_index`; an empty document yields no chunks.
pub trait Chunker: Send + Sync {
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Sliding window of `chunk_size` characters advancing by
/// `chunk_size - chunk_overlap`.
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeChunker {
    config: ChunkingConfig,
}

impl FixedSizeChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        into_chunks(document, window(&document.text, self.config), None)
    }
}

/// Splits on the coarsest boundary that yields pieces within `chunk_size`,
/// greedily packing neighbouring pieces back together. Text with no usable
/// boundary falls back to a [`FixedSizeChunker`] window.
#[derive(Debug, Clone, Copy)]
pub struct RecursiveChunker {
    config: ChunkingConfig,
}

impl RecursiveChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        into_chunks(document, split_recursive(&document.text, self.config, &SEPARATORS), None)
    }
}

/// One chunk per header section, prefixed with the header trail
/// (`Guide > Install`), which is also stored as `header_path` metadata.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownChunker {
    config: ChunkingConfig,
}

impl MarkdownChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }
}

impl Chunker for MarkdownChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for section in sections(&document.text) {
            let text = match (section.trail.is_empty(), section.body.is_empty()) {
                (true, _) => section.body,
                (false, true) => section.trail.clone(),
                (false, false) => format!("{}\n{}", section.trail, section.body),
            };
            if text.is_empty() {
                continue;
            }
            let pieces = split_recursive(&text, self.config, &SEPARATORS);
            let trail = (!section.trail.is_empty()).then_some(section.trail.as_str());
            for piece in pieces {
                let index = chunks.len();
                chunks.push(make_chunk(document, index, piece, trail));
            }
        }
        chunks
    }
}

/// Pick a chunker by file name: `.md` / `.markdown` get [`MarkdownChunker`],
/// everything else [`RecursiveChunker`].
pub fn chunker_for(filename: &str, config: ChunkingConfig) -> Box<dyn Chunker> {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".md") || lower.ends_with(".markdown") {
        Box::new(MarkdownChunker::new(config))
    } else {
        Box::new(RecursiveChunker::new(config))
    }
}

fn into_chunks(document: &Document, texts: Vec<String>, trail: Option<&str>) -> Vec<Chunk> {
    texts.into_iter().enumerate().map(|(i, text)| make_chunk(document, i, text, trail)).collect()
}

fn make_chunk(document: &Document, index: usize, text: String, trail: Option<&str>) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert("chunk_index".to_string(), index.to_string());
    if let Some(trail) = trail {
        metadata.insert("header_path".to_string(), trail.to_string());
    }
    Chunk {
        id: format!("{}_{index}", document.id),
        text,
        embedding: Vec::new(),
        metadata,
        document_id: document.id.clone(),
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn window(text: &str, config: ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || config.chunk_size == 0 {
        return Vec::new();
    }

    let step = config.chunk_size.saturating_sub(config.chunk_overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + config.chunk_size).min(chars.len());
        out.push(chars[start..end].iter().collect());
        if end == chars.len() {
            return out;
        }
        start += step;
    }
}

fn split_recursive(text: &str, config: ChunkingConfig, separators: &[&str]) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    if char_len(text) <= config.chunk_size {
        return vec![text.to_string()];
    }
    let Some((separator, finer)) = separators.split_first() else {
        return window(text, config);
    };

    let mut out = Vec::new();
    let mut buffer = String::new();
    for piece in text.split_inclusive(separator) {
        if !buffer.is_empty() && char_len(&buffer) + char_len(piece) > config.chunk_size {
            flush(&mut buffer, &mut out, config, finer);
        }
        buffer.push_str(piece);
    }
    flush(&mut buffer, &mut out, config, finer);
    out
}

/// Emit the packed buffer, splitting it further if a single piece overflowed.
fn flush(buffer: &mut String, out: &mut Vec<String>, config: ChunkingConfig, finer: &[&str]) {
    let text = std::mem::take(buffer);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    if char_len(trimmed) <= config.chunk_size {
        out.push(trimmed.to_string());
    } else {
        out.extend(split_recursive(trimmed, config, finer));
    }
}

struct Section {
    /// Header trail, e.g. `Guide > Install`. Empty before the first header.
    trail: String,
    body: String,
}

fn sections(text: &str) -> Vec<Section> {
    let mut out = Vec::new();
    let mut headers: Vec<String> = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    let mut close = |headers: &[String], body: &mut Vec<&str>| {
        let section = Section { trail: headers.join(" > "), body: body.join("\n").trim().to_string() };
        body.clear();
        if !section.trail.is_empty() || !section.body.is_empty() {
            out.push(section);
        }
    };

    for line in text.lines() {
        let trimmed = line.trim_start();
        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if level == 0 {
            body.push(line);
            continue;
        }
        close(&headers, &mut body);
        headers.truncate(level - 1);
        headers.push(trimmed[level..].trim().to_string());
    }
    close(&headers, &mut body);
    out
}
