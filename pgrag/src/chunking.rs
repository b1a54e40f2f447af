//! Text chunking strategies.
//!
//! This module provides the [`Chunker`] trait and three implementations:
//!
//! - [`WordWindowChunker`]: overlapping windows of a fixed number of words
//! - [`SentenceChunker`]: groups whole sentences up to a word budget
//! - [`RecursiveChunker`]: splits hierarchically by paragraphs, lines, sentences, then words
//!
//! Every chunker returns a finite, ordered `Vec<String>` that covers every
//! word of the input. Parameters are validated when the chunker is built, so
//! [`Chunker::chunk`] itself cannot fail.

use std::collections::VecDeque;

use crate::error::{RagError, Result};

/// A strategy for splitting text into chunks.
///
/// Implementations are pure: the same input always produces the same chunks
/// in the same order. Empty or whitespace-only text yields no chunks.
pub trait Chunker: Send + Sync {
    /// Split `text` into ordered chunks.
    fn chunk(&self, text: &str) -> Vec<String>;
}

fn validate_window(window_size: usize, overlap: usize, unit: &str) -> Result<()> {
    if overlap >= window_size {
        return Err(RagError::Validation(format!(
            "overlap ({overlap} {unit}) must be less than the window size ({window_size} {unit})"
        )));
    }
    Ok(())
}

/// Split `text` into windows of `window_size` words advancing by
/// `window_size - overlap` words.
///
/// The last window may be shorter than `window_size`. Windowing stops at the
/// first window that reaches the final word, so every pair of adjacent
/// windows shares exactly `overlap` words. Words are re-joined with a single
/// space.
///
/// # Errors
///
/// Returns [`RagError::Validation`] if `overlap >= window_size`.
///
/// # Example
///
/// ```rust,ignore
/// let chunks = pgrag::chunking::chunk_words("a b c d e", 3, 1)?;
/// assert_eq!(chunks, vec!["a b c", "c d e"]);
/// ```
pub fn chunk_words(text: &str, window_size: usize, overlap: usize) -> Result<Vec<String>> {
    validate_window(window_size, overlap, "words")?;
    let words: Vec<&str> = text.split_whitespace().collect();
    Ok(word_windows(&words, window_size, window_size - overlap))
}

fn word_windows(words: &[&str], window_size: usize, stride: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + window_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += stride;
    }
    chunks
}

/// Splits text into overlapping word-count windows.
///
/// # Example
///
/// ```rust,ignore
/// use pgrag::WordWindowChunker;
///
/// let chunker = WordWindowChunker::new(1000, 100)?;
/// let chunks = chunker.chunk(&long_text);
/// ```
#[derive(Debug, Clone)]
pub struct WordWindowChunker {
    window_size: usize,
    overlap: usize,
}

impl WordWindowChunker {
    /// Create a new `WordWindowChunker`.
    ///
    /// # Arguments
    ///
    /// * `window_size`: number of words per chunk
    /// * `overlap`: number of words shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if `overlap >= window_size`.
    pub fn new(window_size: usize, overlap: usize) -> Result<Self> {
        validate_window(window_size, overlap, "words")?;
        Ok(Self { window_size, overlap })
    }

    /// Number of words per chunk.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Number of words shared by consecutive chunks.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Chunker for WordWindowChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        word_windows(&words, self.window_size, self.window_size - self.overlap)
    }
}

/// Groups whole sentences into chunks of at most `max_words` words.
///
/// A sentence ends at a word whose last character (ignoring closing quotes
/// and brackets) is `.`, `!` or `?`. A single sentence longer than
/// `max_words` is split into word windows without overlap.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    max_words: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if `max_words` is zero.
    pub fn new(max_words: usize) -> Result<Self> {
        if max_words == 0 {
            return Err(RagError::Validation("max_words must be greater than zero".to_string()));
        }
        Ok(Self { max_words })
    }
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(['"', '\'', ')', ']', '”', '’'])
        .ends_with(['.', '!', '?'])
}

fn split_sentences(text: &str) -> Vec<Vec<&str>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();
    for word in text.split_whitespace() {
        current.push(word);
        if ends_sentence(word) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

impl Chunker for SentenceChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for sentence in split_sentences(text) {
            if current.len() + sentence.len() <= self.max_words {
                current.extend(sentence);
                continue;
            }
            if !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
            }
            if sentence.len() > self.max_words {
                chunks.extend(word_windows(&sentence, self.max_words, self.max_words));
            } else {
                current = sentence;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }
}

/// Separators tried in order by [`RecursiveChunker`].
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Sizes are measured in characters. Adjacent pieces are merged while they
/// fit in `chunk_size`; when a chunk is emitted, trailing pieces totalling
/// at most `chunk_overlap` characters are carried into the next one. A piece
/// that is still too large is split with the next separator, and finally by
/// raw character windows.
///
/// # Example
///
/// ```rust,ignore
/// use pgrag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document_text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with [`DEFAULT_SEPARATORS`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_window(chunk_size, chunk_overlap, "characters")?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator hierarchy, coarsest first.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators.into_iter().filter(|s| !s.is_empty()).collect();
        self
    }

    fn split(&self, text: &str, separators: &[String]) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }
        let Some((separator, rest)) = separators.split_first() else {
            return split_by_chars(text, self.chunk_size, self.chunk_overlap);
        };
        if !text.contains(separator.as_str()) {
            return self.split(text, rest);
        }

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut window_len = 0;

        for piece in split_keeping_separator(text, separator) {
            let piece_len = char_len(piece);
            if piece_len > self.chunk_size {
                if !window.is_empty() {
                    chunks.push(window.iter().copied().collect());
                    window.clear();
                    window_len = 0;
                }
                chunks.extend(self.split(piece, rest));
                continue;
            }

            if !window.is_empty() && window_len + piece_len > self.chunk_size {
                chunks.push(window.iter().copied().collect());
                while let Some(front) = window.front() {
                    let over_overlap = window_len > self.chunk_overlap;
                    let no_room = window_len + piece_len > self.chunk_size;
                    if !over_overlap && !no_room {
                        break;
                    }
                    window_len -= char_len(front);
                    window.pop_front();
                }
            }
            window.push_back(piece);
            window_len += piece_len;
        }

        if !window.is_empty() {
            chunks.push(window.iter().copied().collect());
        }
        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        self.split(text, &self.separators)
            .into_iter()
            .map(|chunk| chunk.trim().to_string())
            .filter(|chunk| !chunk.is_empty())
            .collect()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character windows with overlap, on `char` boundaries.
fn split_by_chars(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let stride = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }

    chunks
}
