//! Deterministic test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pgrag::{Embedder, Generator, Message, Metadata, RagError, Result};
use serde_json::json;

/// Five short texts tagged `document_id` 1 to 5.
pub const DEMO_DOCUMENTS: [(i64, &str); 5] = [
    (
        1,
        "Cybersecurity is the practice of protecting systems and networks from attacks. \
         It includes measures like firewalls, intrusion detection, and encryption.",
    ),
    (
        2,
        "A zero-day vulnerability is an undisclosed flaw in software that attackers can \
         exploit before the vendor issues a fix.",
    ),
    (
        3,
        "Two-factor authentication (2FA) enhances security by requiring users to provide \
         two forms of verification before gaining access.",
    ),
    (
        4,
        "Machine learning models require large datasets and are often fine-tuned to \
         improve accuracy for specific tasks.",
    ),
    (
        5,
        "The CIA triad, Confidentiality, Integrity, and Availability, is a foundational \
         concept in cybersecurity.",
    ),
];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "by", "can", "for", "from", "in", "is", "it", "like", "of", "often",
    "that", "the", "to", "what", "which", "who",
];

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

pub fn document_metadata(document_id: i64) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("document_id".to_string(), json!(document_id));
    metadata
}

/// Bag-of-words embedder: one dimension per distinct content word of a corpus.
///
/// Texts sharing no vocabulary word are orthogonal, so rankings are exact
/// and predictable. Words outside the vocabulary are ignored.
pub struct VocabularyEmbedder {
    vocabulary: HashMap<String, usize>,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    fail_on_call: Option<usize>,
}

impl VocabularyEmbedder {
    pub fn new<'a>(corpus: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vocabulary = HashMap::new();
        for text in corpus {
            for token in tokens(text) {
                let next = vocabulary.len();
                vocabulary.entry(token).or_insert(next);
            }
        }
        Self {
            vocabulary,
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
            fail_on_call: None,
        }
    }

    pub fn demo() -> Self {
        Self::new(DEMO_DOCUMENTS.iter().map(|(_, text)| *text))
    }

    /// Fail the `call`-th (1-based) `embed_batch` call with an embedding error.
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for token in tokens(text) {
            if let Some(&index) = self.vocabulary.get(&token) {
                vector[index] += 1.0;
            }
        }
        vector
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for VocabularyEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(RagError::Embedding {
                provider: "vocabulary".to_string(),
                message: format!("injected failure on call {call}"),
            });
        }
        self.batch_sizes.lock().unwrap().push(texts.len());
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn name(&self) -> &str {
        "vocabulary"
    }
}

/// Records every prompt and answers with a fixed string.
pub struct RecordingGenerator {
    answer: String,
    delay: Option<Duration>,
    prompts: Mutex<Vec<Vec<Message>>>,
}

impl RecordingGenerator {
    pub fn new(answer: impl Into<String>) -> Self {
        Self { answer: answer.into(), delay: None, prompts: Mutex::new(Vec::new()) }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, messages: &[Message]) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.prompts.lock().unwrap().push(messages.to_vec());
        Ok(self.answer.clone())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// A generator whose backend is always down.
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _messages: &[Message]) -> Result<String> {
        Err(RagError::Generation {
            provider: "failing".to_string(),
            message: "backend unavailable".to_string(),
        })
    }
}
