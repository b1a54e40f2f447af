//! Tests for the chunking strategies.

use pgrag::chunking::{Chunker, RecursiveChunker, SentenceChunker, WordWindowChunker, chunk_words};
use pgrag::error::RagError;
use proptest::prelude::*;

fn numbered_words(count: usize) -> String {
    (0..count).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn windows_share_exactly_the_overlap() {
    let chunks = chunk_words("a b c d e", 3, 1).unwrap();
    assert_eq!(chunks, vec!["a b c", "c d e"]);
}

#[test]
fn text_shorter_than_the_window_is_one_chunk() {
    let chunks = chunk_words("just a few words", 10, 2).unwrap();
    assert_eq!(chunks, vec!["just a few words"]);
}

#[test]
fn blank_text_yields_no_chunks() {
    assert!(chunk_words("", 10, 2).unwrap().is_empty());
    assert!(chunk_words(" \n\t ", 10, 2).unwrap().is_empty());
}

#[test]
fn overlap_must_be_smaller_than_window() {
    assert!(matches!(chunk_words("a b c", 3, 3), Err(RagError::Validation(_))));
    assert!(matches!(WordWindowChunker::new(0, 0), Err(RagError::Validation(_))));
    assert!(matches!(RecursiveChunker::new(100, 100), Err(RagError::Validation(_))));
    assert!(matches!(SentenceChunker::new(0), Err(RagError::Validation(_))));
}

#[test]
fn default_sized_windows_over_a_long_document() {
    let chunker = WordWindowChunker::new(1000, 100).unwrap();
    let chunks = chunker.chunk(&numbered_words(2500));

    let lengths: Vec<usize> = chunks.iter().map(|c| c.split_whitespace().count()).collect();
    assert_eq!(lengths, vec![1000, 1000, 700]);
    assert!(chunks[1].starts_with("w900 "));
    assert!(chunks[2].starts_with("w1800 "));
    assert!(chunks[2].ends_with(" w2499"));
}

#[test]
fn whitespace_is_normalized_to_single_spaces() {
    let chunks = chunk_words("alpha\n\nbeta\tgamma   delta", 2, 0).unwrap();
    assert_eq!(chunks, vec!["alpha beta", "gamma delta"]);
}

#[test]
fn sentence_chunker_keeps_sentences_whole() {
    let chunker = SentenceChunker::new(5).unwrap();
    let chunks = chunker.chunk("One two. Three four five. Six.");
    assert_eq!(chunks, vec!["One two. Three four five.", "Six."]);
}

#[test]
fn sentence_chunker_splits_oversized_sentences() {
    let chunker = SentenceChunker::new(3).unwrap();
    let chunks = chunker.chunk("a b c d e f g. Short one.");
    assert_eq!(chunks, vec!["a b c", "d e f", "g.", "Short one."]);
}

#[test]
fn recursive_chunker_respects_chunk_size() {
    let text = "Cybersecurity protects systems and networks.\n\n\
                A zero-day vulnerability is an undisclosed flaw.\n\
                Two-factor authentication requires two forms of verification. \
                The CIA triad is a foundational concept.";
    let chunker = RecursiveChunker::new(50, 10).unwrap();
    let chunks = chunker.chunk(text);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(!chunk.is_empty());
        assert!(chunk.chars().count() <= 50, "chunk too long: {chunk:?}");
    }
    let joined = chunks.join(" ");
    for word in text.split_whitespace() {
        assert!(joined.contains(word), "missing word {word:?}");
    }
}

#[test]
fn recursive_chunker_falls_back_to_characters() {
    let chunker = RecursiveChunker::new(4, 0).unwrap();
    let chunks = chunker.chunk("abcdefghij");
    assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
}

/// Word windows cover the input exactly and overlap by exactly `overlap` words.
mod prop_word_windows {
    use super::*;

    fn arb_window() -> impl Strategy<Value = (usize, usize)> {
        (1usize..20).prop_flat_map(|window| (Just(window), 0..window))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn windows_reassemble_to_the_input(
            words in proptest::collection::vec("[a-z]{1,6}", 0..200),
            (window, overlap) in arb_window(),
        ) {
            let text = words.join(" ");
            let chunks = chunk_words(&text, window, overlap).unwrap();

            prop_assert_eq!(chunks.is_empty(), words.is_empty());

            let split: Vec<Vec<&str>> =
                chunks.iter().map(|c| c.split_whitespace().collect()).collect();
            for chunk in &split {
                prop_assert!(!chunk.is_empty());
                prop_assert!(chunk.len() <= window);
            }
            for pair in split.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
            }

            let mut rebuilt: Vec<&str> = Vec::new();
            for (i, chunk) in split.iter().enumerate() {
                let skip = if i == 0 { 0 } else { overlap };
                rebuilt.extend(&chunk[skip..]);
            }
            let expected: Vec<&str> = words.iter().map(String::as_str).collect();
            prop_assert_eq!(rebuilt, expected);
        }
    }
}
