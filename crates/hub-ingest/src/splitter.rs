//! Semantic text splitting: paragraphs, then sentences, then words, each
//! level greedily packed into passages no larger than a target size
//! (spec.md §4.4).
//!
//! The source boundary regex `(?<=[terminal punctuation])\s+` relies on
//! variable-length lookbehind, which the `regex` crate does not support.
//! [`split_sentences`] re-expresses the same rule — split immediately after
//! terminal punctuation that is followed by whitespace — as a character
//! walk instead.

use std::sync::OnceLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Default passage target size in characters. Configurable per deployment.
pub const DEFAULT_TARGET_SIZE: usize = 2000;

const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', ';', '。', '!', '?', '；', '…'];

fn paragraph_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\n+").unwrap())
}

/// Split `text` into passages no larger than `target_size` characters,
/// falling through paragraph → sentence → word packing as each level
/// overflows the target.
pub fn split(text: &str, target_size: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = paragraph_boundary()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut passages = Vec::new();
    let mut current = String::new();
    for paragraph in paragraphs {
        if paragraph.len() > target_size {
            flush(&mut current, &mut passages);
            passages.extend(split_oversized_paragraph(paragraph, target_size));
            continue;
        }
        pack(&mut current, &mut passages, paragraph, "\n\n", target_size);
    }
    flush(&mut current, &mut passages);
    passages
}

fn split_oversized_paragraph(paragraph: &str, target_size: usize) -> Vec<String> {
    let sentences = split_sentences(paragraph);
    let mut passages = Vec::new();
    let mut current = String::new();
    for sentence in sentences {
        if sentence.len() > target_size {
            flush(&mut current, &mut passages);
            passages.extend(split_oversized_sentence(&sentence, target_size));
            continue;
        }
        pack(&mut current, &mut passages, &sentence, " ", target_size);
    }
    flush(&mut current, &mut passages);
    passages
}

/// Word-level fallback: tokens (including whitespace tokens, per
/// `split_word_bounds`) are packed back-to-back with no inserted
/// separators, since the tokenizer already preserved them.
fn split_oversized_sentence(sentence: &str, target_size: usize) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current = String::new();
    for token in sentence.split_word_bounds() {
        if !current.is_empty() && current.len() + token.len() > target_size {
            passages.push(std::mem::take(&mut current));
        }
        current.push_str(token);
    }
    flush(&mut current, &mut passages);
    passages
}

fn pack(current: &mut String, passages: &mut Vec<String>, unit: &str, joiner: &str, target_size: usize) {
    if current.is_empty() {
        current.push_str(unit);
    } else if current.len() + joiner.len() + unit.len() <= target_size {
        current.push_str(joiner);
        current.push_str(unit);
    } else {
        passages.push(std::mem::take(current));
        current.push_str(unit);
    }
}

fn flush(current: &mut String, passages: &mut Vec<String>) {
    if !current.is_empty() {
        passages.push(std::mem::take(current));
    }
}

/// Re-expression of `(?<=[terminal punctuation])\s+`: a boundary falls
/// right after a terminal-punctuation character when it is followed by
/// whitespace, and the whitespace run itself is dropped (as `\s+` would be
/// when used as a split pattern).
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (byte_idx, ch) = chars[i];
        let is_boundary = TERMINAL_PUNCTUATION.contains(&ch)
            && chars.get(i + 1).is_some_and(|(_, next)| next.is_whitespace());

        if is_boundary {
            let boundary = byte_idx + ch.len_utf8();
            sentences.push(text[start..boundary].to_string());
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            start = chars.get(j).map(|(idx, _)| *idx).unwrap_or(text.len());
            i = j;
            continue;
        }
        i += 1;
    }
    if start < text.len() {
        sentences.push(text[start..].to_string());
    }
    sentences.into_iter().filter(|s| !s.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_passage() {
        let passages = split("Alpha beta.\n\nGamma delta.", DEFAULT_TARGET_SIZE);
        assert_eq!(passages, vec!["Alpha beta.\n\nGamma delta.".to_string()]);
    }

    #[test]
    fn paragraphs_flush_once_target_exceeded() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let passages = split(&text, 100);
        assert_eq!(passages.len(), 2);
    }

    #[test]
    fn oversized_paragraph_falls_through_to_sentences() {
        let sentence_a = "a".repeat(40);
        let sentence_b = "b".repeat(40);
        let paragraph = format!("{sentence_a}. {sentence_b}.");
        let passages = split(&paragraph, 50);
        assert_eq!(passages.len(), 2);
        assert!(passages.iter().all(|p| p.len() <= 42));
    }

    #[test]
    fn sentence_splitter_drops_the_whitespace_run() {
        let sentences = split_sentences("Hello world. How are you?  Fine!");
        assert_eq!(sentences, vec!["Hello world.", "How are you?", "Fine!"]);
    }

    #[test]
    fn sentence_splitter_handles_cjk_terminal_punctuation() {
        let sentences = split_sentences("你好。 再见！");
        assert_eq!(sentences, vec!["你好。", "再见！"]);
    }

    #[test]
    fn oversized_sentence_falls_through_to_word_packing() {
        let sentence = "supercalifragilisticexpialidocious ".repeat(5);
        let passages = split_oversized_sentence(sentence.trim(), 20);
        assert!(passages.len() > 1);
        assert!(passages.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn splitter_round_trip_preserves_content_modulo_boundary_whitespace() {
        let text = "First paragraph line one.\n\nSecond paragraph here.";
        let passages = split(text, DEFAULT_TARGET_SIZE);
        let rejoined = passages.join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rejoined), normalize(text));
    }
}
