//! Recursive character splitter.
//!
//! Splits on the coarsest separator present (paragraphs, then lines,
//! sentences, words, characters), then merges the pieces back into chunks
//! of at most `chunk_size` characters that overlap by up to `overlap`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TextSplitter {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (position, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map_or((separators.len(), ""), |(i, sep)| (i, *sep));
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        };

        let mut chunks = Vec::new();
        let mut fitting: Vec<String> = Vec::new();

        for piece in pieces {
            if char_len(&piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if finer.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_with(&piece, finer));
            }
        }
        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, separator));
        }

        chunks
    }

    /// Greedily pack pieces, carrying a tail of at most `overlap` characters
    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            let joined = |current: &VecDeque<&str>| if current.is_empty() { 0 } else { sep_len };

            if total + len + joined(&current) > self.chunk_size && !current.is_empty() {
                push_chunk(&mut chunks, &current, separator);

                while total > self.overlap
                    || (total > 0 && total + len + joined(&current) > self.chunk_size)
                {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front) + if current.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + joined(&current);
            current.push_back(piece);
        }
        push_chunk(&mut chunks, &current, separator);

        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, current: &VecDeque<&str>, separator: &str) {
    let text = current.iter().copied().collect::<Vec<_>>().join(separator);
    let text = text.trim();
    if !text.is_empty() {
        chunks.push(text.to_string());
    }
}
