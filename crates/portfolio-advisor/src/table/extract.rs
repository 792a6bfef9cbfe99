//! Markdown table extraction
//!
//! Splits a model answer into the first contiguous block of pipe-delimited
//! lines and the prose around it.

use serde::Serialize;

use super::SEPARATOR;

/// Table text and surrounding prose of one model answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// Table lines joined with `\n`, `None` when no line carries a separator
    pub table: Option<String>,

    /// Text before and after the table, each trimmed, joined by a blank line
    pub prose: String,
}

/// Find the first table block in `text`.
///
/// The block starts at the first line containing `|` and runs until the
/// first blank line or the end of the input. Non-blank lines without a
/// separator inside the block (footnotes, notes between rows) are left out
/// of the table and kept with the prose. Without any separator line the
/// text is returned unchanged as prose.
pub fn extract_markdown_table(text: &str) -> Extraction {
    let mut block_start: Option<usize> = None;
    let mut block_end = 0;
    let mut lines = Vec::new();
    let mut notes = Vec::new();
    let mut offset = 0;

    for raw in text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);

        if line.contains(SEPARATOR) {
            block_start.get_or_insert(line_start);
            block_end = line_start + line.len();
            lines.push(line);
        } else if block_start.is_some() {
            if line.trim().is_empty() {
                break;
            }
            notes.push((line_start, line.trim()));
        }
    }

    let Some(start) = block_start else {
        return Extraction {
            table: None,
            prose: text.to_string(),
        };
    };

    // Notes after the last table line already belong to the trailing text.
    let inner = notes
        .iter()
        .filter(|(at, _)| *at < block_end)
        .map(|(_, note)| *note)
        .collect::<Vec<_>>()
        .join("\n");

    // The first separator line in the text opens the block, so the block is
    // also the first occurrence of its own text.
    let prose = [text[..start].trim(), inner.as_str(), text[block_end..].trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    tracing::debug!(lines = lines.len(), "Extracted markdown table");

    Extraction {
        table: Some(lines.join("\n")),
        prose,
    }
}
