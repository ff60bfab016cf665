//! The authoritative identifier list: which items should exist locally.
//!
//! Plain text, one id per line. Lines starting with `//` are comments.
//! Malformed and duplicate lines are warned and skipped, never fatal.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{io_err, ConfigError};
use crate::types::ItemId;

const COMMENT_MARKER: &str = "//";

/// Why a line of the identifier list was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkippedLine {
    Invalid { line: usize, text: String },
    Duplicate { line: usize, id: ItemId },
}

/// Parsed identifier list, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdListParse {
    pub ids: Vec<ItemId>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse identifier list text. Line numbers in [`SkippedLine`] are 1-based.
pub fn parse_id_list(text: &str) -> IdListParse {
    let mut seen = HashSet::new();
    let mut parsed = IdListParse::default();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }
        match line.parse::<ItemId>() {
            Ok(id) if seen.insert(id) => parsed.ids.push(id),
            Ok(id) => parsed.skipped.push(SkippedLine::Duplicate {
                line: index + 1,
                id,
            }),
            Err(_) => parsed.skipped.push(SkippedLine::Invalid {
                line: index + 1,
                text: line.to_string(),
            }),
        }
    }
    parsed
}

/// Read and parse the list at `path`, logging a warning per skipped line.
pub fn load_id_list(path: &Path) -> Result<Vec<ItemId>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let parsed = parse_id_list(&text);

    for skipped in &parsed.skipped {
        match skipped {
            SkippedLine::Invalid { line, text } => {
                tracing::warn!(line, entry = %text, "invalid workshop entry, skipping");
            }
            SkippedLine::Duplicate { line, id } => {
                tracing::warn!(line, %id, "duplicate workshop entry, skipping");
            }
        }
    }
    tracing::info!("found {} workshop entries in {}", parsed.ids.len(), path.display());
    Ok(parsed.ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[u64]) -> Vec<ItemId> {
        raw.iter().map(|r| ItemId::new(*r).unwrap()).collect()
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let parsed = parse_id_list("// maps\n10\n\n   \n// more\n20\n");
        assert_eq!(parsed.ids, ids(&[10, 20]));
        assert!(parsed.skipped.is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped_with_line_numbers() {
        let parsed = parse_id_list("10\nabc\n0\n-3\n30\n");
        assert_eq!(parsed.ids, ids(&[10, 30]));
        assert_eq!(
            parsed.skipped,
            vec![
                SkippedLine::Invalid { line: 2, text: "abc".into() },
                SkippedLine::Invalid { line: 3, text: "0".into() },
                SkippedLine::Invalid { line: 4, text: "-3".into() },
            ]
        );
    }

    #[test]
    fn duplicates_keep_first_position() {
        let parsed = parse_id_list("5\n7\n5\n");
        assert_eq!(parsed.ids, ids(&[5, 7]));
        assert_eq!(
            parsed.skipped,
            vec![SkippedLine::Duplicate { line: 3, id: ItemId::new(5).unwrap() }]
        );
    }

    #[test]
    fn windows_line_endings_parse() {
        let parsed = parse_id_list("1\r\n2\r\n");
        assert_eq!(parsed.ids, ids(&[1, 2]));
    }
}
