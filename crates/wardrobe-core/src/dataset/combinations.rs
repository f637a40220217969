//! Parsing the scored-combination file.
//!
//! One pair per line: `top:<id>,bottom:<id>,<score>` where score is the
//! user's verdict on the combination: 1 (good), -1 (bad), 0 (neutral).

use std::path::Path;

use crate::error::DatasetError;

/// A user-scored top/bottom pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredPair {
    pub top_id: String,
    pub bottom_id: String,
    pub score: i8,
}

/// Load scored pairs from a combination file. Blank lines are skipped;
/// anything else that doesn't match the format is an error naming the line.
pub fn load_scored_pairs(path: &Path) -> Result<Vec<ScoredPair>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|e| DatasetError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_scored_pairs(&content)
}

/// Parse the combination file contents.
pub fn parse_scored_pairs(content: &str) -> Result<Vec<ScoredPair>, DatasetError> {
    let mut pairs = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields: Vec<&str> = trimmed.split(',').collect();
        if fields.len() != 3 {
            return Err(DatasetError::MalformedPair {
                line,
                message: format!("expected 3 comma-separated fields, got {}", fields.len()),
            });
        }

        let top_id = strip_tag(fields[0], "top", line)?;
        let bottom_id = strip_tag(fields[1], "bottom", line)?;

        let score: i8 = fields[2]
            .trim()
            .parse()
            .map_err(|_| DatasetError::MalformedPair {
                line,
                message: format!("score {:?} is not an integer", fields[2].trim()),
            })?;
        if !(-1..=1).contains(&score) {
            return Err(DatasetError::MalformedPair {
                line,
                message: format!("score {score} is outside -1..=1"),
            });
        }

        pairs.push(ScoredPair {
            top_id,
            bottom_id,
            score,
        });
    }

    Ok(pairs)
}

/// Split a `tag:id` field, requiring the expected tag.
fn strip_tag(field: &str, tag: &str, line: usize) -> Result<String, DatasetError> {
    let field = field.trim();
    match field.split_once(':') {
        Some((prefix, id)) if prefix == tag && !id.is_empty() => Ok(id.to_string()),
        _ => Err(DatasetError::MalformedPair {
            line,
            message: format!("expected \"{tag}:<id>\", got {field:?}"),
        }),
    }
}
