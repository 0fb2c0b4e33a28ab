//! Reading and writing item files: a JSON array, or JSON Lines for `.jsonl` paths.

use crate::error::{OtrError, Result};
use crate::eval::RelevanceItem;
use std::path::Path;

fn is_jsonl(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jsonl"))
        .unwrap_or(false)
}

/// Parse items from JSON Lines text. Blank lines are skipped.
pub fn parse_jsonl(content: &str) -> Result<Vec<RelevanceItem>> {
    let mut items = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(line)
            .map_err(|e| OtrError::InvalidInput(format!("line {}: {}", idx + 1, e)))?;
        items.push(item);
    }
    Ok(items)
}

/// Read items from `path`.
pub fn read_items(path: &Path) -> Result<Vec<RelevanceItem>> {
    let content = std::fs::read_to_string(path)?;
    if is_jsonl(path) {
        parse_jsonl(&content)
    } else {
        serde_json::from_str(&content).map_err(|e| {
            OtrError::InvalidInput(format!("{}: {}", path.display(), e))
        })
    }
}

/// Write items to `path`, in the format implied by its extension.
pub fn write_items(path: &Path, items: &[RelevanceItem]) -> Result<()> {
    let mut out = String::new();
    if is_jsonl(path) {
        for item in items {
            out.push_str(&serde_json::to_string(item)?);
            out.push('\n');
        }
    } else {
        out = serde_json::to_string_pretty(items)?;
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}
