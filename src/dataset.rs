/// Corpus reader for Japanese Wikipedia passage snapshots.
///
/// The corpus is materialized as a JSONL file, one passage object per line,
/// exported from the upstream dataset service. The snapshot is assumed
/// finite and stable for the duration of one run; a malformed line is an
/// error, not a skip.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One corpus passage. Identity is `id`, unique and stable across runs
/// for a fixed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: i64,
    pub pageid: i64,
    pub revid: i64,
    pub title: String,
    pub section: String,
    pub text: String,
}

/// Load the full corpus in line order.
pub fn load_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Row>> {
    load_rows_range(path, 0, None)
}

/// Load a contiguous index range of the corpus: skip `offset` rows, then
/// take at most `limit` rows. Both bounds clamp to the corpus size.
pub fn load_rows_range<P: AsRef<Path>>(
    path: P,
    offset: usize,
    limit: Option<usize>,
) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open corpus: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    let mut seen = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read corpus line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        seen += 1;
        if seen <= offset {
            continue;
        }
        if let Some(limit) = limit {
            if rows.len() >= limit {
                break;
            }
        }

        let row: Row = serde_json::from_str(&line)
            .with_context(|| format!("malformed corpus row at line {}", line_no + 1))?;
        rows.push(row);
    }

    info!(
        "Loaded {} rows from {} (offset {offset})",
        rows.len(),
        path.display()
    );
    Ok(rows)
}

// ── Tests ────────────────────────────────────────────────────────────
