/// Append-only CSV sink shared by all batch workers.
///
/// One header row is written when the file is created; everything after is
/// per-batch row appends in whatever order workers finish. Output row order
/// is not the input order; `id` is the join key for downstream loaders.
/// The pipeline wraps the sink in a mutex held for a whole batch append, so
/// two batches never interleave rows.
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::dataset::Row;
use crate::embedder::Embedding;

/// Fixed column order of the output file.
pub const CSV_COLUMNS: [&str; 7] = [
    "id", "pageid", "revid", "title", "section", "text", "embedding",
];

/// A corpus row combined with its embedding outcome, written exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub row: Row,
    pub embedding: Embedding,
}

/// Writer over the single output file.
pub struct CsvSink {
    writer: csv::Writer<File>,
    rows_written: usize,
}

impl CsvSink {
    /// Create the output file and write the header row.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create output file: {}", path.display()))?;

        writer
            .write_record(CSV_COLUMNS)
            .context("failed to write header row")?;
        writer.flush().context("failed to flush header row")?;

        info!("Output sink ready: {}", path.display());
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Append all rows of one batch as a contiguous group, then flush.
    ///
    /// Callers must hold the sink exclusively for the whole call.
    pub fn append_batch(&mut self, rows: &[OutputRow]) -> Result<()> {
        for out in rows {
            self.writer
                .write_record([
                    out.row.id.to_string(),
                    out.row.pageid.to_string(),
                    out.row.revid.to_string(),
                    out.row.title.clone(),
                    out.row.section.clone(),
                    out.row.text.clone(),
                    encode_embedding(&out.embedding)?,
                ])
                .with_context(|| format!("failed to write row id={}", out.row.id))?;
        }
        self.writer.flush().context("failed to flush batch")?;
        self.rows_written += rows.len();
        Ok(())
    }

    /// Total rows appended so far, header excluded.
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

/// Encode the embedding cell: a JSON float array, or the empty string as
/// the missing-embedding marker downstream loaders check for.
fn encode_embedding(embedding: &Embedding) -> Result<String> {
    match embedding {
        Embedding::Vector(v) => serde_json::to_string(v).context("failed to encode embedding"),
        Embedding::Missing(_) => Ok(String::new()),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_output_rows(ids: std::ops::Range<i64>, embedding: Embedding) -> Vec<OutputRow> {
        ids.map(|id| OutputRow {
            row: Row {
                id,
                pageid: 1000 + id,
                revid: 5000 + id,
                title: format!("記事{id}"),
                section: "概要".to_string(),
                text: format!("本文, カンマ入り {id}"),
            },
            embedding: embedding.clone(),
        })
        .collect()
    }

    fn read_records(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
        let mut reader = csv::Reader::from_path(path).unwrap();
        let header = reader.headers().unwrap().clone();
        let records = reader.records().map(|r| r.unwrap()).collect();
        (header, records)
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let sink = CsvSink::create(&path).unwrap();
        drop(sink);

        let (header, records) = read_records(&path);
        assert_eq!(header, csv::StringRecord::from(CSV_COLUMNS.to_vec()));
        assert!(records.is_empty(), "fresh sink holds only the header");
    }

    #[test]
    fn test_append_batches_contiguously() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.append_batch(&make_output_rows(0..3, Embedding::Vector(vec![0.5; 4])))
            .unwrap();
        sink.append_batch(&make_output_rows(3..5, Embedding::Vector(vec![0.25; 4])))
            .unwrap();
        assert_eq!(sink.rows_written(), 5);
        drop(sink);

        let (_, records) = read_records(&path);
        let ids: Vec<&str> = records.iter().map(|r| &r[0]).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn test_embedding_cell_roundtrips_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.append_batch(&make_output_rows(0..1, Embedding::Vector(vec![0.125, -1.5])))
            .unwrap();
        drop(sink);

        let (_, records) = read_records(&path);
        let parsed: Vec<f32> = serde_json::from_str(&records[0][6]).unwrap();
        assert_eq!(parsed, vec![0.125, -1.5]);
    }

    #[test]
    fn test_missing_embedding_is_empty_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.append_batch(&make_output_rows(0..2, Embedding::Missing("outage".into())))
            .unwrap();
        drop(sink);

        let (_, records) = read_records(&path);
        assert_eq!(records.len(), 2, "metadata survives a failed embedding");
        for record in &records {
            assert_eq!(&record[6], "", "missing marker is the empty cell");
            assert!(!record[3].is_empty(), "title metadata preserved");
        }
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        assert!(CsvSink::create("/no/such/dir/out.csv").is_err());
    }

    #[test]
    fn test_commas_and_multibyte_text_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvSink::create(&path).unwrap();
        sink.append_batch(&make_output_rows(7..8, Embedding::Vector(vec![1.0])))
            .unwrap();
        drop(sink);

        let (_, records) = read_records(&path);
        assert_eq!(&records[0][5], "本文, カンマ入り 7");
        assert_eq!(&records[0][3], "記事7");
    }
}
