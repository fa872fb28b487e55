/// Fixed-size batch partitioning.
///
/// A batch is the atomic unit of work downstream: one embedding call and
/// one sink append. Partitioning is a pure step with no failure modes;
/// a zero batch size is a configuration error rejected before this runs.
use crate::dataset::Row;

/// An ordered, contiguous slice of the corpus, at most `batch_size` rows.
/// Created here, consumed exactly once by one pipeline worker.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Position of this batch in the source sequence.
    pub index: usize,
    pub rows: Vec<Row>,
}

/// Split `rows` into ⌈N/B⌉ non-overlapping contiguous batches covering all
/// rows in order; only the final batch may be smaller than `batch_size`.
pub fn partition(rows: Vec<Row>, batch_size: usize) -> Vec<Batch> {
    assert!(batch_size > 0, "batch_size must be positive");

    let mut batches = Vec::with_capacity(rows.len().div_ceil(batch_size));
    let mut current = Vec::with_capacity(batch_size);

    for row in rows {
        current.push(row);
        if current.len() == batch_size {
            batches.push(Batch {
                index: batches.len(),
                rows: std::mem::replace(&mut current, Vec::with_capacity(batch_size)),
            });
        }
    }
    if !current.is_empty() {
        batches.push(Batch {
            index: batches.len(),
            rows: current,
        });
    }

    batches
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rows(n: usize) -> Vec<Row> {
        (0..n as i64)
            .map(|id| Row {
                id,
                pageid: 1000 + id,
                revid: 5000 + id,
                title: format!("記事{id}"),
                section: "概要".to_string(),
                text: format!("本文{id}"),
            })
            .collect()
    }

    #[test]
    fn test_partition_200_by_96() {
        let batches = partition(make_rows(200), 96);
        let sizes: Vec<usize> = batches.iter().map(|b| b.rows.len()).collect();
        assert_eq!(sizes, vec![96, 96, 8]);
    }

    #[test]
    fn test_partition_covers_all_rows_in_order() {
        let batches = partition(make_rows(200), 96);

        let ids: Vec<i64> = batches
            .iter()
            .flat_map(|b| b.rows.iter().map(|r| r.id))
            .collect();
        let expected: Vec<i64> = (0..200).collect();
        assert_eq!(ids, expected, "concatenation must reconstruct row order");
    }

    #[test]
    fn test_partition_indices_are_sequential() {
        let batches = partition(make_rows(50), 7);
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.index, i);
        }
    }

    #[test]
    fn test_partition_exact_multiple() {
        let batches = partition(make_rows(192), 96);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.rows.len() == 96));
    }

    #[test]
    fn test_partition_fewer_rows_than_batch() {
        let batches = partition(make_rows(8), 96);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].rows.len(), 8);
    }

    #[test]
    fn test_partition_empty() {
        let batches = partition(Vec::new(), 96);
        assert!(batches.is_empty());
    }

    #[test]
    #[should_panic(expected = "batch_size must be positive")]
    fn test_partition_zero_batch_size_panics() {
        partition(make_rows(1), 0);
    }
}
