//! Splitting a gene's exon records into non-overlapping labelled segments.
//!
//! Gene models list one exon record per transcript, so overlapping isoform
//! exons are the norm. The catalog wants a flat, non-overlapping view: exons
//! are cut at every boundary point, and each resulting segment carries the
//! exon numbers of all records covering it.

use serde::{Deserialize, Serialize};

use crate::types::Block;

/// One raw exon line of a gene, before overlap splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExonRecord {
    pub block: Block,
    /// Value of the exon_number attribute (kept as text; GTF writers differ).
    pub exon_number: String,
}

/// A non-overlapping piece of exonic sequence, labelled with every exon
/// number whose record covers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub block: Block,
    pub exon_numbers: Vec<String>,
}

impl Segment {
    /// Comma-joined exon number label, as written into the BED name column.
    pub fn label(&self) -> String {
        self.exon_numbers.join(",")
    }
}

/// Cut exon records at all boundary points and label each piece.
///
/// Pieces covered by no record (gaps between exons) are dropped. Within each
/// piece, exon numbers appear in record order (sorted by coordinate) and are
/// deduplicated. Output segments are sorted and non-overlapping.
pub fn split_overlaps(records: &[ExonRecord]) -> Vec<Segment> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut records: Vec<&ExonRecord> = records.iter().collect();
    records.sort_by_key(|r| (r.block.start, r.block.end));

    let mut cuts: Vec<u32> = records
        .iter()
        .flat_map(|r| [r.block.start, r.block.end])
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut out: Vec<Segment> = Vec::new();
    for w in cuts.windows(2) {
        let piece = Block::new(w[0], w[1]);

        let mut labels: Vec<String> = Vec::new();
        for r in &records {
            if !r.block.contains(piece) {
                continue;
            }
            if !labels.iter().any(|l| l == &r.exon_number) {
                labels.push(r.exon_number.clone());
            }
        }

        if !labels.is_empty() {
            out.push(Segment {
                block: piece,
                exon_numbers: labels,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(start: u32, end: u32, n: &str) -> ExonRecord {
        ExonRecord {
            block: Block::new(start, end),
            exon_number: n.to_string(),
        }
    }

    #[test]
    fn disjoint_exons_pass_through() {
        let segs = split_overlaps(&[rec(100, 200, "1"), rec(300, 400, "2")]);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].block, Block::new(100, 200));
        assert_eq!(segs[0].label(), "1");
        assert_eq!(segs[1].block, Block::new(300, 400));
        assert_eq!(segs[1].label(), "2");
    }

    #[test]
    fn partial_overlap_is_cut_three_ways() {
        let segs = split_overlaps(&[rec(100, 200, "1"), rec(150, 250, "2")]);
        assert_eq!(
            segs,
            vec![
                Segment { block: Block::new(100, 150), exon_numbers: vec!["1".into()] },
                Segment { block: Block::new(150, 200), exon_numbers: vec!["1".into(), "2".into()] },
                Segment { block: Block::new(200, 250), exon_numbers: vec!["2".into()] },
            ]
        );
        assert_eq!(segs[1].label(), "1,2");
    }

    #[test]
    fn nested_exon_splits_the_outer_one() {
        let segs = split_overlaps(&[rec(100, 300, "1"), rec(150, 200, "2")]);
        let blocks: Vec<Block> = segs.iter().map(|s| s.block).collect();
        assert_eq!(
            blocks,
            vec![Block::new(100, 150), Block::new(150, 200), Block::new(200, 300)]
        );
        assert_eq!(segs[1].label(), "1,2");
        assert_eq!(segs[2].label(), "1");
    }

    #[test]
    fn duplicate_records_are_deduplicated() {
        let segs = split_overlaps(&[rec(100, 200, "1"), rec(100, 200, "1")]);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].label(), "1");
    }

    #[test]
    fn identical_span_different_numbers_merge_labels() {
        let segs = split_overlaps(&[rec(100, 200, "2"), rec(100, 200, "5")]);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].label(), "2,5");
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(split_overlaps(&[]).is_empty());
    }
}
