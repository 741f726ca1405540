use serde::{Deserialize, Serialize};

use crate::model::segments::{split_overlaps, ExonRecord, Segment};
use crate::types::{Block, Strand};

/// Internal numeric gene ID (index into the catalog's gene Vec).
pub type GeneId = usize;

/// Gene model: names/aliases, location, and its exon segments.
///
/// Notes:
/// - `names[0]` is treated as the primary name (if present).
/// - additional names are aliases (deduped).
/// - raw exon records accumulate via `add_exon`; `finalize()` turns them
///   into non-overlapping labelled segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub id: GeneId,
    pub names: Vec<String>,
    pub chr_id: usize,
    pub strand: Strand,
    segments: Vec<Segment>,
    #[serde(skip)]
    pending: Vec<(Block, String)>,
    finalized: bool,
}

impl Gene {
    pub fn new(id: GeneId, primary_name: impl Into<String>, chr_id: usize, strand: Strand) -> Self {
        Self {
            id,
            names: vec![primary_name.into()],
            chr_id,
            strand,
            segments: Vec::new(),
            pending: Vec::new(),
            finalized: false,
        }
    }

    /// Add an alias/alternative name (deduped).
    pub fn add_name(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    /// Primary name (if any).
    pub fn primary_name(&self) -> Option<&str> {
        self.names.first().map(|s| s.as_str())
    }

    pub fn add_exon(&mut self, block: Block, exon_number: impl Into<String>) {
        self.pending.push((block, exon_number.into()));
        self.finalized = false;
    }

    /// Number of raw exon records added so far (used for exon_number fallback).
    pub fn raw_exon_count(&self) -> usize {
        self.pending.len()
    }

    /// Split accumulated exon records into labelled segments and return the
    /// gene span (min start, max end). Returns (0, 0) for a gene with no exons.
    pub fn finalize(&mut self) -> (u32, u32) {
        let records: Vec<ExonRecord> = self
            .pending
            .drain(..)
            .map(|(block, exon_number)| ExonRecord { block, exon_number })
            .collect();

        self.segments = split_overlaps(&records);
        self.finalized = true;

        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => (first.block.start, last.block.end),
            _ => (0, 0),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn span(&self) -> Option<(u32, u32)> {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => Some((first.block.start, last.block.end)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deduped_and_primary_kept() {
        let mut g = Gene::new(0, "G1", 0, Strand::Plus);
        g.add_name("G1");
        g.add_name("GeneSymbol");
        g.add_name("GeneSymbol");
        assert_eq!(g.names, vec!["G1".to_string(), "GeneSymbol".to_string()]);
        assert_eq!(g.primary_name(), Some("G1"));
    }

    #[test]
    fn finalize_splits_and_reports_span() {
        let mut g = Gene::new(0, "G1", 0, Strand::Minus);
        g.add_exon(Block::new(300, 400), "2");
        g.add_exon(Block::new(100, 200), "1");
        g.add_exon(Block::new(150, 250), "1");

        let (start, end) = g.finalize();
        assert_eq!((start, end), (100, 400));
        assert_eq!(g.span(), Some((100, 400)));

        let blocks: Vec<Block> = g.segments().iter().map(|s| s.block).collect();
        assert_eq!(
            blocks,
            vec![
                Block::new(100, 150),
                Block::new(150, 200),
                Block::new(200, 250),
                Block::new(300, 400),
            ]
        );
    }

    #[test]
    fn gene_without_exons_has_no_span() {
        let mut g = Gene::new(0, "G1", 0, Strand::Unknown);
        assert_eq!(g.finalize(), (0, 0));
        assert_eq!(g.span(), None);
    }
}
