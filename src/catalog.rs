use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::classify::{is_novel_block, ClassifyError};
use crate::model::gene::{Gene, GeneId};
use crate::types::Block;

const MAGIC: &[u8; 4] = b"NBC1";
const VERSION_STR: &str = env!("CARGO_PKG_VERSION");

/// Per-chromosome bucket index: bin -> gene ids.
///
/// This is a pre-filter only: it returns candidate gene IDs whose span
/// overlaps bins. Used to attribute candidate blocks to genes without
/// scanning the whole gene list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChrBuckets {
    pub bin_width: u32,
    pub bins: Vec<Vec<GeneId>>,
    pub max_end: u32,
}

impl ChrBuckets {
    pub fn new(bin_width: u32) -> Self {
        Self {
            bin_width,
            bins: Vec::new(),
            max_end: 0,
        }
    }

    fn ensure_len_for_end(&mut self, end0: u32) {
        self.max_end = self.max_end.max(end0);

        let need_bins =
            ((self.max_end as u64 + self.bin_width as u64 - 1) / self.bin_width as u64) as usize;
        if self.bins.len() < need_bins {
            self.bins.resize_with(need_bins, Vec::new);
        }
    }

    fn add_span(&mut self, gene_id: GeneId, start0: u32, end0: u32) {
        if end0 <= start0 {
            return;
        }

        self.ensure_len_for_end(end0);

        let b0 = (start0 / self.bin_width) as usize;
        let b1 = ((end0.saturating_sub(1)) / self.bin_width) as usize;

        for b in b0..=b1 {
            self.bins[b].push(gene_id);
        }
    }

    fn finalize(&mut self) {
        for bin in &mut self.bins {
            bin.sort_unstable();
            bin.dedup();
        }
    }
}

/// The owning catalog type:
/// - chromosome dictionary (chr name -> chr_id, first-seen order)
/// - genes with their labelled exon segments
/// - per-chromosome flat reference interval sets (sorted, deduped)
/// - per-chromosome buckets for fast gene lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExonCatalog {
    pub bin_width: u32,

    pub chr_names: Vec<String>,
    chr_to_id: HashMap<String, usize>,

    pub genes: Vec<Gene>,

    /// Reference interval set per chromosome: every exon segment of every
    /// gene on that chromosome, sorted by (start, end), deduplicated.
    chr_ref: Vec<Vec<Block>>,

    pub chr_buckets: Vec<ChrBuckets>,
}

impl ExonCatalog {
    pub fn new(bin_width: u32) -> Self {
        Self {
            bin_width,
            chr_names: Vec::new(),
            chr_to_id: HashMap::new(),
            genes: Vec::new(),
            chr_ref: Vec::new(),
            chr_buckets: Vec::new(),
        }
    }

    pub fn chr_id(&self, name: &str) -> Option<usize> {
        self.chr_to_id.get(name).copied()
    }

    /// Reference exon segments of one chromosome (sorted, non-redundant).
    pub fn reference(&self, chr_id: usize) -> &[Block] {
        self.chr_ref.get(chr_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Classify a candidate block against all exon segments of a chromosome.
    ///
    /// The per-chromosome reference set is gene-agnostic, like the
    /// chromosome-level exon table the classifier was designed around.
    /// A chromosome absent from the annotation yields `EmptyReference`.
    pub fn classify(&self, chr_id: usize, block: Block, min_clip: u32) -> Result<bool, ClassifyError> {
        is_novel_block(block, self.reference(chr_id), min_clip)
    }

    /// Classify a candidate block against a single gene's exon segments.
    pub fn classify_in_gene(
        &self,
        gene_id: GeneId,
        block: Block,
        min_clip: u32,
    ) -> Result<bool, ClassifyError> {
        let segments: Vec<Block> = self
            .genes
            .get(gene_id)
            .map(|g| g.segments().iter().map(|s| s.block).collect())
            .unwrap_or_default();
        is_novel_block(block, &segments, min_clip)
    }

    /// Genes whose span overlaps the given block, via the bucket prefilter.
    ///
    /// Returns gene IDs in ascending order.
    pub fn genes_overlapping(&self, chr_id: usize, block: Block) -> Vec<GeneId> {
        let Some(cb) = self.chr_buckets.get(chr_id) else {
            return Vec::new();
        };
        if cb.bins.is_empty() || block.end <= block.start {
            return Vec::new();
        }

        let b0 = (block.start / cb.bin_width) as usize;
        let b1 = ((block.end.saturating_sub(1)) / cb.bin_width) as usize;

        if b0 >= cb.bins.len() {
            return Vec::new();
        }
        let b1 = b1.min(cb.bins.len() - 1);

        let mut out: Vec<GeneId> = Vec::new();
        for b in b0..=b1 {
            out.extend_from_slice(&cb.bins[b]);
        }
        out.sort_unstable();
        out.dedup();

        // Bins over-approximate; keep only genes whose span truly overlaps.
        out.retain(|&gid| match self.genes[gid].span() {
            Some((s, e)) => block.overlaps(Block { start: s, end: e }),
            None => false,
        });
        out
    }

    /// Write the exon coordinate table as 6-column BED:
    /// chrom, start, end, "gene exon_numbers", score, strand.
    ///
    /// Coordinates are already 0-based half-open. Genes appear in insertion
    /// order, segments in coordinate order.
    pub fn to_bed<W: Write>(&self, mut out: W) -> Result<()> {
        for gene in &self.genes {
            let chrom = &self.chr_names[gene.chr_id];
            let name = gene.primary_name().unwrap_or("?");
            for seg in gene.segments() {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{} {}\t.\t{}",
                    chrom,
                    seg.block.start,
                    seg.block.end,
                    name,
                    seg.label(),
                    gene.strand
                )?;
            }
        }
        Ok(())
    }

    // -----------------------
    // Build-time helpers (used by CatalogBuilder)
    // -----------------------

    pub(crate) fn intern_chr(&mut self, chr: &str) -> usize {
        if let Some(&id) = self.chr_to_id.get(chr) {
            return id;
        }
        let id = self.chr_names.len();
        self.chr_names.push(chr.to_string());
        self.chr_to_id.insert(chr.to_string(), id);
        self.chr_ref.push(Vec::new());
        self.chr_buckets.push(ChrBuckets::new(self.bin_width));
        id
    }

    pub(crate) fn push_gene(&mut self, gene: Gene) -> GeneId {
        let gid = self.genes.len();
        debug_assert_eq!(gene.id, gid);
        self.genes.push(gene);
        gid
    }

    /// Finalize all genes, then derive per-chromosome reference sets and
    /// bucket indexes from their segments.
    pub(crate) fn finalize(&mut self) {
        for gene in &mut self.genes {
            gene.finalize();
        }

        for gene in &self.genes {
            let Some((s, e)) = gene.span() else { continue };
            self.chr_buckets[gene.chr_id].add_span(gene.id, s, e);
            let refs = &mut self.chr_ref[gene.chr_id];
            refs.extend(gene.segments().iter().map(|seg| seg.block));
        }

        for refs in &mut self.chr_ref {
            refs.sort_unstable();
            refs.dedup();
        }
        for cb in &mut self.chr_buckets {
            cb.finalize();
        }
    }

    // -----------------------
    // Persistence
    // -----------------------

    /// Serialize this catalog with a small header (magic + crate version)
    /// and a bincode payload.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut f = File::create(path)?;

        f.write_all(MAGIC)?;

        let v = VERSION_STR.as_bytes();
        let len = v.len() as u16;
        f.write_all(&len.to_le_bytes())?;
        f.write_all(v)?;

        let payload = bincode::serialize(self)?;
        f.write_all(&payload)?;

        Ok(())
    }

    /// Load a catalog written by `save()`. Rejects wrong file types and
    /// version mismatches.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut f = File::open(path)?;

        let mut magic = [0u8; 4];
        f.read_exact(&mut magic)?;
        if &magic != MAGIC {
            bail!("Not an ExonCatalog file (bad magic)");
        }

        let mut len_buf = [0u8; 2];
        f.read_exact(&mut len_buf)?;
        let len = u16::from_le_bytes(len_buf) as usize;

        let mut ver_buf = vec![0u8; len];
        f.read_exact(&mut ver_buf)?;
        let file_version = std::str::from_utf8(&ver_buf)?;

        if file_version != VERSION_STR {
            bail!(
                "Catalog version mismatch: file={}, binary={}",
                file_version,
                VERSION_STR
            );
        }

        let mut payload = Vec::new();
        f.read_to_end(&mut payload)?;
        let catalog: Self = bincode::deserialize(&payload)?;

        Ok(catalog)
    }
}

/// Human-readable summary: global gene/chromosome counts plus per-chromosome
/// segment and bin statistics. Computed on the fly; intended for logging and
/// diagnostics, not machine-readable output.
impl fmt::Display for ExonCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n_segments: usize = self.chr_ref.iter().map(|v| v.len()).sum();

        writeln!(
            f,
            "ExonCatalog: {} genes, {} exon segments, {} chromosomes, bin_width={} bp",
            self.genes.len(),
            n_segments,
            self.chr_names.len(),
            self.bin_width
        )?;

        for (i, chr_name) in self.chr_names.iter().enumerate() {
            let refs = self.reference(i);
            let Some(cb) = self.chr_buckets.get(i) else {
                writeln!(f, "  - {}: <missing ChrBuckets>", chr_name)?;
                continue;
            };

            let nbins = cb.bins.len();
            let total_gene_hits: u64 = cb.bins.iter().map(|b| b.len() as u64).sum();
            let mean_genes_per_bin = if nbins == 0 {
                0.0
            } else {
                total_gene_hits as f64 / nbins as f64
            };

            writeln!(
                f,
                "  - {}: segments={}, bins={}, mean_genes/bin={:.3}",
                chr_name,
                refs.len(),
                nbins,
                mean_genes_per_bin
            )?;
        }

        Ok(())
    }
}
