//! gtf_novel_blocks
//!
//! Exon catalogs from GTF/GFF3 annotation, and novelty classification of
//! aligned contig blocks (0-based, half-open) against them: a block is
//! "novel" when it extends past a known exon boundary by at least the clip
//! tolerance.

pub mod annotation;
pub mod catalog;
pub mod classify;
pub mod model;
pub mod types;

pub use catalog::{ChrBuckets, ExonCatalog};

pub use annotation::{CatalogBuilder, CatalogKeys};

pub use classify::{is_novel_block, overhangs, ClassifyError, DEFAULT_MIN_CLIP};

pub use types::{Block, Strand};

pub use model::gene::{Gene, GeneId};
pub use model::segments::Segment;
