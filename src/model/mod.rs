pub mod gene;
pub mod segments;

pub use gene::{Gene, GeneId};
pub use segments::{split_overlaps, ExonRecord, Segment};
