//! Novelty classification of aligned blocks against a reference exon set.
//!
//! A candidate block is "novel" when it overlaps annotated exon sequence and
//! extends past an exon boundary by at least the clip tolerance, i.e. the
//! alignment carries clipped sequence large enough to represent unannotated
//! transcribed sequence. Blocks that sit entirely inside an intron (or outside
//! the annotated span) are bounded by flanking exons and are not called novel.

use thiserror::Error;

use crate::types::Block;

/// Default clip tolerance in bp, matching the annotation pipeline's MIN_CLIP.
pub const DEFAULT_MIN_CLIP: u32 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("invalid candidate block: start {start} >= end {end}")]
    InvalidBlock { start: u32, end: u32 },

    #[error("reference interval set is empty; no containment decision is meaningful")]
    EmptyReference,
}

/// Overhang of `candidate` beyond the boundaries of `reference`, as
/// (left, right) in bp. Zero means the candidate does not extend past
/// that boundary.
#[inline]
pub fn overhangs(candidate: Block, reference: Block) -> (u32, u32) {
    let left = reference.start.saturating_sub(candidate.start);
    let right = candidate.end.saturating_sub(reference.end);
    (left, right)
}

/// Whether `reference` explains `candidate` under the clip tolerance.
///
/// A single reference segment explains a candidate that overhangs it on at
/// most one side, by less than `min_clip` bp. A candidate poking out on both
/// sides spans the whole segment plus flanking sequence and is never
/// explained by it, whatever the overhang sizes.
fn explains(reference: Block, candidate: Block, min_clip: u32) -> bool {
    match overhangs(candidate, reference) {
        (0, 0) => true,
        (left, 0) => left < min_clip,
        (0, right) => right < min_clip,
        _ => false,
    }
}

/// Classify a candidate block against a set of reference exon segments.
///
/// Returns `true` (novel) when the candidate overlaps at least one reference
/// segment and none of the overlapping segments explains it. Overhang equal
/// to `min_clip` already counts as novel. Candidates overlapping no segment
/// at all fall into an intron/gap bounded by annotated exons and are `false`.
///
/// The reference set is read-only; segments may be given in any order.
pub fn is_novel_block(
    candidate: Block,
    reference: &[Block],
    min_clip: u32,
) -> Result<bool, ClassifyError> {
    if candidate.start >= candidate.end {
        return Err(ClassifyError::InvalidBlock {
            start: candidate.start,
            end: candidate.end,
        });
    }
    if reference.is_empty() {
        return Err(ClassifyError::EmptyReference);
    }

    let mut overlapped = false;
    for &r in reference {
        if !candidate.overlaps(r) {
            continue;
        }
        overlapped = true;
        if explains(r, candidate, min_clip) {
            return Ok(false);
        }
    }

    Ok(overlapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_CLIP: u32 = 30;

    fn chr_ref() -> Vec<Block> {
        vec![Block::new(100, 200), Block::new(300, 400), Block::new(410, 450)]
    }

    #[test]
    fn worked_examples() {
        let cases: &[((u32, u32), bool)] = &[
            ((150, 160), false), // fully inside first exon
            ((90, 130), false),  // left overhang 10, tolerated
            ((70, 130), true),   // left overhang 30 hits the tolerance
            ((190, 220), false), // right overhang 20, tolerated
            ((190, 230), true),  // right overhang 30 hits the tolerance
            ((90, 210), true),   // pokes out both sides of one exon
            ((170, 320), true),  // spans the gap between two exons
            ((350, 420), false), // covered intron gap, explained by (300,400)
        ];

        let reference = chr_ref();
        for &((start, end), expected) in cases {
            let got = is_novel_block(Block::new(start, end), &reference, MIN_CLIP).unwrap();
            assert_eq!(got, expected, "candidate ({start},{end})");
        }
    }

    #[test]
    fn contained_blocks_are_never_novel() {
        let reference = chr_ref();
        for &r in &reference {
            for (start, end) in [(r.start, r.end), (r.start + 1, r.end - 1)] {
                let got = is_novel_block(Block::new(start, end), &reference, 0).unwrap();
                assert!(!got, "({start},{end}) contained in {r}");
            }
        }
    }

    #[test]
    fn one_sided_overhang_below_tolerance_is_known() {
        let reference = chr_ref();
        for over in 1..MIN_CLIP {
            let c = Block::new(100 - over, 150);
            assert!(!is_novel_block(c, &reference, MIN_CLIP).unwrap());
            let c = Block::new(150, 200 + over);
            assert!(!is_novel_block(c, &reference, MIN_CLIP).unwrap());
        }
    }

    #[test]
    fn overhang_at_or_above_tolerance_is_novel() {
        let reference = chr_ref();
        for over in [MIN_CLIP, MIN_CLIP + 1, MIN_CLIP + 50] {
            let c = Block::new(100 - over, 150);
            assert!(is_novel_block(c, &reference, MIN_CLIP).unwrap());
        }
    }

    #[test]
    fn intronic_and_intergenic_blocks_are_not_novel() {
        let reference = chr_ref();
        // Entirely between exons, no overlap.
        assert!(!is_novel_block(Block::new(210, 290), &reference, MIN_CLIP).unwrap());
        assert!(!is_novel_block(Block::new(401, 409), &reference, MIN_CLIP).unwrap());
        // Entirely outside the annotated span.
        assert!(!is_novel_block(Block::new(500, 600), &reference, MIN_CLIP).unwrap());
        assert!(!is_novel_block(Block::new(10, 90), &reference, MIN_CLIP).unwrap());
    }

    #[test]
    fn raising_min_clip_only_flips_novel_to_known() {
        let reference = chr_ref();
        let candidates = [
            (150, 160),
            (90, 130),
            (70, 130),
            (190, 230),
            (90, 210),
            (170, 320),
            (350, 420),
            (60, 150),
        ];
        for (start, end) in candidates {
            let c = Block::new(start, end);
            let mut prev = is_novel_block(c, &reference, 0).unwrap();
            for clip in 1..=120 {
                let cur = is_novel_block(c, &reference, clip).unwrap();
                assert!(
                    prev || !cur,
                    "({start},{end}) flipped known -> novel at min_clip={clip}"
                );
                prev = cur;
            }
        }
    }

    #[test]
    fn repeated_calls_agree() {
        let reference = chr_ref();
        let c = Block::new(70, 130);
        let first = is_novel_block(c, &reference, MIN_CLIP).unwrap();
        for _ in 0..10 {
            assert_eq!(is_novel_block(c, &reference, MIN_CLIP).unwrap(), first);
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let reference = chr_ref();
        assert_eq!(
            is_novel_block(Block { start: 200, end: 100 }, &reference, MIN_CLIP),
            Err(ClassifyError::InvalidBlock { start: 200, end: 100 })
        );
        assert_eq!(
            is_novel_block(Block::new(100, 200), &[], MIN_CLIP),
            Err(ClassifyError::EmptyReference)
        );
    }

    #[test]
    fn overhangs_are_per_boundary() {
        let r = Block::new(100, 200);
        assert_eq!(overhangs(Block::new(70, 130), r), (30, 0));
        assert_eq!(overhangs(Block::new(190, 230), r), (0, 30));
        assert_eq!(overhangs(Block::new(90, 210), r), (10, 10));
        assert_eq!(overhangs(Block::new(150, 160), r), (0, 0));
    }
}
