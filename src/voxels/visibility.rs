//! # Face Visibility Module
//!
//! Determines which faces of which blocks in a chunk are exposed, so only those
//! faces need geometry.
//!
//! Every query takes a predicate that selects the blocks being drawn (usually
//! "type id equals T"). A face of a matching block is exposed when the block on
//! the other side of it does not match, or when it lies outside the chunk.
//! There is no lookup into neighbouring chunks, so faces on a chunk seam are
//! always reported as exposed.
//!
//! All functions operate on a raw block slice of exactly
//! [`BLOCKS_PER_CHUNK`](crate::voxels::chunk::BLOCKS_PER_CHUNK) entries, which is
//! what a worker holds after `init`. None of them allocate per block;
//! [`compute_face_masks`] and [`face_bitmap`] allocate exactly their output buffer.

use super::block::block_side::BlockSide;
use super::block::Block;
use super::chunk::chunk_index::neighbor_index;
use super::chunk::BLOCKS_PER_CHUNK;

/// Returns `true` if any block satisfies `predicate`. Stops at the first match.
pub fn any<P>(blocks: &[Block], predicate: P) -> bool
where
    P: Fn(Block) -> bool,
{
    blocks.iter().any(|block| predicate(*block))
}

/// Number of blocks that satisfy `predicate`.
pub fn count<P>(blocks: &[Block], predicate: P) -> usize
where
    P: Fn(Block) -> bool,
{
    blocks.iter().filter(|block| predicate(**block)).count()
}

/// Exposed faces of the block at `index`, assuming the block itself matches.
#[inline]
fn exposed_faces<P>(blocks: &[Block], index: usize, predicate: &P) -> u8
where
    P: Fn(Block) -> bool,
{
    let mut mask = 0;
    for side in BlockSide::all() {
        let exposed = match neighbor_index(index, side) {
            Some(neighbor) => !predicate(blocks[neighbor]),
            None => true,
        };
        if exposed {
            mask |= side.bit();
        }
    }
    mask
}

/// Face mask of a single block: zero if the block does not match `predicate`.
pub fn face_mask_at<P>(blocks: &[Block], index: usize, predicate: P) -> u8
where
    P: Fn(Block) -> bool,
{
    debug_assert_eq!(blocks.len(), BLOCKS_PER_CHUNK);
    if predicate(blocks[index]) {
        exposed_faces(blocks, index, &predicate)
    } else {
        0
    }
}

/// Counts every exposed face of every block that satisfies `predicate`.
///
/// This is exactly the number of faces a renderer has to draw for the selection.
pub fn count_faces<P>(blocks: &[Block], predicate: P) -> usize
where
    P: Fn(Block) -> bool,
{
    debug_assert_eq!(blocks.len(), BLOCKS_PER_CHUNK);
    let mut faces = 0;
    for (index, block) in blocks.iter().enumerate() {
        if predicate(*block) {
            faces += exposed_faces(blocks, index, &predicate).count_ones() as usize;
        }
    }
    faces
}

/// Computes the face mask of every block.
///
/// The result is indexed like the block array. Bit `n` of an entry is set when face
/// `BlockSide::from_index(n)` is exposed; non-matching blocks get `0`.
pub fn compute_face_masks<P>(blocks: &[Block], predicate: P) -> Vec<u8>
where
    P: Fn(Block) -> bool,
{
    debug_assert_eq!(blocks.len(), BLOCKS_PER_CHUNK);
    let mut masks = vec![0u8; blocks.len()];
    for (index, block) in blocks.iter().enumerate() {
        if predicate(*block) {
            masks[index] = exposed_faces(blocks, index, &predicate);
        }
    }
    masks
}

/// Like [`compute_face_masks`] for a single direction: each entry is `1` if that
/// face of the block is exposed and `0` otherwise.
pub fn face_bitmap<P>(blocks: &[Block], predicate: P, side: BlockSide) -> Vec<u8>
where
    P: Fn(Block) -> bool,
{
    debug_assert_eq!(blocks.len(), BLOCKS_PER_CHUNK);
    let mut bitmap = vec![0u8; blocks.len()];
    for (index, block) in blocks.iter().enumerate() {
        if !predicate(*block) {
            continue;
        }
        let exposed = match neighbor_index(index, side) {
            Some(neighbor) => !predicate(blocks[neighbor]),
            None => true,
        };
        bitmap[index] = exposed as u8;
    }
    bitmap
}

/// Predicate matching blocks of one type id.
pub fn is_type(type_id: u32) -> impl Fn(Block) -> bool + Copy {
    move |block: Block| block.matches(type_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::block::AIR;
    use crate::voxels::chunk::chunk_index::block_index;

    fn empty_blocks() -> Vec<Block> {
        vec![AIR; BLOCKS_PER_CHUNK]
    }

    #[test]
    fn isolated_block_has_six_faces() {
        let mut blocks = empty_blocks();
        blocks[block_index(7, 64, 7)] = Block::new(2);
        assert_eq!(count_faces(&blocks, is_type(2)), 6);
        assert_eq!(face_mask_at(&blocks, block_index(7, 64, 7), is_type(2)), 0b11_1111);
    }

    #[test]
    fn adjacent_pair_shares_one_face() {
        let mut blocks = empty_blocks();
        blocks[block_index(7, 64, 7)] = Block::new(2);
        blocks[block_index(8, 64, 7)] = Block::new(2);
        assert_eq!(count_faces(&blocks, is_type(2)), 10);

        let left = face_mask_at(&blocks, block_index(7, 64, 7), is_type(2));
        let right = face_mask_at(&blocks, block_index(8, 64, 7), is_type(2));
        assert_eq!(left & BlockSide::RIGHT.bit(), 0);
        assert_eq!(right & BlockSide::LEFT.bit(), 0);
    }

    #[test]
    fn different_types_do_not_hide_each_other() {
        let mut blocks = empty_blocks();
        blocks[block_index(7, 64, 7)] = Block::new(2);
        blocks[block_index(8, 64, 7)] = Block::new(3);
        assert_eq!(count_faces(&blocks, is_type(2)), 6);
        assert_eq!(count_faces(&blocks, is_type(3)), 6);
        assert_eq!(count_faces(&blocks, |b: Block| !b.is_air()), 10);
    }

    #[test]
    fn chunk_edges_count_as_exposed() {
        let mut blocks = empty_blocks();
        blocks[block_index(0, 0, 0)] = Block::new(1);
        assert_eq!(count_faces(&blocks, is_type(1)), 6);

        let full = vec![Block::new(1); BLOCKS_PER_CHUNK];
        // Only the outer shell of the 16x256x16 box is exposed.
        let shell = 2 * (16 * 16) + 4 * (16 * 256);
        assert_eq!(count_faces(&full, is_type(1)), shell);
    }

    #[test]
    fn air_is_never_counted_for_other_types() {
        let blocks = empty_blocks();
        assert!(!any(&blocks, is_type(2)));
        assert_eq!(count_faces(&blocks, is_type(2)), 0);
        assert!(compute_face_masks(&blocks, is_type(2)).iter().all(|m| *m == 0));
    }

    #[test]
    fn masks_agree_with_count() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        let blocks: Vec<Block> = (0..BLOCKS_PER_CHUNK)
            .map(|_| Block::new(rng.u32(0..4)))
            .collect();
        for type_id in 0..4 {
            let masks = compute_face_masks(&blocks, is_type(type_id));
            assert_eq!(masks.len(), BLOCKS_PER_CHUNK);
            let total: usize = masks.iter().map(|m| m.count_ones() as usize).sum();
            assert_eq!(total, count_faces(&blocks, is_type(type_id)));
            for (index, block) in blocks.iter().enumerate() {
                if !block.matches(type_id) {
                    assert_eq!(masks[index], 0);
                }
            }
        }
    }

    #[test]
    fn single_direction_bitmap_matches_mask_bit() {
        let mut rng = fastrand::Rng::with_seed(42);
        let blocks: Vec<Block> = (0..BLOCKS_PER_CHUNK)
            .map(|_| Block::new(rng.u32(0..3)))
            .collect();
        let masks = compute_face_masks(&blocks, is_type(1));
        for side in BlockSide::all() {
            let bitmap = face_bitmap(&blocks, is_type(1), side);
            for index in 0..BLOCKS_PER_CHUNK {
                assert_eq!(bitmap[index] == 1, masks[index] & side.bit() != 0);
            }
        }
    }

    #[test]
    fn count_and_any() {
        let mut blocks = empty_blocks();
        blocks[10] = Block::new(5);
        blocks[65535] = Block::new(5);
        assert!(any(&blocks, is_type(5)));
        assert!(!any(&blocks, is_type(6)));
        assert_eq!(count(&blocks, is_type(5)), 2);
        assert_eq!(count(&blocks, is_type(0)), BLOCKS_PER_CHUNK - 2);
    }
}
