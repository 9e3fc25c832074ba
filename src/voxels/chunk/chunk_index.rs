//! # Chunk Index Module
//!
//! Addressing for blocks inside a chunk. A chunk's blocks live in one flat array
//! where the index of local position `(x, y, z)` is `y + (x << 8) + (z << 12)`.
//! Y is the fastest-moving axis, so every vertical column is a contiguous run of
//! 256 blocks.

use cgmath::Point3;

use super::{CHUNK_HEIGHT, CHUNK_WIDTH};
use crate::voxels::block::block_side::BlockSide;

/// Flat index of the block at local coordinates `(x, y, z)`.
///
/// The coordinates must already be within chunk bounds.
#[inline]
pub const fn block_index(x: usize, y: usize, z: usize) -> usize {
    y + (x << 8) + (z << 12)
}

/// Local coordinates of the block at a flat index.
#[inline]
pub const fn local_coords(index: usize) -> (usize, usize, usize) {
    ((index >> 8) & 15, index & 255, (index >> 12) & 15)
}

/// Local position of the block at a flat index.
#[inline]
pub fn local_position(index: usize) -> Point3<usize> {
    let (x, y, z) = local_coords(index);
    Point3::new(x, y, z)
}

/// Returns `true` if the signed local coordinates address a block of this chunk.
#[inline]
pub fn in_chunk_bounds(x: i32, y: i32, z: i32) -> bool {
    (0..CHUNK_WIDTH as i32).contains(&x)
        && (0..CHUNK_HEIGHT as i32).contains(&y)
        && (0..CHUNK_WIDTH as i32).contains(&z)
}

/// Index of the block touching `side` of the block at `index`, or `None` when that
/// neighbour lies outside the chunk.
#[inline]
pub fn neighbor_index(index: usize, side: BlockSide) -> Option<usize> {
    let (x, y, z) = local_coords(index);
    let offset = side.vector();
    let nx = x as i32 + offset.x;
    let ny = y as i32 + offset.y;
    let nz = z as i32 + offset.z;
    if in_chunk_bounds(nx, ny, nz) {
        Some(block_index(nx as usize, ny as usize, nz as usize))
    } else {
        None
    }
}

/// Index of the first (lowest) block of the column at local `(x, z)`.
#[inline]
pub const fn column_base(x: usize, z: usize) -> usize {
    block_index(x, 0, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::chunk::BLOCKS_PER_CHUNK;

    #[test]
    fn index_is_bijective() {
        let mut seen = vec![false; BLOCKS_PER_CHUNK];
        for x in 0..CHUNK_WIDTH {
            for y in 0..CHUNK_HEIGHT {
                for z in 0..CHUNK_WIDTH {
                    let index = block_index(x, y, z);
                    assert!(index < BLOCKS_PER_CHUNK);
                    assert!(!seen[index]);
                    seen[index] = true;
                    assert_eq!(local_coords(index), (x, y, z));
                }
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn bounds_reject_each_axis() {
        assert!(in_chunk_bounds(0, 0, 0));
        assert!(in_chunk_bounds(15, 255, 15));
        assert!(!in_chunk_bounds(-1, 0, 0));
        assert!(!in_chunk_bounds(16, 0, 0));
        assert!(!in_chunk_bounds(0, -1, 0));
        assert!(!in_chunk_bounds(0, 256, 0));
        assert!(!in_chunk_bounds(0, 0, -1));
        assert!(!in_chunk_bounds(0, 0, 16));
    }

    #[test]
    fn neighbors_follow_side_vectors() {
        let index = block_index(4, 100, 7);
        assert_eq!(neighbor_index(index, BlockSide::FRONT), Some(block_index(4, 100, 8)));
        assert_eq!(neighbor_index(index, BlockSide::TOP), Some(block_index(4, 101, 7)));
        assert_eq!(neighbor_index(index, BlockSide::RIGHT), Some(block_index(5, 100, 7)));
        assert_eq!(neighbor_index(index, BlockSide::BACK), Some(block_index(4, 100, 6)));
        assert_eq!(neighbor_index(index, BlockSide::BOTTOM), Some(block_index(4, 99, 7)));
        assert_eq!(neighbor_index(index, BlockSide::LEFT), Some(block_index(3, 100, 7)));
    }

    #[test]
    fn neighbors_stop_at_chunk_edges() {
        let corner = block_index(0, 0, 0);
        assert_eq!(neighbor_index(corner, BlockSide::LEFT), None);
        assert_eq!(neighbor_index(corner, BlockSide::BOTTOM), None);
        assert_eq!(neighbor_index(corner, BlockSide::BACK), None);

        let far = block_index(15, 255, 15);
        assert_eq!(neighbor_index(far, BlockSide::RIGHT), None);
        assert_eq!(neighbor_index(far, BlockSide::TOP), None);
        assert_eq!(neighbor_index(far, BlockSide::FRONT), None);
    }
}
