//! # Chunk Iteration Module
//!
//! Iteration over the blocks of a chunk that satisfy a predicate, in flat index
//! order (Y fastest, then X, then Z).

use cgmath::Point3;

use crate::voxels::block::Block;

use super::chunk_index::local_position;

/// An iterator over the blocks of a chunk that satisfy a predicate.
///
/// Yields the flat index, the local position and the block value. Positions are
/// recovered from the index with shifts, so no coordinate state is carried between
/// steps.
pub struct ChunkBlockIterator<'a, P> {
    /// The block array being iterated over
    blocks: &'a [Block],
    /// Next flat index to examine
    current_index: usize,
    /// Selects which blocks are yielded
    predicate: P,
}

impl<'a, P> ChunkBlockIterator<'a, P>
where
    P: Fn(Block) -> bool,
{
    /// Creates an iterator positioned before the first block.
    pub fn new(blocks: &'a [Block], predicate: P) -> Self {
        ChunkBlockIterator {
            blocks,
            current_index: 0,
            predicate,
        }
    }
}

impl<'a, P> Iterator for ChunkBlockIterator<'a, P>
where
    P: Fn(Block) -> bool,
{
    type Item = (usize, Point3<usize>, Block);

    fn next(&mut self) -> Option<Self::Item> {
        while self.current_index < self.blocks.len() {
            let index = self.current_index;
            let block = self.blocks[index];
            self.current_index += 1;

            if (self.predicate)(block) {
                return Some((index, local_position(index), block));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.blocks.len() - self.current_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::block::AIR;
    use crate::voxels::chunk::{chunk_index::block_index, BLOCKS_PER_CHUNK};

    #[test]
    fn yields_matching_blocks_in_index_order() {
        let mut blocks = vec![AIR; BLOCKS_PER_CHUNK];
        blocks[block_index(3, 10, 2)] = Block::new(8);
        blocks[block_index(1, 200, 0)] = Block::new(8);
        blocks[block_index(0, 0, 15)] = Block::new(9);

        let found: Vec<_> = ChunkBlockIterator::new(&blocks, |b: Block| b.matches(8)).collect();
        assert_eq!(
            found,
            vec![
                (block_index(1, 200, 0), Point3::new(1, 200, 0), Block::new(8)),
                (block_index(3, 10, 2), Point3::new(3, 10, 2), Block::new(8)),
            ]
        );
    }

    #[test]
    fn empty_selection_yields_nothing() {
        let blocks = vec![AIR; BLOCKS_PER_CHUNK];
        assert_eq!(ChunkBlockIterator::new(&blocks, |b: Block| !b.is_air()).count(), 0);
    }
}
