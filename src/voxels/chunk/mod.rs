//! # Chunk Module
//!
//! This module provides the `Chunk` struct: one fixed 16x256x16 column-group of
//! blocks, the unit of on-disk storage and of off-thread face scanning.
//!
//! ## Storage
//!
//! Blocks are kept densely in one boxed slice of exactly [`BLOCKS_PER_CHUNK`]
//! values, addressed as described in [`chunk_index`]. Because Y is the
//! fastest-moving axis, a vertical run inside one column is a contiguous slice,
//! which is what [`Chunk::fill_column`] writes directly.
//!
//! A chunk may also carry the per-column [`SurfacePoint`] table that follows the
//! blocks in the canonical file layout.

use std::fmt;
use std::ops::RangeInclusive;

use cgmath::{Point2, Point3};
use noise::{NoiseFn, Perlin};

use super::block::block_side::BlockSide;
use super::block::block_type::BlockType;
use super::block::{Block, AIR};
use super::visibility;
use chunk_index::{block_index, column_base};
use chunk_iteration::ChunkBlockIterator;
use surface::{SurfacePoint, SURFACE_POINTS};

pub mod chunk_index;
pub mod chunk_iteration;
pub mod surface;

/// The width and depth of a chunk in blocks.
pub const CHUNK_WIDTH: usize = 16;
/// The height of a chunk in blocks.
pub const CHUNK_HEIGHT: usize = 256;
/// The total number of blocks in a chunk.
pub const BLOCKS_PER_CHUNK: usize = CHUNK_WIDTH * CHUNK_HEIGHT * CHUNK_WIDTH;

/// Height of the flattest terrain produced by [`Chunk::perlin`].
pub const PERLIN_BASE_HEIGHT: f64 = 64.0;
/// Maximum deviation from the base height produced by [`Chunk::perlin`].
pub const PERLIN_AMPLITUDE: f64 = 24.0;
/// Scaling factor applied to world coordinates when sampling Perlin noise.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Represents one 16x256x16 collection of voxel blocks.
///
/// Equality treats a missing surface table and an all-zero one as the same,
/// since the file format cannot tell them apart.
#[derive(Clone, Eq)]
pub struct Chunk {
    /// The position of this chunk in chunk-grid coordinates (1 unit = 16 blocks).
    pub(crate) position: Point2<i32>,

    /// The block data, always exactly `BLOCKS_PER_CHUNK` entries.
    pub(crate) blocks: Box<[Block]>,

    /// Per-column surface metadata, when the source format carried it.
    pub(crate) surface: Option<Box<[SurfacePoint]>>,
}

impl Chunk {
    /// Creates a completely empty chunk (all blocks are air) without surface data.
    pub fn empty(x: i32, z: i32) -> Self {
        Self::filled(x, z, AIR)
    }

    /// Creates a chunk where every block is `block`.
    pub fn filled(x: i32, z: i32, block: Block) -> Self {
        Chunk {
            position: Point2::new(x, z),
            blocks: vec![block; BLOCKS_PER_CHUNK].into_boxed_slice(),
            surface: None,
        }
    }

    /// Builds a chunk from decoded parts.
    ///
    /// # Returns
    /// `None` if `blocks` or `surface` do not have exactly the expected length.
    pub fn from_parts(
        position: Point2<i32>,
        blocks: Vec<Block>,
        surface: Option<Vec<SurfacePoint>>,
    ) -> Option<Self> {
        if blocks.len() != BLOCKS_PER_CHUNK {
            return None;
        }
        if let Some(points) = &surface {
            if points.len() != SURFACE_POINTS {
                return None;
            }
        }
        Some(Chunk {
            position,
            blocks: blocks.into_boxed_slice(),
            surface: surface.map(Vec::into_boxed_slice),
        })
    }

    /// Generates rolling terrain from 2D Perlin noise.
    ///
    /// Each column gets bedrock at Y 0, granite up to four blocks below the surface,
    /// dirt above that and a grass top. The surface table records every column's
    /// height.
    pub fn perlin(x: i32, z: i32, seed: u32) -> Self {
        let perlin = Perlin::new(seed);
        let mut chunk = Self::empty(x, z);
        let mut surface = vec![SurfacePoint::default(); SURFACE_POINTS];

        for lz in 0..CHUNK_WIDTH {
            for lx in 0..CHUNK_WIDTH {
                let gx = (x as i64 * CHUNK_WIDTH as i64 + lx as i64) as f64;
                let gz = (z as i64 * CHUNK_WIDTH as i64 + lz as i64) as f64;
                let sample = perlin.get([gx * PERLIN_SCALE_FACTOR, gz * PERLIN_SCALE_FACTOR]);
                let height = (PERLIN_BASE_HEIGHT + sample * PERLIN_AMPLITUDE)
                    .clamp(1.0, (CHUNK_HEIGHT - 1) as f64) as usize;

                chunk.fill_column(lx, lz, 0..=height, BlockType::GRANITE.block());
                chunk.fill_column(lx, lz, height.saturating_sub(3)..=height, BlockType::DIRT.block());
                chunk.set_block(block_index(lx, height, lz), BlockType::GRASS.block());
                chunk.set_block(block_index(lx, 0, lz), BlockType::BEDROCK.block());

                let point = &mut surface[SurfacePoint::index(lx, lz)];
                point.max_height = height as u8;
                point.set_climate(8, 8);
            }
        }

        chunk.surface = Some(surface.into_boxed_slice());
        chunk
    }

    /// Chunk-grid X coordinate.
    pub fn x(&self) -> i32 {
        self.position.x
    }

    /// Chunk-grid Z coordinate.
    pub fn z(&self) -> i32 {
        self.position.y
    }

    /// Chunk-grid position, with the grid Z stored in `y`.
    pub fn position(&self) -> Point2<i32> {
        self.position
    }

    /// World coordinate of this chunk's block at local `(0, 0, 0)`.
    pub fn origin(&self) -> Point3<i32> {
        Point3::new(
            self.position.x * CHUNK_WIDTH as i32,
            0,
            self.position.y * CHUNK_WIDTH as i32,
        )
    }

    /// The raw block array in index order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Mutable access to the raw block array. Its length cannot change.
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// The block array viewed as raw `u32` values, without copying.
    pub fn block_values(&self) -> &[u32] {
        bytemuck::cast_slice(&self.blocks)
    }

    /// Gets the block at a flat index.
    ///
    /// # Panics
    /// Panics if `index >= BLOCKS_PER_CHUNK`.
    pub fn block(&self, index: usize) -> Block {
        self.blocks[index]
    }

    /// Sets the block at a flat index.
    ///
    /// # Panics
    /// Panics if `index >= BLOCKS_PER_CHUNK`.
    pub fn set_block(&mut self, index: usize, block: Block) {
        self.blocks[index] = block;
    }

    /// Gets the block at local coordinates, or `None` if they are out of bounds.
    pub fn get_block_at(&self, x: usize, y: usize, z: usize) -> Option<Block> {
        if x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_WIDTH {
            Some(self.blocks[block_index(x, y, z)])
        } else {
            None
        }
    }

    /// Sets the block at local coordinates.
    ///
    /// # Returns
    /// `false` without writing anything if the coordinates are out of bounds.
    pub fn set_block_at(&mut self, x: usize, y: usize, z: usize, block: Block) -> bool {
        if x < CHUNK_WIDTH && y < CHUNK_HEIGHT && z < CHUNK_WIDTH {
            self.blocks[block_index(x, y, z)] = block;
            true
        } else {
            false
        }
    }

    /// Writes `block` into the vertical run `ys` of the column at local `(x, z)`.
    ///
    /// The run is a contiguous slice of the block array so this is a single slice
    /// fill. Heights past the top of the chunk are cut off.
    ///
    /// # Returns
    /// The number of blocks written.
    pub fn fill_column(&mut self, x: usize, z: usize, ys: RangeInclusive<usize>, block: Block) -> usize {
        if x >= CHUNK_WIDTH || z >= CHUNK_WIDTH || ys.is_empty() || *ys.start() >= CHUNK_HEIGHT {
            return 0;
        }
        let base = column_base(x, z);
        let top = (*ys.end()).min(CHUNK_HEIGHT - 1);
        let run = &mut self.blocks[base + ys.start()..=base + top];
        run.fill(block);
        run.len()
    }

    /// Overwrites every block of the chunk.
    pub fn fill(&mut self, block: Block) {
        self.blocks.fill(block);
    }

    /// The surface table, if present. Indexed by [`SurfacePoint::index`].
    pub fn surface(&self) -> Option<&[SurfacePoint]> {
        self.surface.as_deref()
    }

    /// The surface point of local column `(x, z)`.
    pub fn surface_point(&self, x: usize, z: usize) -> Option<SurfacePoint> {
        if x >= CHUNK_WIDTH || z >= CHUNK_WIDTH {
            return None;
        }
        self.surface
            .as_ref()
            .map(|points| points[SurfacePoint::index(x, z)])
    }

    /// Replaces the surface table.
    ///
    /// # Returns
    /// `false` and leaves the chunk untouched if `points` is not 256 entries long.
    pub fn set_surface(&mut self, points: Vec<SurfacePoint>) -> bool {
        if points.len() != SURFACE_POINTS {
            return false;
        }
        self.surface = Some(points.into_boxed_slice());
        true
    }

    /// Returns `true` if any block satisfies `predicate`.
    pub fn any<P: Fn(Block) -> bool>(&self, predicate: P) -> bool {
        visibility::any(&self.blocks, predicate)
    }

    /// Number of blocks that satisfy `predicate`.
    pub fn count<P: Fn(Block) -> bool>(&self, predicate: P) -> usize {
        visibility::count(&self.blocks, predicate)
    }

    /// Number of exposed faces of the blocks that satisfy `predicate`.
    pub fn count_faces<P: Fn(Block) -> bool>(&self, predicate: P) -> usize {
        visibility::count_faces(&self.blocks, predicate)
    }

    /// Face mask of every block, indexed like the block array.
    pub fn face_masks<P: Fn(Block) -> bool>(&self, predicate: P) -> Vec<u8> {
        visibility::compute_face_masks(&self.blocks, predicate)
    }

    /// Exposure of one face direction for every block, `1` or `0`.
    pub fn face_bitmap<P: Fn(Block) -> bool>(&self, predicate: P, side: BlockSide) -> Vec<u8> {
        visibility::face_bitmap(&self.blocks, predicate, side)
    }

    /// Iterates the blocks that satisfy `predicate` with their index and position.
    pub fn iter_blocks<P: Fn(Block) -> bool>(&self, predicate: P) -> ChunkBlockIterator<'_, P> {
        ChunkBlockIterator::new(&self.blocks, predicate)
    }
}

impl PartialEq for Chunk {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.blocks == other.blocks
            && surfaces_match(self.surface(), other.surface())
    }
}

fn surfaces_match(a: Option<&[SurfacePoint]>, b: Option<&[SurfacePoint]>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (Some(points), None) | (None, Some(points)) => {
            points.iter().all(|point| *point == SurfacePoint::default())
        }
        (None, None) => true,
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("x", &self.position.x)
            .field("z", &self.position.y)
            .field("non_air", &self.count(|block| !block.is_air()))
            .field("has_surface", &self.surface.is_some())
            .finish()
    }
}
