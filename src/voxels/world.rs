//! # World Module
//!
//! This module provides the `World` struct which owns every loaded chunk and maps
//! global block coordinates onto them.
//!
//! ## Coordinates
//!
//! A global column `(gx, gz)` belongs to the chunk at grid coordinate
//! `(gx.div_euclid(16), gz.div_euclid(16))` and sits at local
//! `(gx.rem_euclid(16), gz.rem_euclid(16))` inside it. Negative coordinates wrap
//! into `0..16` the same way, so `gx = -1` is local `15` of chunk `-1`.
//!
//! ## Ordering
//!
//! Chunks are kept in file order, which is also the save order. Nothing stops two
//! chunks from sharing a grid coordinate; lookups return the first one.

use std::collections::HashMap;

use cgmath::{Point2, Point3};
use log::{debug, info, warn};

use super::block::Block;
use super::chunk::{Chunk, CHUNK_HEIGHT, CHUNK_WIDTH};
use super::codec::{self, DirectoryEntry, FileLayout};
use super::error::{FormatError, LookupError};

/// A voxel world: an ordered list of chunks plus the file layout they came from.
///
/// # Examples
///
/// ```
/// use editsc_core::voxels::{block::Block, chunk::Chunk, world::World};
///
/// let mut world = World::new();
/// world.push_chunk(Chunk::empty(0, 0));
/// world.set_block_at(3, 10, 4, Block::new(2)).unwrap();
/// assert_eq!(world.get_block_at(3, 10, 4), Ok(Block::new(2)));
/// ```
///
/// Two worlds are equal when they hold equal chunks in the same order and save
/// in the same layout. The loaded directory is not compared.
#[derive(Debug, Clone)]
pub struct World {
    chunks: Vec<Chunk>,
    /// Grid position to the index of the first chunk with that position.
    lookup: HashMap<Point2<i32>, usize>,
    /// The directory table as loaded, kept so saves reproduce it exactly.
    directory: Option<Vec<DirectoryEntry>>,
    layout: FileLayout,
}

/// Splits a global column coordinate into the owning chunk's grid coordinate and
/// the local coordinate inside it.
pub fn global_to_local(gx: i32, gz: i32) -> (Point2<i32>, usize, usize) {
    let width = CHUNK_WIDTH as i32;
    let lx = gx.rem_euclid(width);
    let lz = gz.rem_euclid(width);
    (
        Point2::new(gx.div_euclid(width), gz.div_euclid(width)),
        lx as usize,
        lz as usize,
    )
}

fn check_height(gy: i32) -> Result<usize, LookupError> {
    if (0..CHUNK_HEIGHT as i32).contains(&gy) {
        Ok(gy as usize)
    } else {
        Err(LookupError::HeightOutOfRange { y: gy })
    }
}

impl World {
    /// Creates an empty world that saves in the canonical layout.
    pub fn new() -> Self {
        Self::with_layout(FileLayout::CANONICAL)
    }

    /// Creates an empty world that saves in `layout`.
    pub fn with_layout(layout: FileLayout) -> Self {
        World {
            chunks: Vec::new(),
            lookup: HashMap::new(),
            directory: None,
            layout,
        }
    }

    /// Decodes a whole world file.
    ///
    /// The length is validated first, then every record is decoded in order. Any
    /// error aborts the load.
    pub fn load(bytes: &[u8], layout: FileLayout) -> Result<World, FormatError> {
        let directory_size = layout.directory_size();
        let record_size = layout.record_size();
        let chunk_count = codec::validate_total_length(bytes.len(), directory_size, record_size)?;

        let directory = if layout.has_directory {
            Some(codec::decode_directory(bytes)?)
        } else {
            None
        };

        let mut world = World::with_layout(layout);
        world.chunks.reserve(chunk_count);
        let mut offset = directory_size;
        for record in 0..chunk_count {
            let chunk = codec::decode_chunk(&bytes[offset..offset + record_size], layout).map_err(
                |error| match error {
                    FormatError::BadMagic { found, .. } => FormatError::BadMagic { record, found },
                    other => other,
                },
            )?;
            world.push_chunk(chunk);
            offset += record_size;
        }
        world.directory = directory;

        let mismatches = world.directory_mismatches();
        if !mismatches.is_empty() {
            warn!(
                "{} directory entries disagree with the chunk order; the directory will be rebuilt on save",
                mismatches.len()
            );
            world.directory = None;
        }

        info!("Loaded world with {} chunks ({:?})", world.chunks.len(), layout);
        Ok(world)
    }

    /// Decodes a world file, detecting its layout from its length and first header.
    pub fn load_detected(bytes: &[u8]) -> Result<World, FormatError> {
        match FileLayout::detect(bytes) {
            Some(layout) => World::load(bytes, layout),
            None => World::load(bytes, FileLayout::CANONICAL),
        }
    }

    /// Encodes the whole world in its layout. `World::load(&world.encode(), layout)`
    /// reproduces the world.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.layout.file_size(self.chunks.len()));
        if self.layout.has_directory {
            match &self.directory {
                Some(entries) => codec::encode_directory_into(entries, &mut out),
                None => codec::encode_directory_into(&self.build_directory(), &mut out),
            }
        }
        for chunk in &self.chunks {
            codec::encode_chunk_into(chunk, self.layout, &mut out);
        }
        out
    }

    /// The layout this world saves in.
    pub fn layout(&self) -> FileLayout {
        self.layout
    }

    /// Changes the layout used by [`World::encode`].
    pub fn set_layout(&mut self, layout: FileLayout) {
        self.layout = layout;
    }

    /// Directory entries derived from the current chunk order.
    pub fn build_directory(&self) -> Vec<DirectoryEntry> {
        self.chunks
            .iter()
            .take(codec::DIRECTORY_ENTRIES)
            .enumerate()
            .map(|(index, chunk)| DirectoryEntry {
                x: chunk.x(),
                z: chunk.z(),
                index: index as i32,
            })
            .collect()
    }

    /// The loaded directory, if there is one and it is still valid.
    pub fn directory(&self) -> Option<&[DirectoryEntry]> {
        self.directory.as_deref()
    }

    /// Used directory entries whose index does not point at a chunk with the same
    /// coordinates.
    pub fn directory_mismatches(&self) -> Vec<DirectoryEntry> {
        let Some(entries) = &self.directory else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|entry| entry.is_used())
            .filter(|entry| match self.chunks.get(entry.index as usize) {
                Some(chunk) => chunk.x() != entry.x || chunk.z() != entry.z,
                None => true,
            })
            .copied()
            .collect()
    }

    /// Appends a chunk. An existing chunk at the same position keeps taking lookups.
    pub fn push_chunk(&mut self, chunk: Chunk) {
        let index = self.chunks.len();
        self.lookup.entry(chunk.position()).or_insert(index);
        self.chunks.push(chunk);
        self.directory = None;
    }

    /// Removes and returns the chunk at `index` in file order.
    pub fn remove_chunk(&mut self, index: usize) -> Option<Chunk> {
        if index >= self.chunks.len() {
            return None;
        }
        let chunk = self.chunks.remove(index);
        self.rebuild_lookup();
        self.directory = None;
        Some(chunk)
    }

    fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        for (index, chunk) in self.chunks.iter().enumerate() {
            self.lookup.entry(chunk.position()).or_insert(index);
        }
    }

    /// All chunks in file order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// The chunk at `index` in file order.
    pub fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    /// Mutable access to the chunk at `index` in file order.
    pub fn chunk_mut(&mut self, index: usize) -> Option<&mut Chunk> {
        self.chunks.get_mut(index)
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns `true` if no chunk is loaded.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn chunk_index_at(&self, gx: i32, gz: i32) -> Result<(usize, usize, usize), LookupError> {
        let (grid, lx, lz) = global_to_local(gx, gz);
        match self.lookup.get(&grid) {
            Some(index) => Ok((*index, lx, lz)),
            None => Err(LookupError::NotFound {
                x: grid.x,
                z: grid.y,
            }),
        }
    }

    /// The chunk owning global column `(gx, gz)`.
    pub fn get_chunk_at(&self, gx: i32, gz: i32) -> Option<&Chunk> {
        let (index, _, _) = self.chunk_index_at(gx, gz).ok()?;
        self.chunks.get(index)
    }

    /// Mutable access to the chunk owning global column `(gx, gz)`.
    pub fn get_chunk_at_mut(&mut self, gx: i32, gz: i32) -> Option<&mut Chunk> {
        let (index, _, _) = self.chunk_index_at(gx, gz).ok()?;
        self.chunks.get_mut(index)
    }

    /// The chunk at chunk-grid coordinate `(x, z)`.
    pub fn chunk_at_grid(&self, x: i32, z: i32) -> Option<&Chunk> {
        let index = self.lookup.get(&Point2::new(x, z))?;
        self.chunks.get(*index)
    }

    /// Reads the block at a global coordinate.
    ///
    /// # Errors
    /// `NotFound` if no chunk owns the column, `HeightOutOfRange` if `gy` is
    /// outside `0..256`.
    pub fn get_block_at(&self, gx: i32, gy: i32, gz: i32) -> Result<Block, LookupError> {
        let (index, lx, lz) = self.chunk_index_at(gx, gz)?;
        let y = check_height(gy)?;
        self.chunks[index]
            .get_block_at(lx, y, lz)
            .ok_or(LookupError::HeightOutOfRange { y: gy })
    }

    /// Writes the block at a global coordinate.
    ///
    /// Writing into a column no chunk owns does nothing and is not an error.
    ///
    /// # Errors
    /// `HeightOutOfRange` if the column is loaded but `gy` is outside `0..256`.
    pub fn set_block_at(&mut self, gx: i32, gy: i32, gz: i32, block: Block) -> Result<(), LookupError> {
        let (index, lx, lz) = match self.chunk_index_at(gx, gz) {
            Ok(found) => found,
            Err(error) => {
                debug!("Ignoring write at ({}, {}, {}): {}", gx, gy, gz, error);
                return Ok(());
            }
        };
        let y = check_height(gy)?;
        self.chunks[index].set_block_at(lx, y, lz, block);
        Ok(())
    }

    /// Fills the inclusive box between two corners with `block`.
    ///
    /// The corners may be given in any order. Each column is written as one
    /// contiguous run; columns no chunk owns are skipped.
    ///
    /// # Returns
    /// The number of blocks written.
    ///
    /// # Errors
    /// `HeightOutOfRange` if either corner's Y is outside `0..256`; nothing is
    /// written in that case.
    pub fn fill_blocks(
        &mut self,
        corner1: Point3<i32>,
        corner2: Point3<i32>,
        block: Block,
    ) -> Result<usize, LookupError> {
        let min = Point3::new(
            corner1.x.min(corner2.x),
            corner1.y.min(corner2.y),
            corner1.z.min(corner2.z),
        );
        let max = Point3::new(
            corner1.x.max(corner2.x),
            corner1.y.max(corner2.y),
            corner1.z.max(corner2.z),
        );
        let min_y = check_height(min.y)?;
        let max_y = check_height(max.y)?;

        let mut written = 0;
        let mut skipped_columns = 0;
        for gz in min.z..=max.z {
            for gx in min.x..=max.x {
                match self.chunk_index_at(gx, gz) {
                    Ok((index, lx, lz)) => {
                        written += self.chunks[index].fill_column(lx, lz, min_y..=max_y, block);
                    }
                    Err(_) => skipped_columns += 1,
                }
            }
        }
        if skipped_columns > 0 {
            debug!("Fill skipped {} unloaded columns", skipped_columns);
        }
        Ok(written)
    }
}

impl PartialEq for World {
    fn eq(&self, other: &Self) -> bool {
        self.layout == other.layout && self.chunks == other.chunks
    }
}

impl Eq for World {}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
