//! # Block Type Module
//!
//! The registry of voxel types the editor knows how to draw. Each variant's
//! discriminant is the type id stored in the low 10 bits of a block.

use std::fmt;

use num_derive::FromPrimitive;
use phf::phf_map;

use super::Block;

/// Enumerates the known block types.
///
/// Type ids that are not listed here are still valid block values; they simply
/// have no name and are not scanned by default.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Empty space.
    AIR = 0,
    /// Indestructible floor layer.
    BEDROCK = 1,
    /// Plain dirt.
    DIRT = 2,
    /// The most common underground stone.
    GRANITE = 3,
    /// Dirt with grass on top.
    GRASS = 8,
    /// Oak log.
    OAK_WOOD = 9,
    /// Birch log.
    BIRCH_WOOD = 10,
    /// Spruce log.
    SPRUCE_WOOD = 11,
    /// Oak leaves.
    OAK_LEAVES = 12,
    /// Birch leaves.
    BIRCH_LEAVES = 13,
    /// Spruce leaves.
    SPRUCE_LEAVES = 14,
    /// Glass.
    GLASS = 15,
    /// Coal ore.
    COAL_ORE = 16,
}

/// Maps lowercase names, as typed on the command line, to block types.
static BLOCK_TYPES_BY_NAME: phf::Map<&'static str, BlockType> = phf_map! {
    "air" => BlockType::AIR,
    "bedrock" => BlockType::BEDROCK,
    "dirt" => BlockType::DIRT,
    "granite" => BlockType::GRANITE,
    "grass" => BlockType::GRASS,
    "oak_wood" => BlockType::OAK_WOOD,
    "birch_wood" => BlockType::BIRCH_WOOD,
    "spruce_wood" => BlockType::SPRUCE_WOOD,
    "oak_leaves" => BlockType::OAK_LEAVES,
    "birch_leaves" => BlockType::BIRCH_LEAVES,
    "spruce_leaves" => BlockType::SPRUCE_LEAVES,
    "glass" => BlockType::GLASS,
    "coal_ore" => BlockType::COAL_ORE,
};

impl BlockType {
    /// Every known non-air type, in type id order.
    pub const SOLID: [BlockType; 12] = [
        BlockType::BEDROCK,
        BlockType::DIRT,
        BlockType::GRANITE,
        BlockType::GRASS,
        BlockType::OAK_WOOD,
        BlockType::BIRCH_WOOD,
        BlockType::SPRUCE_WOOD,
        BlockType::OAK_LEAVES,
        BlockType::BIRCH_LEAVES,
        BlockType::SPRUCE_LEAVES,
        BlockType::GLASS,
        BlockType::COAL_ORE,
    ];

    /// Looks up the named type of a raw type id.
    pub fn from_type_id(type_id: u32) -> Option<Self> {
        num::FromPrimitive::from_u32(type_id)
    }

    /// Looks up a type by its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_TYPES_BY_NAME.get(name).copied()
    }

    /// The type id stored in the low bits of a block.
    pub fn type_id(self) -> u32 {
        self as u32
    }

    /// A block of this type with no light or state data.
    pub fn block(self) -> Block {
        Block::from_type_id(self.type_id())
    }

    /// The lowercase name accepted by [`BlockType::from_name`].
    pub fn name(self) -> &'static str {
        BLOCK_TYPES_BY_NAME
            .entries()
            .find(|(_, block_type)| **block_type == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.type_id())
    }
}
