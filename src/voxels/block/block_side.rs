//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the per-block face mask
//! produced by the visibility engine.

use cgmath::Vector3;
use num_derive::FromPrimitive;

/// Represents the six possible faces of a voxel block.
///
/// The discriminant of each variant is its bit position in a [`FaceMask`] and its
/// position in the direction table returned by [`BlockSide::all`]. Every visibility
/// query uses this order.
///
/// The order is: [FRONT, TOP, RIGHT, BACK, BOTTOM, LEFT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug, FromPrimitive)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The top face (facing positive Y)
    TOP = 1,

    /// The right face (facing positive X)
    RIGHT = 2,

    /// The back face (facing negative Z)
    BACK = 3,

    /// The bottom face (facing negative Y)
    BOTTOM = 4,

    /// The left face (facing negative X)
    LEFT = 5,
}

/// Unit offsets to the neighbouring block, indexed by `BlockSide as usize`.
const SIDE_VECTORS: [[i32; 3]; 6] = [
    [0, 0, 1],
    [0, 1, 0],
    [1, 0, 0],
    [0, 0, -1],
    [0, -1, 0],
    [-1, 0, 0],
];

impl BlockSide {
    /// Returns an array containing all six block faces in mask-bit order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::TOP,
            BlockSide::RIGHT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::LEFT,
        ]
    }

    /// Offset from a block to the neighbour this face touches.
    pub fn vector(self) -> Vector3<i32> {
        let [x, y, z] = SIDE_VECTORS[self as usize];
        Vector3::new(x, y, z)
    }

    /// The single bit this face occupies in a [`FaceMask`].
    #[inline]
    pub fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// The face pointing the other way.
    pub fn opposite(self) -> BlockSide {
        match self {
            BlockSide::FRONT => BlockSide::BACK,
            BlockSide::TOP => BlockSide::BOTTOM,
            BlockSide::RIGHT => BlockSide::LEFT,
            BlockSide::BACK => BlockSide::FRONT,
            BlockSide::BOTTOM => BlockSide::TOP,
            BlockSide::LEFT => BlockSide::RIGHT,
        }
    }

    /// Looks a face up by its mask bit position.
    pub fn from_index(index: u8) -> Option<BlockSide> {
        num::FromPrimitive::from_u8(index)
    }
}

/// The exposed faces of one block, one bit per [`BlockSide`].
///
/// The visibility engine returns masks as a dense `Vec<u8>` so the buffer can be
/// moved across the offload boundary; this type is a view over one of those bytes.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct FaceMask(pub u8);

impl FaceMask {
    /// Mask with no face exposed.
    pub const NONE: FaceMask = FaceMask(0);
    /// Mask with all six faces exposed.
    pub const ALL: FaceMask = FaceMask(0b11_1111);

    /// Returns `true` if `side` is exposed.
    pub fn contains(self, side: BlockSide) -> bool {
        self.0 & side.bit() != 0
    }

    /// Marks `side` as exposed.
    pub fn insert(&mut self, side: BlockSide) {
        self.0 |= side.bit();
    }

    /// Number of exposed faces.
    pub fn count(self) -> u32 {
        (self.0 & Self::ALL.0).count_ones()
    }

    /// The exposed faces, in mask-bit order.
    pub fn sides(self) -> impl Iterator<Item = BlockSide> {
        BlockSide::all()
            .into_iter()
            .filter(move |side| self.contains(*side))
    }
}

impl From<u8> for FaceMask {
    fn from(bits: u8) -> Self {
        FaceMask(bits)
    }
}
