//! # Block Module
//!
//! A block is one voxel's packed 32-bit state. Only the low 10 bits (the type id)
//! are interpreted by the visibility engine; the remaining bits are carried
//! through loads and saves untouched.
//!
//! ## Bit Layout
//!
//! | Bits    | Field       |
//! |---------|-------------|
//! | 0..=9   | type id     |
//! | 10..=13 | light value |
//! | 14..=31 | block data  |

pub mod block_side;
pub mod block_type;

/// Mask selecting the type id bits of a block value.
pub const TYPE_ID_MASK: u32 = 0x3FF;
/// The type id of air. Air never matches a block type predicate.
pub const AIR_TYPE_ID: u32 = 0;

const LIGHT_LOWEST_BIT: u32 = 10;
const LIGHT_HIGHEST_BIT: u32 = 13;
const DATA_LOWEST_BIT: u32 = 14;
const DATA_HIGHEST_BIT: u32 = 31;

/// Represents a single voxel block in the world.
///
/// # Memory Layout
/// The `#[repr(C)]` attribute together with the `Pod` derive lets a chunk's block
/// array be viewed as a plain `[u32]` without copying, which is how the codec
/// reads and writes it.
#[repr(C)]
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct Block {
    /// The raw packed value as stored on disk.
    pub value: u32,
}

/// The block used for empty space.
pub const AIR: Block = Block { value: 0 };

impl Block {
    /// Wraps a raw packed block value.
    pub const fn new(value: u32) -> Self {
        Block { value }
    }

    /// Creates a block of the given type with every other bit cleared.
    pub const fn from_type_id(type_id: u32) -> Self {
        Block {
            value: type_id & TYPE_ID_MASK,
        }
    }

    /// Returns the block's type id (`value & 0x3FF`).
    #[inline]
    pub const fn type_id(self) -> u32 {
        self.value & TYPE_ID_MASK
    }

    /// Returns `true` if the block's type id equals `type_id`.
    #[inline]
    pub const fn matches(self, type_id: u32) -> bool {
        self.type_id() == type_id
    }

    /// Returns `true` for air blocks.
    #[inline]
    pub const fn is_air(self) -> bool {
        self.type_id() == AIR_TYPE_ID
    }

    /// Returns a copy of this block with its type id replaced and all other bits kept.
    pub fn with_type_id(self, type_id: u32) -> Self {
        Block {
            value: set_bits(self.value, 0, 9, type_id),
        }
    }

    /// Light value stored in bits 10 to 13.
    pub fn light(self) -> u32 {
        get_bits(self.value, LIGHT_LOWEST_BIT, LIGHT_HIGHEST_BIT)
    }

    /// Returns a copy of this block with a new light value.
    pub fn with_light(self, light: u32) -> Self {
        Block {
            value: set_bits(self.value, LIGHT_LOWEST_BIT, LIGHT_HIGHEST_BIT, light),
        }
    }

    /// Block state data stored in bits 14 to 31.
    pub fn data(self) -> u32 {
        get_bits(self.value, DATA_LOWEST_BIT, DATA_HIGHEST_BIT)
    }

    /// Returns a copy of this block with new state data.
    pub fn with_data(self, data: u32) -> Self {
        Block {
            value: set_bits(self.value, DATA_LOWEST_BIT, DATA_HIGHEST_BIT, data),
        }
    }
}

impl From<u32> for Block {
    fn from(value: u32) -> Self {
        Block { value }
    }
}

impl From<Block> for u32 {
    fn from(block: Block) -> Self {
        block.value
    }
}

fn bit_range_mask(lowest: u32, highest: u32) -> u32 {
    debug_assert!(lowest <= highest && highest < 32);
    let width = highest - lowest + 1;
    if width == 32 {
        u32::MAX
    } else {
        ((1u32 << width) - 1) << lowest
    }
}

/// Extracts the inclusive bit range `lowest..=highest` from `value`, shifted down to bit 0.
///
/// ```
/// use editsc_core::voxels::block::get_bits;
/// assert_eq!(get_bits(0b1101000, 3, 6), 0b1101);
/// ```
pub fn get_bits(value: u32, lowest: u32, highest: u32) -> u32 {
    (value & bit_range_mask(lowest, highest)) >> lowest
}

/// Replaces the inclusive bit range `lowest..=highest` of `value` with `new_value`.
///
/// Bits of `new_value` that do not fit into the range are discarded.
pub fn set_bits(value: u32, lowest: u32, highest: u32, new_value: u32) -> u32 {
    let mask = bit_range_mask(lowest, highest);
    (value & !mask) | ((new_value << lowest) & mask)
}
