//! # Codec Module
//!
//! The binary world file format, little-endian throughout:
//!
//! ```text
//! [directory]  65536 x (x: i32, z: i32, index: i32) + 1 guard entry   (optional)
//! [record 0]   magic 0xDEADBEEF, magic 0xFFFFFFFE, x: i32, z: i32,
//!              65536 x block: u32,
//!              256 x (max_height: u8, temp_humidity: u8, 2 reserved)   (optional)
//! [record 1]   ...
//! ```
//!
//! Which optional parts are present is described by a [`FileLayout`]; the
//! canonical layout has both.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use cgmath::Point2;
use serde::{Deserialize, Serialize};

use super::block::{Block, AIR};
use super::chunk::surface::{SurfacePoint, SURFACE_POINTS};
use super::chunk::{Chunk, BLOCKS_PER_CHUNK};
use super::error::FormatError;

/// First guard value of every chunk record.
pub const MAGIC_1: u32 = 0xDEAD_BEEF;
/// Second guard value of every chunk record.
pub const MAGIC_2: u32 = 0xFFFF_FFFE;

/// Size of a chunk record header: two guards and the chunk coordinate.
pub const HEADER_SIZE: usize = 16;
/// Size of one block on disk.
pub const BLOCK_SIZE: usize = 4;
/// Size of a chunk's block array on disk.
pub const BLOCK_DATA_SIZE: usize = BLOCKS_PER_CHUNK * BLOCK_SIZE;
/// Size of one surface point on disk.
pub const SURFACE_POINT_SIZE: usize = 4;
/// Size of a chunk's surface table on disk.
pub const SURFACE_DATA_SIZE: usize = SURFACE_POINTS * SURFACE_POINT_SIZE;
/// Size of a canonical chunk record.
pub const RECORD_SIZE: usize = HEADER_SIZE + BLOCK_DATA_SIZE + SURFACE_DATA_SIZE;

/// Size of one directory entry on disk.
pub const DIRECTORY_ENTRY_SIZE: usize = 12;
/// Number of usable directory entries, not counting the guard.
pub const DIRECTORY_ENTRIES: usize = 65536;
/// Size of the directory region including its guard entry.
pub const DIRECTORY_SIZE: usize = (DIRECTORY_ENTRIES + 1) * DIRECTORY_ENTRY_SIZE;

/// Which optional regions a world file carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileLayout {
    /// The file starts with a directory table.
    pub has_directory: bool,
    /// Every chunk record ends with a surface table.
    pub has_surface: bool,
}

impl FileLayout {
    /// Directory, header, blocks and surface: the current format.
    pub const CANONICAL: FileLayout = FileLayout {
        has_directory: true,
        has_surface: true,
    };

    /// Every supported layout, canonical first.
    pub const ALL: [FileLayout; 4] = [
        FileLayout::CANONICAL,
        FileLayout {
            has_directory: true,
            has_surface: false,
        },
        FileLayout {
            has_directory: false,
            has_surface: true,
        },
        FileLayout {
            has_directory: false,
            has_surface: false,
        },
    ];

    /// Bytes before the first chunk record.
    pub const fn directory_size(self) -> usize {
        if self.has_directory {
            DIRECTORY_SIZE
        } else {
            0
        }
    }

    /// Bytes per chunk record.
    pub const fn record_size(self) -> usize {
        if self.has_surface {
            RECORD_SIZE
        } else {
            HEADER_SIZE + BLOCK_DATA_SIZE
        }
    }

    /// Total file size for `chunk_count` chunks.
    pub const fn file_size(self, chunk_count: usize) -> usize {
        self.directory_size() + chunk_count * self.record_size()
    }

    /// Picks the first layout, canonical first, whose shape fits a buffer of
    /// `length` bytes whose first record starts with valid guards.
    pub fn detect(bytes: &[u8]) -> Option<FileLayout> {
        FileLayout::ALL.into_iter().find(|layout| {
            let fits = validate_total_length(bytes.len(), layout.directory_size(), layout.record_size())
                .map(|count| count > 0)
                .unwrap_or(false);
            fits && decode_header(&bytes[layout.directory_size()..]).is_ok()
        })
    }
}

impl Default for FileLayout {
    fn default() -> Self {
        FileLayout::CANONICAL
    }
}

/// The coordinate stored in a chunk record header.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHeader {
    pub x: i32,
    pub z: i32,
}

/// One slot of the directory table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    pub x: i32,
    pub z: i32,
    /// Position of the chunk in the file, or `-1` for an unused slot.
    pub index: i32,
}

impl DirectoryEntry {
    /// The value of unused slots and of the trailing guard entry.
    pub const UNUSED: DirectoryEntry = DirectoryEntry { x: 0, z: 0, index: -1 };

    /// Returns `true` if this slot points at a chunk.
    pub fn is_used(&self) -> bool {
        self.index >= 0
    }
}

fn require(bytes: &[u8], needed: usize) -> Result<(), FormatError> {
    if bytes.len() < needed {
        Err(FormatError::Truncated {
            needed,
            available: bytes.len(),
        })
    } else {
        Ok(())
    }
}

/// Checks that a file of `total_bytes` is a directory plus whole records.
///
/// # Returns
/// The number of chunk records in the file.
pub fn validate_total_length(
    total_bytes: usize,
    directory_size: usize,
    record_size: usize,
) -> Result<usize, FormatError> {
    let bad_length = FormatError::BadLength {
        length: total_bytes,
        directory_size,
        record_size,
    };
    if record_size == 0 || total_bytes < directory_size {
        return Err(bad_length);
    }
    let chunk_bytes = total_bytes - directory_size;
    if chunk_bytes % record_size != 0 {
        return Err(bad_length);
    }
    Ok(chunk_bytes / record_size)
}

/// Reads and validates a chunk record header.
pub fn decode_header(bytes: &[u8]) -> Result<ChunkHeader, FormatError> {
    require(bytes, HEADER_SIZE)?;
    let magic_1 = LittleEndian::read_u32(&bytes[0..4]);
    let magic_2 = LittleEndian::read_u32(&bytes[4..8]);
    if magic_1 != MAGIC_1 || magic_2 != MAGIC_2 {
        return Err(FormatError::BadMagic {
            record: 0,
            found: (magic_1, magic_2),
        });
    }
    Ok(ChunkHeader {
        x: LittleEndian::read_i32(&bytes[8..12]),
        z: LittleEndian::read_i32(&bytes[12..16]),
    })
}

/// Reads the 65536 blocks that start `header_size` bytes into `bytes`.
pub fn decode_blocks(bytes: &[u8], header_size: usize) -> Result<Vec<Block>, FormatError> {
    require(bytes, header_size + BLOCK_DATA_SIZE)?;
    let mut blocks = vec![AIR; BLOCKS_PER_CHUNK];
    LittleEndian::read_u32_into(
        &bytes[header_size..header_size + BLOCK_DATA_SIZE],
        bytemuck::cast_slice_mut(&mut blocks),
    );
    Ok(blocks)
}

/// Reads the 256 surface points that start `offset` bytes into `bytes`.
pub fn decode_surface(bytes: &[u8], offset: usize) -> Result<Vec<SurfacePoint>, FormatError> {
    require(bytes, offset + SURFACE_DATA_SIZE)?;
    Ok(bytes[offset..offset + SURFACE_DATA_SIZE]
        .chunks_exact(SURFACE_POINT_SIZE)
        .map(|raw| SurfacePoint {
            max_height: raw[0],
            temp_humidity: raw[1],
            reserved: [raw[2], raw[3]],
        })
        .collect())
}

/// Decodes one chunk record laid out as `layout` describes.
pub fn decode_chunk(bytes: &[u8], layout: FileLayout) -> Result<Chunk, FormatError> {
    require(bytes, layout.record_size())?;
    let header = decode_header(bytes)?;
    let blocks = decode_blocks(bytes, HEADER_SIZE)?;
    let surface = if layout.has_surface {
        Some(decode_surface(bytes, HEADER_SIZE + BLOCK_DATA_SIZE)?)
    } else {
        None
    };
    Ok(Chunk {
        position: Point2::new(header.x, header.z),
        blocks: blocks.into_boxed_slice(),
        surface: surface.map(Vec::into_boxed_slice),
    })
}

/// Appends one chunk record to `out`.
///
/// When the layout carries a surface table and the chunk has none, a zeroed table
/// is written. The surface of a chunk is dropped when the layout has no room for it.
pub fn encode_chunk_into(chunk: &Chunk, layout: FileLayout, out: &mut Vec<u8>) {
    out.reserve(layout.record_size());
    // Writes into a Vec cannot fail.
    let _ = out.write_u32::<LittleEndian>(MAGIC_1);
    let _ = out.write_u32::<LittleEndian>(MAGIC_2);
    let _ = out.write_i32::<LittleEndian>(chunk.x());
    let _ = out.write_i32::<LittleEndian>(chunk.z());

    let start = out.len();
    out.resize(start + BLOCK_DATA_SIZE, 0);
    LittleEndian::write_u32_into(chunk.block_values(), &mut out[start..]);

    if layout.has_surface {
        match chunk.surface() {
            Some(points) => {
                for point in points {
                    out.push(point.max_height);
                    out.push(point.temp_humidity);
                    out.extend_from_slice(&point.reserved);
                }
            }
            None => out.resize(out.len() + SURFACE_DATA_SIZE, 0),
        }
    }
}

/// Encodes one chunk record. The exact inverse of [`decode_chunk`].
pub fn encode_chunk(chunk: &Chunk, layout: FileLayout) -> Vec<u8> {
    let mut out = Vec::with_capacity(layout.record_size());
    encode_chunk_into(chunk, layout, &mut out);
    out
}

/// Reads the directory table, without its guard entry.
pub fn decode_directory(bytes: &[u8]) -> Result<Vec<DirectoryEntry>, FormatError> {
    require(bytes, DIRECTORY_SIZE)?;
    Ok(bytes[..DIRECTORY_ENTRIES * DIRECTORY_ENTRY_SIZE]
        .chunks_exact(DIRECTORY_ENTRY_SIZE)
        .map(|raw| DirectoryEntry {
            x: LittleEndian::read_i32(&raw[0..4]),
            z: LittleEndian::read_i32(&raw[4..8]),
            index: LittleEndian::read_i32(&raw[8..12]),
        })
        .collect())
}

/// Appends the directory table and its guard entry to `out`.
///
/// Missing trailing entries are written as unused slots, extra ones are dropped.
pub fn encode_directory_into(entries: &[DirectoryEntry], out: &mut Vec<u8>) {
    out.reserve(DIRECTORY_SIZE);
    let padding = std::iter::repeat(&DirectoryEntry::UNUSED);
    let slots = entries.iter().chain(padding).take(DIRECTORY_ENTRIES);
    for entry in slots.chain(std::iter::once(&DirectoryEntry::UNUSED)) {
        let _ = out.write_i32::<LittleEndian>(entry.x);
        let _ = out.write_i32::<LittleEndian>(entry.z);
        let _ = out.write_i32::<LittleEndian>(entry.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::chunk::chunk_index::block_index;

    fn random_chunk(rng: &mut fastrand::Rng) -> Chunk {
        let blocks = (0..BLOCKS_PER_CHUNK).map(|_| Block::new(rng.u32(..))).collect();
        let surface = (0..SURFACE_POINTS)
            .map(|_| SurfacePoint {
                max_height: rng.u8(..),
                temp_humidity: rng.u8(..),
                reserved: [rng.u8(..), rng.u8(..)],
            })
            .collect();
        Chunk::from_parts(Point2::new(rng.i32(..), rng.i32(..)), blocks, Some(surface)).unwrap()
    }

    #[test]
    fn record_sizes_match_format() {
        assert_eq!(RECORD_SIZE, 263_184);
        assert_eq!(DIRECTORY_SIZE, 786_444);
        assert_eq!(FileLayout::CANONICAL.record_size(), 263_184);
        assert_eq!(
            FileLayout {
                has_directory: false,
                has_surface: false
            }
            .record_size(),
            262_160
        );
    }

    #[test]
    fn empty_chunk_round_trips_in_every_layout() {
        let chunk = Chunk::empty(5, -7);
        for layout in FileLayout::ALL {
            let decoded = decode_chunk(&encode_chunk(&chunk, layout), layout).unwrap();
            assert_eq!(decoded, chunk);
        }
    }

    #[test]
    fn nonzero_surface_differs_from_missing_one() {
        let mut chunk = Chunk::empty(0, 0);
        let mut with_surface = chunk.clone();
        let mut points = vec![SurfacePoint::default(); SURFACE_POINTS];
        points[3].max_height = 9;
        assert!(with_surface.set_surface(points));
        assert_ne!(with_surface, chunk);

        assert!(chunk.set_surface(vec![SurfacePoint::default(); SURFACE_POINTS]));
        assert_eq!(chunk, Chunk::empty(0, 0));
    }

    #[test]
    fn round_trip_preserves_everything() {
        let mut rng = fastrand::Rng::with_seed(1);
        for _ in 0..3 {
            let chunk = random_chunk(&mut rng);
            let bytes = encode_chunk(&chunk, FileLayout::CANONICAL);
            assert_eq!(bytes.len(), RECORD_SIZE);
            assert_eq!(decode_chunk(&bytes, FileLayout::CANONICAL), Ok(chunk));
        }
    }

    #[test]
    fn round_trip_without_surface() {
        let mut chunk = Chunk::empty(-4, 9);
        chunk.set_block(block_index(1, 2, 3), Block::new(0x1234_5678));
        let layout = FileLayout {
            has_directory: false,
            has_surface: false,
        };
        let bytes = encode_chunk(&chunk, layout);
        assert_eq!(bytes.len(), layout.record_size());
        assert_eq!(decode_chunk(&bytes, layout), Ok(chunk));
    }

    #[test]
    fn header_is_little_endian() {
        let chunk = Chunk::empty(-2, 3);
        let bytes = encode_chunk(&chunk, FileLayout::CANONICAL);
        assert_eq!(&bytes[0..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&bytes[4..8], &[0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[8..12], &(-2i32).to_le_bytes());
        assert_eq!(&bytes[12..16], &3i32.to_le_bytes());
        assert_eq!(decode_header(&bytes), Ok(ChunkHeader { x: -2, z: 3 }));
    }

    #[test]
    fn blocks_are_written_in_index_order() {
        let mut chunk = Chunk::empty(0, 0);
        chunk.set_block(1, Block::new(0x0102_0304));
        let bytes = encode_chunk(&chunk, FileLayout::CANONICAL);
        assert_eq!(&bytes[HEADER_SIZE + 4..HEADER_SIZE + 8], &[0x04, 0x03, 0x02, 0x01]);
        let blocks = decode_blocks(&bytes, HEADER_SIZE).unwrap();
        assert_eq!(blocks[1], Block::new(0x0102_0304));
    }

    #[test]
    fn any_flipped_guard_byte_is_bad_magic() {
        let bytes = encode_chunk(&Chunk::empty(0, 0), FileLayout::CANONICAL);
        for offset in 0..8 {
            for flip in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = bytes.clone();
                corrupted[offset] ^= flip;
                assert!(matches!(
                    decode_header(&corrupted),
                    Err(FormatError::BadMagic { .. })
                ));
                assert!(matches!(
                    decode_chunk(&corrupted, FileLayout::CANONICAL),
                    Err(FormatError::BadMagic { .. })
                ));
            }
        }
    }

    #[test]
    fn length_validation_accepts_only_whole_records() {
        for k in 0..4 {
            let length = DIRECTORY_SIZE + k * RECORD_SIZE;
            assert_eq!(validate_total_length(length, DIRECTORY_SIZE, RECORD_SIZE), Ok(k));
            for delta in [1, 12, RECORD_SIZE - 1] {
                assert!(matches!(
                    validate_total_length(length + delta, DIRECTORY_SIZE, RECORD_SIZE),
                    Err(FormatError::BadLength { .. })
                ));
            }
        }
        assert!(validate_total_length(DIRECTORY_SIZE - 1, DIRECTORY_SIZE, RECORD_SIZE).is_err());
        assert!(validate_total_length(0, DIRECTORY_SIZE, RECORD_SIZE).is_err());
        assert_eq!(validate_total_length(0, 0, RECORD_SIZE), Ok(0));
    }

    #[test]
    fn short_buffers_are_truncated() {
        assert_eq!(
            decode_header(&[0xEF, 0xBE]),
            Err(FormatError::Truncated {
                needed: HEADER_SIZE,
                available: 2
            })
        );
        let bytes = encode_chunk(&Chunk::empty(0, 0), FileLayout::CANONICAL);
        assert!(matches!(
            decode_chunk(&bytes[..RECORD_SIZE - 1], FileLayout::CANONICAL),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn directory_round_trip_with_guard() {
        let entries = vec![
            DirectoryEntry { x: 1, z: 2, index: 0 },
            DirectoryEntry { x: -1, z: 5, index: 1 },
        ];
        let mut bytes = Vec::new();
        encode_directory_into(&entries, &mut bytes);
        assert_eq!(bytes.len(), DIRECTORY_SIZE);
        assert_eq!(&bytes[DIRECTORY_SIZE - 4..], &(-1i32).to_le_bytes());

        let decoded = decode_directory(&bytes).unwrap();
        assert_eq!(decoded.len(), DIRECTORY_ENTRIES);
        assert_eq!(&decoded[..2], &entries[..]);
        assert!(decoded[2..].iter().all(|entry| *entry == DirectoryEntry::UNUSED));
    }

    #[test]
    fn layout_detection_prefers_canonical() {
        let mut bytes = Vec::new();
        encode_directory_into(&[], &mut bytes);
        encode_chunk_into(&Chunk::empty(0, 0), FileLayout::CANONICAL, &mut bytes);
        assert_eq!(FileLayout::detect(&bytes), Some(FileLayout::CANONICAL));

        let bare = FileLayout {
            has_directory: false,
            has_surface: false,
        };
        let bytes = encode_chunk(&Chunk::empty(0, 0), bare);
        assert_eq!(FileLayout::detect(&bytes), Some(bare));
        assert_eq!(FileLayout::detect(&[0u8; 100]), None);
    }
}
