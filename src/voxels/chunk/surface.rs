//! Per-column surface metadata stored after a chunk's blocks.

use super::CHUNK_WIDTH;

/// Number of surface points in a chunk, one per column.
pub const SURFACE_POINTS: usize = CHUNK_WIDTH * CHUNK_WIDTH;

/// Surface metadata for one vertical column of a chunk.
///
/// The two reserved bytes are kept verbatim so a loaded file saves back unchanged.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct SurfacePoint {
    /// Highest non-air block in the column.
    pub max_height: u8,
    /// Temperature in the low nibble, humidity in the high nibble.
    pub temp_humidity: u8,
    /// Unused by this crate.
    pub reserved: [u8; 2],
}

impl SurfacePoint {
    /// Index of the surface point for local column `(x, z)`.
    #[inline]
    pub const fn index(x: usize, z: usize) -> usize {
        x + z * CHUNK_WIDTH
    }

    /// Temperature, 0 to 15.
    pub fn temperature(self) -> u8 {
        self.temp_humidity & 0x0F
    }

    /// Humidity, 0 to 15.
    pub fn humidity(self) -> u8 {
        self.temp_humidity >> 4
    }

    /// Packs temperature and humidity; values above 15 are truncated.
    pub fn set_climate(&mut self, temperature: u8, humidity: u8) {
        self.temp_humidity = (temperature & 0x0F) | ((humidity & 0x0F) << 4);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn climate_nibbles() {
        let mut point = SurfacePoint::default();
        point.set_climate(9, 4);
        assert_eq!(point.temp_humidity, 0x49);
        assert_eq!(point.temperature(), 9);
        assert_eq!(point.humidity(), 4);
    }

    #[test]
    fn index_is_x_major_within_row() {
        assert_eq!(SurfacePoint::index(0, 0), 0);
        assert_eq!(SurfacePoint::index(15, 0), 15);
        assert_eq!(SurfacePoint::index(0, 1), 16);
        assert_eq!(SurfacePoint::index(15, 15), SURFACE_POINTS - 1);
    }
}
