use std::fmt;

use image::DynamicImage;

/// A pixel position in a [`HeightMap`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Coordinate { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A two-dimensional grid of elevation measurements of a river bed.
///
/// Elevation is stored with 24 bits of vertical resolution. When a height
/// map is built from an image, a pixel with red, green and blue components
/// *r*, *g*, *b* in `[0, 256)` stores the elevation `(r << 16) | (g << 8) | b`,
/// so ordinary image files double as height-map storage; greyscale images
/// work too, with 8 bits of resolution.
#[derive(Clone, Debug)]
pub struct HeightMap {
    width: i32,
    height: i32,
    elevations: Vec<u32>,
}

impl HeightMap {
    /// Creates a height map from row-major elevation data.
    ///
    /// **Panics** if `elevations` does not hold `width * height` values.
    pub fn new(width: i32, height: i32, elevations: Vec<u32>) -> Self {
        assert!(width > 0 && height > 0);
        assert_eq!(elevations.len(), (width * height) as usize);
        HeightMap {
            width,
            height,
            elevations,
        }
    }

    /// Creates a height map by decoding every pixel of `image` as a 24-bit
    /// elevation value.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let elevations = rgb
            .pixels()
            .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2]))
            .collect();
        HeightMap::new(width as i32, height as i32, elevations)
    }

    /// The elevation at `(x, y)`, in `[0, 2^24)`.
    ///
    /// **Panics** if `(x, y)` is out of bounds.
    pub fn elevation_at(&self, x: i32, y: i32) -> u32 {
        assert!(self.is_in_bounds(x, y));
        self.elevations[(y * self.width + x) as usize]
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    pub fn is_coordinate_in_bounds(&self, c: Coordinate) -> bool {
        self.is_in_bounds(c.x, c.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_lookup_is_row_major() {
        let map = HeightMap::new(3, 2, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(map.elevation_at(0, 0), 0);
        assert_eq!(map.elevation_at(2, 0), 2);
        assert_eq!(map.elevation_at(0, 1), 3);
        assert_eq!(map.elevation_at(2, 1), 5);
    }

    #[test]
    fn bounds_check() {
        let map = HeightMap::new(3, 2, vec![0; 6]);
        assert!(map.is_in_bounds(2, 1));
        assert!(!map.is_in_bounds(3, 1));
        assert!(!map.is_in_bounds(-1, 0));
    }
}
