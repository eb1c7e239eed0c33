use std::fs;
use std::path::Path;

use crate::heightmap::HeightMap;
use crate::io::ReadError;
use crate::units::Units;

/// Reads a height map from a whitespace-separated text file:
///
/// ```text
/// W H xRes yRes minH maxH e(0,0) e(1,0) ... e(W-1,H-1)
/// ```
///
/// Elevations are scaled into the 24-bit range between `minH` and `maxH`;
/// the resolutions and elevation range are returned as [`Units`].
pub fn read_text_heightmap(path: &Path) -> Result<(HeightMap, Units), ReadError> {
    let content = fs::read_to_string(path)?;
    parse_text_heightmap(&content)
}

/// See [`read_text_heightmap`].
pub fn parse_text_heightmap(content: &str) -> Result<(HeightMap, Units), ReadError> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(ReadError::parse(
            "Premature end of file (should contain at least six numbers \
             indicating the width, height, x-resolution, y-resolution, \
             minimum height, maximum height)",
        ));
    }

    let width = parse_positive_int(tokens[0], "Width")?;
    let height = parse_positive_int(tokens[1], "Height")?;
    let x_res = parse_positive_number(tokens[2], "x-resolution")?;
    let y_res = parse_positive_number(tokens[3], "y-resolution")?;
    let min_height = parse_number(tokens[4], "Minimum height")?;
    let max_height = parse_number(tokens[5], "Maximum height")?;

    let expected = (width as usize) * (height as usize);
    if tokens.len() != 6 + expected {
        return Err(ReadError::parse(format!(
            "File should contain {} x {} = {} elevation measures (encountered {})",
            width,
            height,
            expected,
            tokens.len() - 6
        )));
    }

    let mut elevations = vec![0u32; expected];
    for y in 0..height {
        for x in 0..width {
            let token = tokens[6 + (width as usize) * (y as usize) + (x as usize)];
            let elevation: f64 = token.parse().map_err(|_| {
                ReadError::parse(format!(
                    "Elevation data should be numbers (encountered [{token}])"
                ))
            })?;
            let scaled =
                0xff_ff_ff as f64 * (elevation - min_height) / (max_height - min_height);
            elevations[(y * width + x) as usize] = scaled.clamp(0.0, 0xff_ff_ff as f64) as u32;
        }
    }

    let units = Units {
        x_resolution: x_res,
        y_resolution: y_res,
        min_elevation: min_height,
        max_elevation: max_height,
    };
    Ok((HeightMap::new(width, height, elevations), units))
}

fn parse_positive_int(token: &str, name: &str) -> Result<i32, ReadError> {
    let value: i32 = token.parse().map_err(|_| {
        ReadError::parse(format!("{name} should be an integer (was [{token}])"))
    })?;
    if value <= 0 {
        return Err(ReadError::parse(format!(
            "{name} should be positive (was [{value}])"
        )));
    }
    Ok(value)
}

fn parse_number(token: &str, name: &str) -> Result<f64, ReadError> {
    token.parse().map_err(|_| {
        ReadError::parse(format!("{name} should be a number (was [{token}])"))
    })
}

fn parse_positive_number(token: &str, name: &str) -> Result<f64, ReadError> {
    let value = parse_number(token, name)?;
    if value <= 0.0 {
        return Err(ReadError::parse(format!(
            "{name} should be positive (was [{value}])"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_small_map() {
        let (map, units) = parse_text_heightmap("2 2 1 1 0 10  0 10 5 10").unwrap();
        assert_eq!(map.width(), 2);
        assert_eq!(map.height(), 2);
        assert_eq!(map.elevation_at(0, 0), 0);
        assert_eq!(map.elevation_at(1, 0), 0xff_ff_ff);
        assert_eq!(map.elevation_at(0, 1), 0x7f_ff_ff);
        assert_eq!(units.max_elevation, 10.0);
    }

    #[test]
    fn rejects_non_numeric_width() {
        let error = parse_text_heightmap("x 2 1 1 0 10").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Width should be an integer (was [x])"
        );
    }

    #[test]
    fn rejects_short_files() {
        let error = parse_text_heightmap("2 2 1 1 0 10 1 2 3").unwrap_err();
        assert_eq!(
            error.to_string(),
            "File should contain 2 x 2 = 4 elevation measures (encountered 3)"
        );
    }

    #[test]
    fn rejects_truncated_header() {
        let error = parse_text_heightmap("2 2").unwrap_err();
        assert!(error.to_string().starts_with("Premature end of file"));
    }
}
