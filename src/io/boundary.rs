use std::fs;
use std::path::Path;

use crate::boundary::{Boundary, BoundaryError, BoundaryPath};
use crate::heightmap::{Coordinate, HeightMap};
use crate::io::ReadError;

/// Reads a river boundary from a whitespace-separated text file:
///
/// ```text
/// nSource nSink nTop nBottom
/// x1 y1 x2 y2 ...            (the four paths, concatenated)
/// ```
///
/// Duplicate consecutive points are collapsed and spikes removed; the
/// resulting boundary is validated against `map`.
pub fn read_boundary(path: &Path, map: &HeightMap) -> Result<Boundary, ReadError> {
    let content = fs::read_to_string(path)?;
    parse_boundary(&content, map)
}

/// See [`read_boundary`].
pub fn parse_boundary(content: &str, map: &HeightMap) -> Result<Boundary, ReadError> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(ReadError::parse(
            "Premature end of file (should contain at least four numbers)",
        ));
    }

    let source_length = parse_length(tokens[0], "Source length")?;
    let sink_length = parse_length(tokens[1], "Sink length")?;
    let top_length = parse_length(tokens[2], "Top length")?;
    let bottom_length = parse_length(tokens[3], "Bottom length")?;

    let expected = source_length + sink_length + top_length + bottom_length;
    if tokens.len() != 4 + 2 * expected {
        return Err(ReadError::parse(format!(
            "File should contain {} x- and y-coordinates (encountered {})",
            2 * expected,
            tokens.len() - 4
        )));
    }

    let mut index = 4;
    let source = read_path(&tokens, source_length, map, &mut index)?;
    let sink = read_path(&tokens, sink_length, map, &mut index)?;
    let top = read_path(&tokens, top_length, map, &mut index)?;
    let bottom = read_path(&tokens, bottom_length, map, &mut index)?;

    let boundary = Boundary {
        source,
        top,
        sink,
        bottom,
    };
    boundary.validate(map)?;
    Ok(boundary)
}

fn parse_length(token: &str, name: &str) -> Result<usize, ReadError> {
    let value: i64 = token.parse().map_err(|_| {
        ReadError::parse(format!("{name} should be an integer (was [{token}])"))
    })?;
    if value <= 0 {
        return Err(ReadError::parse(format!(
            "{name} should be positive (was [{value}])"
        )));
    }
    Ok(value as usize)
}

fn read_path(
    tokens: &[&str],
    length: usize,
    map: &HeightMap,
    index: &mut usize,
) -> Result<BoundaryPath, ReadError> {
    let mut points: Vec<Coordinate> = Vec::with_capacity(length);
    let mut previous: Option<Coordinate> = None;
    for i in 0..length {
        let x = parse_coordinate(tokens[*index])?;
        *index += 1;
        let y = parse_coordinate(tokens[*index])?;
        *index += 1;

        let p = Coordinate::new(x, y);
        // ignore duplicated points
        if previous == Some(p) {
            continue;
        }
        if !map.is_coordinate_in_bounds(p) {
            return Err(BoundaryError::OutOfBounds(p).into());
        }
        if i != 0 {
            if let Some(prev) = previous {
                if prev.x != p.x && prev.y != p.y {
                    return Err(BoundaryError::DiagonalEdge(prev, p).into());
                }
                if (prev.x - p.x).abs() > 1 || (prev.y - p.y).abs() > 1 {
                    return Err(BoundaryError::LongEdge(prev, p).into());
                }
            }
        }
        points.push(p);
        previous = Some(p);
    }

    let mut path = BoundaryPath::new(points);
    path.remove_spikes();
    Ok(path)
}

fn parse_coordinate(token: &str) -> Result<i32, ReadError> {
    token.parse().map_err(|_| {
        ReadError::parse(format!("Coordinate [{token}] should be an integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> HeightMap {
        HeightMap::new(3, 3, vec![0; 9])
    }

    #[test]
    fn parses_a_full_frame_boundary() {
        // source: left edge, sink: right edge, top and bottom rows
        let content = "3 3 3 3 \
                       0 0  0 1  0 2 \
                       2 0  2 1  2 2 \
                       0 0  1 0  2 0 \
                       0 2  1 2  2 2";
        let boundary = parse_boundary(content, &map()).unwrap();
        assert_eq!(boundary.source.points.len(), 3);
        assert_eq!(boundary.top.start(), Coordinate::new(0, 0));
        assert_eq!(boundary.bottom.end(), Coordinate::new(2, 2));
    }

    #[test]
    fn reports_endpoint_mismatch() {
        // top ends at (2, 0) but sink starts at (2, 1)
        let content = "3 2 3 2 \
                       0 0  0 1  0 2 \
                       2 1  2 2 \
                       0 0  1 0  2 0 \
                       0 2  1 2";
        let error = parse_boundary(content, &map()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "The end of the top is not equal to the start of the sink"
        );
    }

    #[test]
    fn reports_diagonal_edges() {
        let content = "2 3 3 2 \
                       0 0  0 1 \
                       2 0  2 1  2 2 \
                       0 0  1 1  2 0 \
                       0 1  1 1";
        let error = parse_boundary(content, &map()).unwrap_err();
        assert_eq!(error.to_string(), "Illegal diagonal edge (0, 0) -> (1, 1)");
    }

    #[test]
    fn collapses_duplicates_and_spikes() {
        let content = "3 3 5 3 \
                       0 0  0 1  0 2 \
                       2 0  2 1  2 2 \
                       0 0  1 0  0 0  1 0  2 0 \
                       0 2  1 2  2 2";
        let boundary = parse_boundary(content, &map()).unwrap();
        assert_eq!(
            boundary.top.points,
            vec![
                Coordinate::new(0, 0),
                Coordinate::new(1, 0),
                Coordinate::new(2, 0)
            ]
        );
    }
}
