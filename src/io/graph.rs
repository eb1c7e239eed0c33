use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::io::ReadError;
use crate::network_graph::NetworkGraph;
use crate::point::Point;
use crate::units::Units;

/// Writes a network graph:
///
/// ```text
/// <vertex-count>
/// <id> <x> <y>                                       (per vertex)
/// <edge-count>
/// <id> <from> <to> <delta> <x1> <y1> <x2> <y2> ...   (per edge)
/// ```
///
/// δ values are converted to real units (m³).
pub fn write_graph<W: Write>(graph: &NetworkGraph, units: &Units, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", graph.vertex_count())?;
    for v in graph.vertices() {
        writeln!(out, "{} {} {}", v.id, v.p.x, v.p.y)?;
    }
    writeln!(out, "{}", graph.edge_count())?;
    for e in graph.edges() {
        write!(
            out,
            "{} {} {} {}",
            e.id,
            e.from,
            e.to,
            units.to_real_volume(e.delta)
        )?;
        for p in &e.path {
            write!(out, " {} {}", p.x, p.y)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_graph_to_path(graph: &NetworkGraph, units: &Units, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_graph(graph, units, &mut out)
}

/// Reads a graph written by [`write_graph`]. Elevations are not part of
/// the format, so all points come back at height zero, and δ values are
/// kept in the units they were written in.
pub fn read_graph(path: &Path) -> Result<NetworkGraph, ReadError> {
    parse_graph(&std::fs::read_to_string(path)?)
}

/// See [`read_graph`].
pub fn parse_graph(content: &str) -> Result<NetworkGraph, ReadError> {
    let mut lines = content.lines();
    let mut next_line = || {
        lines
            .next()
            .ok_or_else(|| ReadError::parse("Premature end of file"))
    };

    let vertex_count: usize = parse_token(next_line()?.trim(), "vertex count")?;
    let mut graph = NetworkGraph::new();
    for _ in 0..vertex_count {
        let line = next_line()?;
        let mut tokens = line.split_whitespace();
        let _id: usize = parse_token(token(&mut tokens)?, "vertex id")?;
        let x: i32 = parse_token(token(&mut tokens)?, "vertex x-coordinate")?;
        let y: i32 = parse_token(token(&mut tokens)?, "vertex y-coordinate")?;
        graph.add_vertex(Point::new(x, y, 0.0));
    }

    let edge_count: usize = parse_token(next_line()?.trim(), "edge count")?;
    for _ in 0..edge_count {
        let line = next_line()?;
        let mut tokens = line.split_whitespace();
        let _id: usize = parse_token(token(&mut tokens)?, "edge id")?;
        let from: usize = parse_token(token(&mut tokens)?, "edge origin")?;
        let to: usize = parse_token(token(&mut tokens)?, "edge destination")?;
        let delta: f64 = parse_token(token(&mut tokens)?, "edge delta")?;
        if from >= graph.vertex_count() || to >= graph.vertex_count() {
            return Err(ReadError::parse(format!(
                "Edge endpoint out of bounds (was [{} -> {}])",
                from, to
            )));
        }
        let coordinates: Vec<i32> = tokens
            .map(|t| parse_token(t, "path coordinate"))
            .collect::<Result<_, _>>()?;
        if coordinates.len() % 2 != 0 {
            return Err(ReadError::parse(
                "Edge path has an odd number of coordinates",
            ));
        }
        let path: Vec<Point> = coordinates
            .chunks(2)
            .map(|c| Point::new(c[0], c[1], 0.0))
            .collect();
        graph.add_edge(from, to, path, delta);
    }

    Ok(graph)
}

fn token<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<&'a str, ReadError> {
    tokens
        .next()
        .ok_or_else(|| ReadError::parse("Premature end of line"))
}

fn parse_token<T: std::str::FromStr>(token: &str, name: &str) -> Result<T, ReadError> {
    token
        .parse()
        .map_err(|_| ReadError::parse(format!("{name} should be a number (was [{token}])")))
}
