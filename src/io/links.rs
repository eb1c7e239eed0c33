use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::link_sequence::LinkSequence;
use crate::units::Units;

/// Writes a link sequence:
///
/// ```text
/// <link-count>
/// <id> <delta> <x1> <y1> ... <xn> <yn>   (per link)
/// ```
///
/// δ values are converted to real units (m³).
pub fn write_link_sequence<W: Write>(
    links: &LinkSequence,
    units: &Units,
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "{}", links.link_count())?;
    for (id, link) in links.links().enumerate() {
        write!(out, "{} {}", id, units.to_real_volume(link.delta))?;
        for p in &link.path {
            write!(out, " {} {}", p.x, p.y)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_link_sequence_to_path(
    links: &LinkSequence,
    units: &Units,
    path: &Path,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_link_sequence(links, units, &mut out)
}
