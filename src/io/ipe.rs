use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::heightmap::HeightMap;
use crate::link_sequence::LinkSequence;
use crate::network_graph::NetworkGraph;
use crate::units::Units;

/// A blue-to-green ramp over the δ decades, darkest for the least
/// significant links.
const DELTA_COLORS: [(u8, u8, u8); 7] = [
    (0xc7, 0xe9, 0xb4),
    (0x7f, 0xcd, 0xbb),
    (0x41, 0xb6, 0xc4),
    (0x1d, 0x91, 0xc0),
    (0x22, 0x5e, 0xa8),
    (0x25, 0x34, 0x94),
    (0x08, 0x1d, 0x58),
];

/// Writes the network as an Ipe figure: one polyline per link, colored and
/// weighted by the link's δ value, with the y-axis flipped to map
/// convention and stretched by the pixel aspect ratio.
pub fn write_ipe_to_path(
    map: &HeightMap,
    graph: &NetworkGraph,
    units: &Units,
    path: &Path,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_ipe(map, graph, units, &mut out)
}

fn write_ipe<W: Write>(
    map: &HeightMap,
    graph: &NetworkGraph,
    units: &Units,
    out: &mut W,
) -> io::Result<()> {
    let vertical_stretch = units.y_resolution / units.x_resolution;
    let width = f64::from(map.width() - 1);
    let height = f64::from(map.height() - 1) * vertical_stretch;

    writeln!(out, "<?xml version=\"1.0\"?>")?;
    writeln!(out, "<!DOCTYPE ipe SYSTEM \"ipe.dtd\">")?;
    writeln!(out, "<ipe version=\"70218\" creator=\"braidnet\">")?;
    writeln!(out, "<ipestyle name=\"paper-size\">")?;
    writeln!(
        out,
        "<layout paper=\"{width} {height}\" origin=\"0 0\" frame=\"{width} {height}\"/>"
    )?;
    writeln!(out, "</ipestyle>")?;
    writeln!(out, "<page>")?;
    writeln!(out, "<layer name=\"network\"/>")?;

    let links = LinkSequence::new(graph);
    let delta_max = if links.link_count() > 1 {
        links.link(1).delta
    } else {
        1.0
    };
    for i in (0..links.link_count()).rev() {
        let link = links.link(i);
        if link.path.len() < 2 {
            continue;
        }

        let decade = if link.delta == f64::INFINITY {
            0
        } else {
            (1..=6)
                .find(|d| link.delta > delta_max / 10f64.powi(*d))
                .unwrap_or(6) as usize
        };
        let (r, g, b) = DELTA_COLORS[decade];
        let pen = if link.delta < f64::INFINITY {
            (3.0 - 0.5 * (delta_max / link.delta).log10()).max(1.5)
        } else {
            4.0
        };

        writeln!(
            out,
            "<path layer=\"network\" stroke=\"{:.3} {:.3} {:.3}\" pen=\"{:.2}\">",
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            pen
        )?;
        for (j, p) in link.path.iter().enumerate() {
            let x = f64::from(p.x);
            let y = vertical_stretch * f64::from(map.height() - 1 - p.y);
            writeln!(out, "{} {} {}", x, y, if j == 0 { "m" } else { "l" })?;
        }
        writeln!(out, "</path>")?;
    }

    writeln!(out, "</page>")?;
    writeln!(out, "</ipe>")?;
    Ok(())
}
