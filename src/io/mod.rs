//! Readers and writers for the file formats of the pipeline: height maps
//! (text and image), river boundaries, network graphs and link sequences.

mod boundary;
mod graph;
#[cfg(feature = "ipe")]
mod ipe;
mod links;
mod text;

pub use boundary::{parse_boundary, read_boundary};
pub use graph::{parse_graph, read_graph, write_graph, write_graph_to_path};
#[cfg(feature = "ipe")]
pub use ipe::write_ipe_to_path;
pub use links::{write_link_sequence, write_link_sequence_to_path};
pub use text::{parse_text_heightmap, read_text_heightmap};

use thiserror::Error;

use crate::boundary::BoundaryError;

/// An error while reading one of the input formats.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("File could not be read ({0})")]
    Io(#[from] std::io::Error),
    /// A parse failure, with a message naming the offending value.
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Boundary(#[from] BoundaryError),
}

impl ReadError {
    fn parse(message: impl Into<String>) -> Self {
        ReadError::Parse(message.into())
    }
}
