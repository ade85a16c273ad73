//! Polygon mesh toolkit: an indexed vertex/edge/face mesh with incremental
//! edge topology, primitive generators, statistics, and OBJ/PLY I/O.

pub mod analysis;
pub mod config;
pub mod error;
pub mod generators;
pub mod io;
pub mod math;
pub mod pipeline;
pub mod profiling;
pub mod types;

pub use config::{PipelineConfig, PlyEncoding, SaveOptions};
pub use error::{MeshError, Result};
pub use io::{load_mesh, save_mesh};
pub use pipeline::Pipeline;
pub use types::{BoundingBox, Edge, Face, Mesh, Vertex};
