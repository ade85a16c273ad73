pub mod bounds;
pub mod element;
pub mod mesh;

pub use bounds::BoundingBox;
pub use element::{Edge, EdgeId, Face, FaceId, MaterialId, Vertex, VertexId};
pub use mesh::Mesh;
