use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::math::Real;
use crate::types::mesh::polygon_area;
use crate::types::{BoundingBox, Edge, Face, Mesh, Vertex};

/// Summary of a mesh's size, shape and health.
#[derive(Debug, Clone, Serialize)]
pub struct MeshStatistics {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub face_count: usize,
    pub triangle_count: usize,
    pub quad_count: usize,
    pub ngon_count: usize,
    pub boundary_edge_count: usize,
    pub non_manifold_edge_count: usize,

    pub min_edge_length: Real,
    pub max_edge_length: Real,
    pub avg_edge_length: Real,

    pub min_face_area: Real,
    pub max_face_area: Real,
    pub avg_face_area: Real,

    pub surface_area: Real,
    pub volume: Real,
    /// `None` for a mesh without vertices.
    pub bounding_box: Option<BoundingBox>,

    pub has_normals: bool,
    pub has_uvs: bool,
    pub is_valid_topology: bool,
}

/// Area of every face, indexed by face id.
pub fn face_areas(vertices: &[Vertex], faces: &[Face]) -> Vec<Real> {
    faces
        .par_iter()
        .map(|f| polygon_area(vertices, &f.vertices))
        .collect()
}

/// Length of every edge, indexed by edge id.
pub fn edge_lengths(vertices: &[Vertex], edges: &[Edge]) -> Vec<Real> {
    edges
        .par_iter()
        .map(|e| {
            let a = vertices[e.v1 as usize].position;
            let b = vertices[e.v2 as usize].position;
            a.distance(b)
        })
        .collect()
}

/// `(min, max, mean)`, or all zeros for an empty slice.
fn summarize(values: &[Real]) -> (Real, Real, Real) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let (min, max, sum) = values
        .par_iter()
        .fold(
            || (Real::INFINITY, Real::NEG_INFINITY, 0.0),
            |(lo, hi, sum), &v| (lo.min(v), hi.max(v), sum + v),
        )
        .reduce(
            || (Real::INFINITY, Real::NEG_INFINITY, 0.0),
            |a, b| (a.0.min(b.0), a.1.max(b.1), a.2 + b.2),
        );
    (min, max, sum / values.len() as Real)
}

/// Gather statistics for `mesh`.
///
/// Per-face and per-edge measurements run on the rayon pool over the mesh's
/// element slices.
pub fn compute_statistics(mesh: &Mesh) -> MeshStatistics {
    let vertices = mesh.vertices();
    let faces = mesh.faces();
    let edges = mesh.edges();

    let areas = face_areas(vertices, faces);
    let lengths = edge_lengths(vertices, edges);
    let (min_face_area, max_face_area, avg_face_area) = summarize(&areas);
    let (min_edge_length, max_edge_length, avg_edge_length) = summarize(&lengths);

    let triangle_count = faces.iter().filter(|f| f.is_triangle()).count();
    let quad_count = faces.iter().filter(|f| f.is_quad()).count();

    let stats = MeshStatistics {
        vertex_count: vertices.len(),
        edge_count: edges.len(),
        face_count: faces.len(),
        triangle_count,
        quad_count,
        ngon_count: faces.len() - triangle_count - quad_count,
        boundary_edge_count: edges.iter().filter(|e| e.is_boundary).count(),
        non_manifold_edge_count: edges.iter().filter(|e| !e.is_manifold()).count(),
        min_edge_length,
        max_edge_length,
        avg_edge_length,
        min_face_area,
        max_face_area,
        avg_face_area,
        surface_area: areas.iter().sum(),
        volume: mesh.volume(),
        bounding_box: (!vertices.is_empty()).then(|| mesh.bounding_box()),
        has_normals: mesh.has_normals(),
        has_uvs: mesh.has_uvs(),
        is_valid_topology: mesh.validate_topology(),
    };

    debug!(
        vertices = stats.vertex_count,
        faces = stats.face_count,
        edges = stats.edge_count,
        "Computed mesh statistics"
    );
    stats
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

impl fmt::Display for MeshStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Mesh Statistics ===")?;
        writeln!(f, "  Vertices:     {}", self.vertex_count)?;
        writeln!(f, "  Edges:        {}", self.edge_count)?;
        writeln!(
            f,
            "  Faces:        {} ({} tri, {} quad, {} ngon)",
            self.face_count, self.triangle_count, self.quad_count, self.ngon_count
        )?;
        writeln!(
            f,
            "  Boundary:     {} edges ({} non-manifold)",
            self.boundary_edge_count, self.non_manifold_edge_count
        )?;
        writeln!(
            f,
            "  Edge length:  min {:.6}  max {:.6}  avg {:.6}",
            self.min_edge_length, self.max_edge_length, self.avg_edge_length
        )?;
        writeln!(
            f,
            "  Face area:    min {:.6}  max {:.6}  avg {:.6}",
            self.min_face_area, self.max_face_area, self.avg_face_area
        )?;
        writeln!(f, "  Surface area: {:.6}", self.surface_area)?;
        writeln!(f, "  Volume:       {:.6}", self.volume)?;
        match &self.bounding_box {
            Some(bb) => writeln!(
                f,
                "  Bounding box: ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3})",
                bb.min.x, bb.min.y, bb.min.z, bb.max.x, bb.max.y, bb.max.z
            )?,
            None => writeln!(f, "  Bounding box: empty")?,
        }
        writeln!(f, "  Normals:      {}", yes_no(self.has_normals))?;
        writeln!(f, "  UVs:          {}", yes_no(self.has_uvs))?;
        write!(f, "  Topology:     {}", if self.is_valid_topology { "valid" } else { "invalid" })
    }
}
