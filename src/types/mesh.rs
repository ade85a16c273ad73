use std::cell::Cell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::error::{MeshError, Result};
use crate::math::{self, EPSILON, Matrix4, Real, Vector2, Vector3};

use super::bounds::BoundingBox;
use super::element::{
    Edge, EdgeId, Face, FaceId, MaterialId, Vertex, VertexId, canonical_pair,
};

/// Indexed polygon mesh.
///
/// Vertices, edges and faces are stored in dense arrays whose ids equal their
/// positions. Edge adjacency is maintained incrementally as faces are added.
/// The bounding box is cached and recomputed lazily after any position change.
///
/// `Mesh` is `Send` but not `Sync`: the bounds cache uses `Cell`, so a shared
/// `&Mesh` cannot cross threads. Wrap it in a lock if concurrent access is
/// needed.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    faces: Vec<Face>,
    edge_index: HashMap<(VertexId, VertexId), EdgeId>,
    bounds: Cell<BoundingBox>,
    bounds_dirty: Cell<bool>,
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
            edge_index: HashMap::new(),
            bounds: Cell::new(BoundingBox::empty()),
            bounds_dirty: Cell::new(true),
        }
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- vertices -------------------------------------------------------

    /// Append a vertex; its `id` field is overwritten with the new id.
    pub fn add_vertex_record(&mut self, mut vertex: Vertex) -> VertexId {
        let id = self.vertices.len() as VertexId;
        vertex.id = id;
        self.vertices.push(vertex);
        self.bounds_dirty.set(true);
        id
    }

    pub fn add_vertex(&mut self, position: Vector3) -> VertexId {
        self.add_vertex_record(Vertex::new(position))
    }

    pub fn add_vertex_with_normal(&mut self, position: Vector3, normal: Vector3) -> VertexId {
        self.add_vertex_record(Vertex::with_normal(position, normal))
    }

    pub fn add_vertex_with_attributes(
        &mut self,
        position: Vector3,
        normal: Vector3,
        uv: Vector2,
    ) -> VertexId {
        self.add_vertex_record(Vertex::with_attributes(position, normal, uv))
    }

    // ---- faces ----------------------------------------------------------

    /// Append a face and link its edges.
    ///
    /// Fails with `InvalidArgument` for fewer than 3 indices or a repeated
    /// index, and with `OutOfRange` for an unknown vertex. A failed call
    /// leaves the mesh untouched.
    pub fn add_face(&mut self, vertex_indices: &[VertexId]) -> Result<FaceId> {
        self.add_face_with_material(vertex_indices, None)
    }

    pub fn add_face_with_material(
        &mut self,
        vertex_indices: &[VertexId],
        material_id: Option<MaterialId>,
    ) -> Result<FaceId> {
        self.check_face(vertex_indices)?;

        let id = self.faces.len() as FaceId;
        self.faces.push(Face {
            vertices: vertex_indices.to_vec(),
            normal: Vector3::ZERO,
            material_id,
            id,
        });
        self.link_edges(id);
        Ok(id)
    }

    pub fn add_triangle(&mut self, a: VertexId, b: VertexId, c: VertexId) -> Result<FaceId> {
        self.add_face(&[a, b, c])
    }

    pub fn add_quad(
        &mut self,
        a: VertexId,
        b: VertexId,
        c: VertexId,
        d: VertexId,
    ) -> Result<FaceId> {
        self.add_face(&[a, b, c, d])
    }

    fn check_face(&self, indices: &[VertexId]) -> Result<()> {
        if indices.len() < 3 {
            return Err(MeshError::InvalidArgument(format!(
                "face must have at least 3 vertices, got {}",
                indices.len()
            )));
        }
        if let Some(&bad) = indices
            .iter()
            .find(|&&vid| vid as usize >= self.vertices.len())
        {
            return Err(MeshError::out_of_range("vertex", bad, self.vertices.len()));
        }
        for (i, vid) in indices.iter().enumerate() {
            if indices[i + 1..].contains(vid) {
                return Err(MeshError::InvalidArgument(format!(
                    "vertex {vid} appears more than once in face"
                )));
            }
        }
        Ok(())
    }

    /// Register every side of `face_id` in the edge index.
    fn link_edges(&mut self, face_id: FaceId) {
        let face = &self.faces[face_id as usize];
        for pair in face.edges() {
            match self.edge_index.entry(pair) {
                Entry::Occupied(slot) => {
                    self.edges[*slot.get() as usize].attach_face(face_id);
                }
                Entry::Vacant(slot) => {
                    let edge_id = self.edges.len() as EdgeId;
                    self.edges.push(Edge::new(pair, edge_id, face_id));
                    slot.insert(edge_id);
                }
            }
        }
    }

    // ---- access ---------------------------------------------------------

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.faces.is_empty()
    }

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        self.vertices
            .get(id as usize)
            .ok_or_else(|| MeshError::out_of_range("vertex", id, self.vertices.len()))
    }

    /// Mutable vertex access. Marks the cached bounds dirty.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        let count = self.vertices.len();
        let vertex = self
            .vertices
            .get_mut(id as usize)
            .ok_or_else(|| MeshError::out_of_range("vertex", id, count))?;
        self.bounds_dirty.set(true);
        Ok(vertex)
    }

    pub fn face(&self, id: FaceId) -> Result<&Face> {
        self.faces
            .get(id as usize)
            .ok_or_else(|| MeshError::out_of_range("face", id, self.faces.len()))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges
            .get(id as usize)
            .ok_or_else(|| MeshError::out_of_range("edge", id, self.edges.len()))
    }

    /// Look up the edge joining `a` and `b`, in either order.
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<&Edge> {
        self.edge_index
            .get(&canonical_pair(a, b))
            .map(|&id| &self.edges[id as usize])
    }

    pub fn set_vertex_position(&mut self, id: VertexId, position: Vector3) -> Result<()> {
        self.vertex_mut(id)?.position = position;
        Ok(())
    }

    pub fn set_face_material(&mut self, id: FaceId, material_id: Option<MaterialId>) -> Result<()> {
        let count = self.faces.len();
        let face = self
            .faces
            .get_mut(id as usize)
            .ok_or_else(|| MeshError::out_of_range("face", id, count))?;
        face.material_id = material_id;
        Ok(())
    }

    /// Whether any vertex carries a normal.
    pub fn has_normals(&self) -> bool {
        self.vertices.iter().any(Vertex::has_normal)
    }

    /// Whether any vertex carries a texture coordinate.
    pub fn has_uvs(&self) -> bool {
        self.vertices.iter().any(Vertex::has_uv)
    }

    pub fn reserve_vertices(&mut self, additional: usize) {
        self.vertices.reserve(additional);
    }

    pub fn reserve_faces(&mut self, additional: usize) {
        self.faces.reserve(additional);
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.faces.clear();
        self.edge_index.clear();
        self.bounds_dirty.set(true);
    }

    // ---- derived geometry -----------------------------------------------

    /// Newell normal for every face.
    pub fn compute_face_normals(&mut self) {
        let vertices = &self.vertices;
        for face in &mut self.faces {
            face.normal = newell_normal(vertices, &face.vertices);
        }
    }

    /// Average of adjacent face normals for every vertex. Vertices touched
    /// only by degenerate faces keep the zero normal.
    pub fn compute_vertex_normals(&mut self) {
        for vertex in &mut self.vertices {
            vertex.normal = Vector3::ZERO;
        }

        for face in &self.faces {
            if !face.has_normal() {
                continue;
            }
            for &vid in &face.vertices {
                self.vertices[vid as usize].normal += face.normal;
            }
        }

        for vertex in &mut self.vertices {
            vertex.normal = vertex.normal.normalize_or_zero();
        }
    }

    /// Face normals, then vertex normals.
    pub fn compute_normals(&mut self) {
        self.compute_face_normals();
        self.compute_vertex_normals();
    }

    /// Cached axis-aligned bounds of all vertex positions.
    pub fn bounding_box(&self) -> BoundingBox {
        if self.bounds_dirty.get() {
            let bb = BoundingBox::from_points(self.vertices.iter().map(|v| v.position));
            trace!(vertices = self.vertices.len(), "Recomputed bounding box");
            self.bounds.set(bb);
            self.bounds_dirty.set(false);
        }
        self.bounds.get()
    }

    /// Sum of face areas, fan-triangulating polygons from their first vertex.
    pub fn surface_area(&self) -> Real {
        self.faces
            .iter()
            .map(|f| polygon_area(&self.vertices, &f.vertices))
            .sum()
    }

    /// Enclosed volume by the divergence theorem. Only meaningful for closed
    /// meshes; closedness is not checked.
    pub fn volume(&self) -> Real {
        let signed: Real = self
            .faces
            .iter()
            .flat_map(|f| fan_triangles(&self.vertices, &f.vertices))
            .map(|(a, b, c)| a.dot(b.cross(c)))
            .sum();
        signed.abs() / 6.0
    }

    /// Structural health check. Returns false on duplicate vertex positions,
    /// faces with fewer than 3 or repeated vertices, and non-manifold edges.
    pub fn validate_topology(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.vertices.len());
        for vertex in &self.vertices {
            let p = vertex.position;
            if p.is_nan() {
                continue;
            }
            // adding +0.0 folds -0.0 onto 0.0
            let key = [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), (p.z + 0.0).to_bits()];
            if !seen.insert(key) {
                debug!(vertex = vertex.id, "Duplicate vertex position");
                return false;
            }
        }

        for face in &self.faces {
            if !face.is_valid() {
                debug!(face = face.id, "Face has fewer than 3 vertices");
                return false;
            }
            let mut unique = HashSet::with_capacity(face.vertex_count());
            if !face.vertices.iter().all(|v| unique.insert(*v)) {
                debug!(face = face.id, "Face repeats a vertex");
                return false;
            }
        }

        if let Some(edge) = self.edges.iter().find(|e| !e.is_manifold()) {
            debug!(
                edge = edge.id,
                faces = edge.adjacent_faces.len(),
                "Non-manifold edge"
            );
            return false;
        }

        true
    }

    /// Apply an affine (or projective) transform to every position.
    /// Normals go through the inverse-transpose and are renormalised.
    pub fn transform(&mut self, matrix: &Matrix4) {
        let normal_matrix = if matrix.determinant().abs() > EPSILON {
            matrix.inverse().transpose()
        } else {
            *matrix
        };

        for vertex in &mut self.vertices {
            vertex.position = math::transform_point(matrix, vertex.position);
            if vertex.has_normal() {
                vertex.normal =
                    math::transform_vector(&normal_matrix, vertex.normal).normalize_or_zero();
            }
        }
        for face in &mut self.faces {
            if face.has_normal() {
                face.normal =
                    math::transform_vector(&normal_matrix, face.normal).normalize_or_zero();
            }
        }
        self.bounds_dirty.set(true);
    }
}

/// Newell's method: robust for non-planar and non-triangular polygons.
fn newell_normal(vertices: &[Vertex], indices: &[VertexId]) -> Vector3 {
    let k = indices.len();
    if k < 3 {
        return Vector3::ZERO;
    }

    let mut normal = Vector3::ZERO;
    for i in 0..k {
        let a = vertices[indices[i] as usize].position;
        let b = vertices[indices[(i + 1) % k] as usize].position;
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal.normalize_or_zero()
}

/// Fan triangles `(v0, vi, vi+1)` of a polygon.
pub(crate) fn fan_triangles<'a>(
    vertices: &'a [Vertex],
    indices: &'a [VertexId],
) -> impl Iterator<Item = (Vector3, Vector3, Vector3)> + 'a {
    let at = move |i: usize| vertices[indices[i] as usize].position;
    (1..indices.len().saturating_sub(1)).map(move |i| (at(0), at(i), at(i + 1)))
}

pub(crate) fn polygon_area(vertices: &[Vertex], indices: &[VertexId]) -> Real {
    fan_triangles(vertices, indices)
        .map(|(a, b, c)| 0.5 * (b - a).cross(c - a).length())
        .sum()
}
