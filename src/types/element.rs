use crate::math::{EPSILON, NearZero, Vector2, Vector3};

pub type VertexId = u32;
pub type EdgeId = u32;
pub type FaceId = u32;
pub type MaterialId = u32;

/// A mesh vertex. Normal and UV use the zero vector to mean "unset".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub uv: Vector2,
    pub id: VertexId,
}

impl Vertex {
    pub fn new(position: Vector3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_normal(position: Vector3, normal: Vector3) -> Self {
        Self {
            position,
            normal,
            ..Default::default()
        }
    }

    pub fn with_attributes(position: Vector3, normal: Vector3, uv: Vector2) -> Self {
        Self {
            position,
            normal,
            uv,
            id: 0,
        }
    }

    pub fn has_normal(&self) -> bool {
        !self.normal.is_near_zero(EPSILON)
    }

    pub fn has_uv(&self) -> bool {
        !self.uv.is_near_zero(EPSILON)
    }
}

/// An undirected edge shared by one or more faces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Smaller vertex id.
    pub v1: VertexId,
    /// Larger vertex id.
    pub v2: VertexId,
    /// Faces using this edge, in insertion order.
    pub adjacent_faces: Vec<FaceId>,
    pub id: EdgeId,
    /// True iff exactly one face uses this edge.
    pub is_boundary: bool,
}

impl Edge {
    pub(crate) fn new(pair: (VertexId, VertexId), id: EdgeId, face: FaceId) -> Self {
        let (v1, v2) = canonical_pair(pair.0, pair.1);
        Self {
            v1,
            v2,
            adjacent_faces: vec![face],
            id,
            is_boundary: true,
        }
    }

    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.v1 == vertex || self.v2 == vertex
    }

    /// The opposite endpoint, or `None` if `vertex` is not on this edge.
    pub fn other_vertex(&self, vertex: VertexId) -> Option<VertexId> {
        if self.v1 == vertex {
            Some(self.v2)
        } else if self.v2 == vertex {
            Some(self.v1)
        } else {
            None
        }
    }

    pub fn is_manifold(&self) -> bool {
        self.adjacent_faces.len() <= 2
    }

    pub(crate) fn attach_face(&mut self, face: FaceId) {
        self.adjacent_faces.push(face);
        self.is_boundary = self.adjacent_faces.len() == 1;
    }
}

/// A polygonal face; vertices are listed counter-clockwise.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Face {
    pub vertices: Vec<VertexId>,
    pub normal: Vector3,
    pub material_id: Option<MaterialId>,
    pub id: FaceId,
}

impl Face {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_triangle(&self) -> bool {
        self.vertices.len() == 3
    }

    pub fn is_quad(&self) -> bool {
        self.vertices.len() == 4
    }

    pub fn contains_vertex(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    pub fn is_valid(&self) -> bool {
        self.vertices.len() >= 3
    }

    pub fn has_normal(&self) -> bool {
        !self.normal.is_near_zero(EPSILON)
    }

    /// Canonical `(low, high)` vertex pairs of each side, in cyclic order.
    /// A k-gon yields exactly k pairs; fewer than 3 vertices yields none.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        let n = if self.is_valid() { self.vertices.len() } else { 0 };
        (0..n).map(move |i| canonical_pair(self.vertices[i], self.vertices[(i + 1) % n]))
    }
}

/// Order a vertex pair low-index-first.
pub fn canonical_pair(a: VertexId, b: VertexId) -> (VertexId, VertexId) {
    if a <= b { (a, b) } else { (b, a) }
}
