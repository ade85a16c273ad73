//! Primitive mesh generators.
//!
//! Every generator builds its mesh through the public [`Mesh`] API only.
//! Closed shapes are wound counter-clockwise seen from outside, so computed
//! face normals point away from the interior. Flat shapes face `+Y`.

use std::f64::consts::{PI, TAU};

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::math::{Real, Vector2, Vector3};
use crate::types::{Mesh, VertexId};

fn check_extent(name: &str, value: Real) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidArgument(format!(
            "{name} must be a positive finite number, got {value}"
        )))
    }
}

/// Equilateral triangle with edge length `size` in the XZ plane, centred on
/// its centroid.
pub fn triangle(size: Real) -> Result<Mesh> {
    check_extent("size", size)?;

    let half = size * 0.5;
    let height = size * 3.0_f64.sqrt() * 0.5;

    let mut mesh = Mesh::new();
    let a = mesh.add_vertex(Vector3::new(-half, 0.0, -height / 3.0));
    let b = mesh.add_vertex(Vector3::new(half, 0.0, -height / 3.0));
    let c = mesh.add_vertex(Vector3::new(0.0, 0.0, height * 2.0 / 3.0));
    mesh.add_triangle(a, c, b)?;
    Ok(mesh)
}

/// `width` x `height` rectangle in the XZ plane, split into two triangles.
pub fn quad(width: Real, height: Real) -> Result<Mesh> {
    check_extent("width", width)?;
    check_extent("height", height)?;

    let hw = width * 0.5;
    let hh = height * 0.5;

    let mut mesh = Mesh::new();
    let a = mesh.add_vertex(Vector3::new(-hw, 0.0, -hh));
    let b = mesh.add_vertex(Vector3::new(hw, 0.0, -hh));
    let c = mesh.add_vertex(Vector3::new(hw, 0.0, hh));
    let d = mesh.add_vertex(Vector3::new(-hw, 0.0, hh));
    mesh.add_triangle(a, c, b)?;
    mesh.add_triangle(a, d, c)?;
    Ok(mesh)
}

/// Axis-aligned cube of edge length `size` centred on the origin:
/// 8 vertices, 12 triangles.
pub fn cube(size: Real) -> Result<Mesh> {
    check_extent("size", size)?;

    let h = size * 0.5;
    let mut mesh = Mesh::new();
    mesh.reserve_vertices(8);
    mesh.reserve_faces(12);

    let v: Vec<VertexId> = [
        (-h, -h, -h),
        (h, -h, -h),
        (h, h, -h),
        (-h, h, -h),
        (-h, -h, h),
        (h, -h, h),
        (h, h, h),
        (-h, h, h),
    ]
    .into_iter()
    .map(|(x, y, z)| mesh.add_vertex(Vector3::new(x, y, z)))
    .collect();

    const TRIANGLES: [[usize; 3]; 12] = [
        // -Z
        [0, 2, 1],
        [0, 3, 2],
        // +Z
        [4, 5, 6],
        [4, 6, 7],
        // -X
        [0, 4, 7],
        [0, 7, 3],
        // +X
        [1, 2, 6],
        [1, 6, 5],
        // -Y
        [0, 1, 5],
        [0, 5, 4],
        // +Y
        [3, 7, 6],
        [3, 6, 2],
    ];
    for [a, b, c] in TRIANGLES {
        mesh.add_triangle(v[a], v[b], v[c])?;
    }
    Ok(mesh)
}

/// Regular tetrahedron with edge length `size`, base on `y = 0` centred on
/// the origin and apex on `+Y`.
pub fn tetrahedron(size: Real) -> Result<Mesh> {
    check_extent("size", size)?;

    let sqrt3 = 3.0_f64.sqrt();
    let height = size * (2.0_f64 / 3.0).sqrt();

    let mut mesh = Mesh::new();
    let a = mesh.add_vertex(Vector3::new(-size * 0.5, 0.0, -size / (2.0 * sqrt3)));
    let b = mesh.add_vertex(Vector3::new(size * 0.5, 0.0, -size / (2.0 * sqrt3)));
    let c = mesh.add_vertex(Vector3::new(0.0, 0.0, size / sqrt3));
    let apex = mesh.add_vertex(Vector3::new(0.0, height, 0.0));

    mesh.add_triangle(a, b, c)?;
    mesh.add_triangle(b, a, apex)?;
    mesh.add_triangle(c, b, apex)?;
    mesh.add_triangle(a, c, apex)?;
    Ok(mesh)
}

/// Square-based pyramid: base of side `base_size` on `y = 0`, apex at
/// `(0, height, 0)`.
pub fn pyramid(base_size: Real, height: Real) -> Result<Mesh> {
    check_extent("base size", base_size)?;
    check_extent("height", height)?;

    let h = base_size * 0.5;
    let mut mesh = Mesh::new();
    let a = mesh.add_vertex(Vector3::new(-h, 0.0, -h));
    let b = mesh.add_vertex(Vector3::new(h, 0.0, -h));
    let c = mesh.add_vertex(Vector3::new(h, 0.0, h));
    let d = mesh.add_vertex(Vector3::new(-h, 0.0, h));
    let apex = mesh.add_vertex(Vector3::new(0.0, height, 0.0));

    mesh.add_triangle(a, b, c)?;
    mesh.add_triangle(a, c, d)?;
    mesh.add_triangle(a, apex, b)?;
    mesh.add_triangle(b, apex, c)?;
    mesh.add_triangle(c, apex, d)?;
    mesh.add_triangle(d, apex, a)?;
    Ok(mesh)
}

/// Subdivided plane in XZ centred on the origin, built from quads.
///
/// Vertices carry a `+Y` normal and a UV in `[0, 1]²`. The corner at
/// `(-width/2, -depth/2)` has UV `(0, 0)`, which reads back as "no UV".
pub fn plane(width: Real, depth: Real, segments_x: u32, segments_z: u32) -> Result<Mesh> {
    check_extent("width", width)?;
    check_extent("depth", depth)?;
    if segments_x == 0 || segments_z == 0 {
        return Err(MeshError::InvalidArgument(
            "plane needs at least one segment along each axis".into(),
        ));
    }

    let cols = segments_x + 1;
    let rows = segments_z + 1;
    let mut mesh = Mesh::new();
    mesh.reserve_vertices((cols * rows) as usize);
    mesh.reserve_faces((segments_x * segments_z) as usize);

    for i in 0..cols {
        for j in 0..rows {
            let u = Real::from(i) / Real::from(segments_x);
            let v = Real::from(j) / Real::from(segments_z);
            mesh.add_vertex_with_attributes(
                Vector3::new((u - 0.5) * width, 0.0, (v - 0.5) * depth),
                Vector3::Y,
                Vector2::new(u, v),
            );
        }
    }

    let at = |i: u32, j: u32| -> VertexId { i * rows + j };
    for i in 0..segments_x {
        for j in 0..segments_z {
            mesh.add_quad(at(i, j), at(i, j + 1), at(i + 1, j + 1), at(i + 1, j))?;
        }
    }

    debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Generated plane"
    );
    Ok(mesh)
}

/// Latitude/longitude sphere centred on the origin.
///
/// `segments` meridians (at least 3) and `rings` latitude bands (at least 2).
/// The poles are single vertices joined by triangle fans; the bands between
/// are quads. Vertex normals point radially outward.
pub fn uv_sphere(radius: Real, segments: u32, rings: u32) -> Result<Mesh> {
    check_extent("radius", radius)?;
    if segments < 3 || rings < 2 {
        return Err(MeshError::InvalidArgument(format!(
            "sphere needs at least 3 segments and 2 rings, got {segments} and {rings}"
        )));
    }

    let mut mesh = Mesh::new();
    mesh.reserve_vertices((2 + (rings - 1) * segments) as usize);
    mesh.reserve_faces((segments * rings) as usize);

    let top = mesh.add_vertex_with_normal(Vector3::new(0.0, radius, 0.0), Vector3::Y);
    for k in 1..rings {
        let theta = PI * Real::from(k) / Real::from(rings);
        let (sin_t, cos_t) = theta.sin_cos();
        for s in 0..segments {
            let phi = TAU * Real::from(s) / Real::from(segments);
            let (sin_p, cos_p) = phi.sin_cos();
            let n = Vector3::new(sin_t * cos_p, cos_t, sin_t * sin_p);
            mesh.add_vertex_with_normal(n * radius, n);
        }
    }
    let bottom = mesh.add_vertex_with_normal(Vector3::new(0.0, -radius, 0.0), Vector3::NEG_Y);

    // ring index k is 0-based here: 0 is the band just below the top pole
    let ring = |k: u32, s: u32| -> VertexId { 1 + k * segments + s % segments };

    for s in 0..segments {
        mesh.add_triangle(top, ring(0, s + 1), ring(0, s))?;
    }
    for k in 0..rings - 2 {
        for s in 0..segments {
            mesh.add_quad(ring(k, s), ring(k, s + 1), ring(k + 1, s + 1), ring(k + 1, s))?;
        }
    }
    let last = rings - 2;
    for s in 0..segments {
        mesh.add_triangle(bottom, ring(last, s), ring(last, s + 1))?;
    }

    debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Generated UV sphere"
    );
    Ok(mesh)
}
