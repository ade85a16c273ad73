//! Wavefront OBJ reading and writing.
//!
//! Every `v` line becomes one vertex, numbered in file order, whether or not
//! a face uses it. Faces keep their original arity and every `o`/`g` group is
//! merged into one mesh. `vt`/`vn` references are copied onto the vertex the
//! face corner names; when a vertex is referenced with different attributes
//! the first one wins. `usemtl` names are resolved through the `mtllib`
//! libraries (parsed with `tobj`) and stored on each face.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{MeshError, Result};
use crate::math::{Real, Vector2, Vector3};
use crate::types::{MaterialId, Mesh, VertexId};

/// One `v/vt/vn` reference of an `f` line, as 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Corner {
    v: usize,
    vt: Option<usize>,
    vn: Option<usize>,
}

#[derive(Debug)]
struct RawFace {
    corners: Vec<Corner>,
    material: Option<MaterialId>,
    line: usize,
}

/// Ordered contents of an OBJ file before it becomes a [`Mesh`].
#[derive(Debug, Default)]
struct RawObj {
    positions: Vec<Vector3>,
    texcoords: Vec<Vector2>,
    normals: Vec<Vector3>,
    faces: Vec<RawFace>,
}

/// `usemtl` name lookup built from every `mtllib` seen so far.
#[derive(Debug, Default)]
struct MaterialLibrary {
    ids: HashMap<String, MaterialId>,
    count: usize,
}

impl MaterialLibrary {
    fn load(&mut self, path: &Path) {
        match tobj::load_mtl(path) {
            Ok((materials, names)) => {
                for (name, index) in names {
                    if let Ok(id) = MaterialId::try_from(self.count + index) {
                        self.ids.insert(name, id);
                    }
                }
                self.count += materials.len();
                debug!(path = %path.display(), count = materials.len(), "Loaded material library");
            }
            Err(e) => debug!(path = %path.display(), "No material library: {e}"),
        }
    }

    fn resolve(&self, name: &str) -> Option<MaterialId> {
        let id = self.ids.get(name).copied();
        if id.is_none() {
            debug!(material = name, "Unknown material");
        }
        id
    }
}

/// Load an OBJ file into a [`Mesh`].
pub fn load_obj(path: &Path) -> Result<Mesh> {
    let file = File::open(path)
        .map_err(|e| MeshError::Input(format!("Failed to open OBJ {}: {e}", path.display())))?;
    let mesh = read_obj(BufReader::new(file), path.parent())?;
    debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "Loaded OBJ"
    );
    Ok(mesh)
}

/// Parse OBJ text into a [`Mesh`].
///
/// `mtllib` paths are resolved against `material_dir`; with `None` material
/// libraries are skipped and faces carry no material.
pub fn read_obj<R: BufRead>(reader: R, material_dir: Option<&Path>) -> Result<Mesh> {
    let raw = parse_obj(reader, material_dir)?;
    build_mesh(&raw)
}

fn parse_obj<R: BufRead>(reader: R, material_dir: Option<&Path>) -> Result<RawObj> {
    let mut raw = RawObj::default();
    let mut library = MaterialLibrary::default();
    let mut material = None;

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = n + 1;
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => raw.positions.push(parse_vec3(&mut parts, line_no)?),
            "vn" => raw.normals.push(parse_vec3(&mut parts, line_no)?),
            "vt" => {
                let u = parse_real(parts.next(), line_no)?;
                let v = match parts.next() {
                    Some(token) => parse_real(Some(token), line_no)?,
                    None => 0.0,
                };
                raw.texcoords.push(Vector2::new(u, v));
            }
            "f" => {
                let corners = parts
                    .map(|token| parse_corner(token, &raw, line_no))
                    .collect::<Result<Vec<_>>>()?;
                raw.faces.push(RawFace {
                    corners,
                    material,
                    line: line_no,
                });
            }
            "mtllib" => {
                if let Some(dir) = material_dir {
                    for name in parts {
                        library.load(&dir.join(name));
                    }
                }
            }
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                material = library.resolve(&name);
            }
            // comments, groups, smoothing, points and lines
            _ => {}
        }
    }
    Ok(raw)
}

fn parse_real(token: Option<&str>, line: usize) -> Result<Real> {
    let token =
        token.ok_or_else(|| MeshError::Input(format!("OBJ line {line}: missing coordinate")))?;
    token
        .parse()
        .map_err(|_| MeshError::Input(format!("OBJ line {line}: invalid number '{token}'")))
}

fn parse_vec3<'a>(parts: &mut impl Iterator<Item = &'a str>, line: usize) -> Result<Vector3> {
    let x = parse_real(parts.next(), line)?;
    let y = parse_real(parts.next(), line)?;
    let z = parse_real(parts.next(), line)?;
    Ok(Vector3::new(x, y, z))
}

/// Resolve a 1-based or negative (relative) OBJ index against `count`
/// elements defined so far.
fn parse_index(token: &str, count: usize, line: usize) -> Result<usize> {
    let index: i64 = token
        .parse()
        .map_err(|_| MeshError::Input(format!("OBJ line {line}: invalid index '{token}'")))?;
    let resolved = match index {
        0 => None,
        i if i > 0 => usize::try_from(i - 1).ok(),
        i => usize::try_from(i.unsigned_abs())
            .ok()
            .and_then(|back| count.checked_sub(back)),
    };
    resolved.ok_or_else(|| MeshError::Input(format!("OBJ line {line}: invalid index {index}")))
}

fn parse_corner(token: &str, raw: &RawObj, line: usize) -> Result<Corner> {
    let mut fields = token.split('/');
    let v = parse_index(fields.next().unwrap_or_default(), raw.positions.len(), line)?;
    let mut optional = |count: usize| -> Result<Option<usize>> {
        match fields.next() {
            Some(field) if !field.is_empty() => parse_index(field, count, line).map(Some),
            _ => Ok(None),
        }
    };
    let vt = optional(raw.texcoords.len())?;
    let vn = optional(raw.normals.len())?;
    Ok(Corner { v, vt, vn })
}

/// Copy the attribute each corner references onto its vertex, first
/// reference wins. Returns how many later references disagreed.
fn gather_attributes<T: Copy + PartialEq>(
    raw: &RawObj,
    slots: &mut [Option<T>],
    values: &[T],
    pick: impl Fn(&Corner) -> Option<usize>,
    kind: &str,
) -> Result<usize> {
    let mut conflicts = 0;
    for face in &raw.faces {
        for corner in &face.corners {
            let Some(index) = pick(corner) else {
                continue;
            };
            let value = *values.get(index).ok_or_else(|| {
                MeshError::Input(format!(
                    "OBJ line {}: {kind} index {} out of range ({} defined)",
                    face.line,
                    index + 1,
                    values.len()
                ))
            })?;
            // out-of-range positions are reported when the face is added
            let Some(slot) = slots.get_mut(corner.v) else {
                continue;
            };
            match *slot {
                None => *slot = Some(value),
                Some(existing) if existing != value => conflicts += 1,
                Some(_) => {}
            }
        }
    }
    Ok(conflicts)
}

fn build_mesh(raw: &RawObj) -> Result<Mesh> {
    let count = raw.positions.len();
    let mut uvs: Vec<Option<Vector2>> = vec![None; count];
    let mut normals: Vec<Option<Vector3>> = vec![None; count];
    let conflicts = gather_attributes(raw, &mut uvs, &raw.texcoords, |c| c.vt, "texture")?
        + gather_attributes(raw, &mut normals, &raw.normals, |c| c.vn, "normal")?;
    if conflicts > 0 {
        warn!(conflicts, "OBJ vertices referenced with differing vt/vn; kept the first");
    }

    let mut mesh = Mesh::new();
    mesh.reserve_vertices(count);
    mesh.reserve_faces(raw.faces.len());
    for ((&position, uv), normal) in raw.positions.iter().zip(uvs).zip(normals) {
        mesh.add_vertex_with_attributes(
            position,
            normal.unwrap_or(Vector3::ZERO),
            uv.unwrap_or(Vector2::ZERO),
        );
    }

    let mut indices: Vec<VertexId> = Vec::new();
    for face in &raw.faces {
        if face.corners.len() < 3 {
            warn!(
                line = face.line,
                arity = face.corners.len(),
                "Skipping OBJ face with fewer than 3 vertices"
            );
            continue;
        }
        indices.clear();
        for corner in &face.corners {
            let id = VertexId::try_from(corner.v).map_err(|_| {
                MeshError::Input(format!(
                    "OBJ line {}: index {} too large",
                    face.line,
                    corner.v + 1
                ))
            })?;
            indices.push(id);
        }
        mesh.add_face_with_material(&indices, face.material)
            .map_err(|e| MeshError::Input(format!("OBJ line {}: {e}", face.line)))?;
    }
    Ok(mesh)
}

/// Save a mesh as OBJ.
pub fn save_obj(path: &Path, mesh: &Mesh) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        MeshError::Output(format!("Failed to create {}: {e}", path.display()))
    })?;
    let mut writer = BufWriter::new(file);
    write_obj(&mut writer, mesh)
        .map_err(|e| MeshError::Output(format!("Failed to write {}: {e}", path.display())))
}

/// Serialise `mesh` as OBJ text.
///
/// A `vt` block is written when any vertex has a UV and a `vn` block when any
/// vertex has a normal; both are indexed like the `v` block, so face
/// references are `i`, `i/i`, `i//i` or `i/i/i`.
pub fn write_obj<W: Write>(writer: &mut W, mesh: &Mesh) -> io::Result<()> {
    let has_uvs = mesh.has_uvs();
    let has_normals = mesh.has_normals();

    writeln!(writer, "# meshkit OBJ export")?;
    writeln!(
        writer,
        "# {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.face_count()
    )?;

    for v in mesh.vertices() {
        let p = v.position;
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    if has_uvs {
        for v in mesh.vertices() {
            writeln!(writer, "vt {} {}", v.uv.x, v.uv.y)?;
        }
    }
    if has_normals {
        for v in mesh.vertices() {
            let n = v.normal;
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }

    for face in mesh.faces() {
        write!(writer, "f")?;
        for &vid in &face.vertices {
            let i = vid + 1;
            match (has_uvs, has_normals) {
                (false, false) => write!(writer, " {i}")?,
                (true, false) => write!(writer, " {i}/{i}")?,
                (false, true) => write!(writer, " {i}//{i}")?,
                (true, true) => write!(writer, " {i}/{i}/{i}")?,
            }
        }
        writeln!(writer)?;
    }

    writer.flush()
}
