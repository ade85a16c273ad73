//! Stanford PLY reading and writing.
//!
//! Reading goes through `ply-rs` and accepts ASCII and both binary byte
//! orders, with any scalar type for vertex properties. ASCII output is also
//! produced by `ply-rs`; binary output is written directly because `ply-rs`
//! emits the element count instead of the list length for binary lists.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;
use tracing::{debug, warn};

use crate::config::{PlyEncoding, SaveOptions};
use crate::error::{MeshError, Result};
use crate::math::{Real, Vector2, Vector3};
use crate::types::{Mesh, VertexId};

const COMMENT: &str = "Generated by meshkit";

/// Load a PLY file into a [`Mesh`].
///
/// Vertex properties `x y z` are required; `nx ny nz` and `u v` (or `s t`)
/// are optional. Faces are read from `vertex_indices` or `vertex_index`.
/// Faces with fewer than 3 vertices are skipped; negative or out-of-range
/// indices are errors.
pub fn load_ply(path: &Path) -> Result<Mesh> {
    let file = File::open(path)
        .map_err(|e| MeshError::Input(format!("Failed to open PLY {}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| MeshError::Input(format!("Failed to parse PLY: {e}")))?;

    let vertices = ply
        .payload
        .get("vertex")
        .ok_or_else(|| MeshError::Input("PLY file missing 'vertex' element".into()))?;

    debug!(
        encoding = ?ply.header.encoding,
        vertex_count = vertices.len(),
        "Parsing PLY vertices"
    );

    let mut mesh = Mesh::new();
    mesh.reserve_vertices(vertices.len());
    for element in vertices {
        let position = Vector3::new(
            get_scalar(element, "x")?,
            get_scalar(element, "y")?,
            get_scalar(element, "z")?,
        );
        let normal = match (
            find_scalar(element, &["nx"]),
            find_scalar(element, &["ny"]),
            find_scalar(element, &["nz"]),
        ) {
            (Some(x), Some(y), Some(z)) => Vector3::new(x, y, z),
            _ => Vector3::ZERO,
        };
        let uv = match (find_scalar(element, &["u", "s"]), find_scalar(element, &["v", "t"])) {
            (Some(u), Some(v)) => Vector2::new(u, v),
            _ => Vector2::ZERO,
        };
        mesh.add_vertex_with_attributes(position, normal, uv);
    }

    if let Some(faces) = ply.payload.get("face") {
        debug!(face_count = faces.len(), "Parsing PLY faces");
        mesh.reserve_faces(faces.len());
        for (n, element) in faces.iter().enumerate() {
            let indices = get_index_list(element)
                .map_err(|e| MeshError::Input(format!("PLY face {n}: {e}")))?;
            if indices.len() < 3 {
                warn!(face = n, count = indices.len(), "Skipping PLY face with fewer than 3 vertices");
                continue;
            }
            mesh.add_face(&indices)
                .map_err(|e| MeshError::Input(format!("PLY face {n}: {e}")))?;
        }
    }

    Ok(mesh)
}

fn scalar_value(prop: &Property) -> Option<Real> {
    match prop {
        Property::Char(v) => Some(Real::from(*v)),
        Property::UChar(v) => Some(Real::from(*v)),
        Property::Short(v) => Some(Real::from(*v)),
        Property::UShort(v) => Some(Real::from(*v)),
        Property::Int(v) => Some(Real::from(*v)),
        Property::UInt(v) => Some(Real::from(*v)),
        Property::Float(v) => Some(Real::from(*v)),
        Property::Double(v) => Some(*v),
        _ => None,
    }
}

/// First present scalar among `keys`.
fn find_scalar(element: &DefaultElement, keys: &[&str]) -> Option<Real> {
    keys.iter()
        .find_map(|k| element.get(*k))
        .and_then(scalar_value)
}

fn get_scalar(element: &DefaultElement, key: &str) -> Result<Real> {
    let prop = element
        .get(key)
        .ok_or_else(|| MeshError::Input(format!("PLY vertex missing property '{key}'")))?;
    scalar_value(prop)
        .ok_or_else(|| MeshError::Input(format!("PLY property '{key}' is not a scalar")))
}

/// Extract the index list from a face element.
fn get_index_list(face: &DefaultElement) -> Result<Vec<VertexId>> {
    let prop = face
        .get("vertex_indices")
        .or_else(|| face.get("vertex_index"))
        .ok_or_else(|| MeshError::Input("missing vertex_indices property".into()))?;

    let signed: Vec<i64> = match prop {
        Property::ListChar(v) => v.iter().map(|&i| i64::from(i)).collect(),
        Property::ListUChar(v) => v.iter().map(|&i| i64::from(i)).collect(),
        Property::ListShort(v) => v.iter().map(|&i| i64::from(i)).collect(),
        Property::ListUShort(v) => v.iter().map(|&i| i64::from(i)).collect(),
        Property::ListInt(v) => v.iter().map(|&i| i64::from(i)).collect(),
        Property::ListUInt(v) => return Ok(v.clone()),
        _ => {
            return Err(MeshError::Input(
                "vertex_indices has unsupported type".into(),
            ));
        }
    };

    signed
        .into_iter()
        .map(|i| {
            VertexId::try_from(i)
                .map_err(|_| MeshError::Input(format!("negative vertex index {i}")))
        })
        .collect()
}

/// Save a mesh as PLY using the encoding and precision in `options`.
pub fn save_ply(path: &Path, mesh: &Mesh, options: &SaveOptions) -> Result<()> {
    if mesh.vertex_count() > i32::MAX as usize {
        return Err(MeshError::Output(format!(
            "{} vertices exceed the PLY int index range",
            mesh.vertex_count()
        )));
    }

    let file = File::create(path).map_err(|e| {
        MeshError::Output(format!("Failed to create {}: {e}", path.display()))
    })?;
    let mut writer = BufWriter::new(file);
    write_ply(&mut writer, mesh, options)
        .map_err(|e| MeshError::Output(format!("Failed to write {}: {e}", path.display())))
}

/// Serialise `mesh` as PLY into `writer`.
pub fn write_ply<W: Write>(writer: &mut W, mesh: &Mesh, options: &SaveOptions) -> io::Result<()> {
    let layout = Layout::of(mesh, options);
    match options.ply_encoding {
        PlyEncoding::Ascii => write_ascii(writer, mesh, &layout)?,
        PlyEncoding::BinaryLittleEndian => write_binary(writer, mesh, &layout, false)?,
        PlyEncoding::BinaryBigEndian => write_binary(writer, mesh, &layout, true)?,
    }
    writer.flush()
}

/// Which optional properties to emit and with which types.
struct Layout {
    normals: bool,
    uvs: bool,
    double: bool,
    /// Face list count as `uint` instead of `uchar`.
    wide_count: bool,
}

impl Layout {
    fn of(mesh: &Mesh, options: &SaveOptions) -> Self {
        Self {
            normals: mesh.has_normals(),
            uvs: mesh.has_uvs(),
            double: options.double_precision,
            wide_count: mesh.faces().iter().any(|f| f.vertex_count() > 255),
        }
    }

    fn position_type(&self) -> ScalarType {
        if self.double { ScalarType::Double } else { ScalarType::Float }
    }

    fn count_type(&self) -> ScalarType {
        if self.wide_count { ScalarType::UInt } else { ScalarType::UChar }
    }
}

fn scalar_def(name: &str, ty: ScalarType) -> PropertyDef {
    PropertyDef::new(name.to_string(), PropertyType::Scalar(ty))
}

fn write_ascii<W: Write>(writer: &mut W, mesh: &Mesh, layout: &Layout) -> io::Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header.comments.push(COMMENT.to_string());

    let mut vertex_def = ElementDef::new("vertex".to_string());
    for axis in ["x", "y", "z"] {
        vertex_def.properties.add(scalar_def(axis, layout.position_type()));
    }
    if layout.normals {
        for axis in ["nx", "ny", "nz"] {
            vertex_def.properties.add(scalar_def(axis, ScalarType::Float));
        }
    }
    if layout.uvs {
        vertex_def.properties.add(scalar_def("u", ScalarType::Float));
        vertex_def.properties.add(scalar_def("v", ScalarType::Float));
    }
    vertex_def.count = mesh.vertex_count();
    ply.header.elements.add(vertex_def);

    let mut face_def = ElementDef::new("face".to_string());
    face_def.properties.add(PropertyDef::new(
        "vertex_indices".to_string(),
        PropertyType::List(layout.count_type(), ScalarType::Int),
    ));
    face_def.count = mesh.face_count();
    ply.header.elements.add(face_def);

    let position = |v: Real| {
        if layout.double {
            Property::Double(v)
        } else {
            Property::Float(v as f32)
        }
    };

    let mut vertex_elements = Vec::with_capacity(mesh.vertex_count());
    for v in mesh.vertices() {
        let mut element = DefaultElement::new();
        element.insert("x".to_string(), position(v.position.x));
        element.insert("y".to_string(), position(v.position.y));
        element.insert("z".to_string(), position(v.position.z));
        if layout.normals {
            element.insert("nx".to_string(), Property::Float(v.normal.x as f32));
            element.insert("ny".to_string(), Property::Float(v.normal.y as f32));
            element.insert("nz".to_string(), Property::Float(v.normal.z as f32));
        }
        if layout.uvs {
            element.insert("u".to_string(), Property::Float(v.uv.x as f32));
            element.insert("v".to_string(), Property::Float(v.uv.y as f32));
        }
        vertex_elements.push(element);
    }
    ply.payload.insert("vertex".to_string(), vertex_elements);

    let mut face_elements = Vec::with_capacity(mesh.face_count());
    for face in mesh.faces() {
        let mut element = DefaultElement::new();
        let indices = face.vertices.iter().map(|&i| i as i32).collect();
        element.insert("vertex_indices".to_string(), Property::ListInt(indices));
        face_elements.push(element);
    }
    ply.payload.insert("face".to_string(), face_elements);

    Writer::new().write_ply(writer, &mut ply)?;
    Ok(())
}

/// Fixed-order binary sink.
struct BinarySink<'a, W: Write> {
    inner: &'a mut W,
    big_endian: bool,
}

macro_rules! put {
    ($name:ident, $ty:ty) => {
        fn $name(&mut self, value: $ty) -> io::Result<()> {
            if self.big_endian {
                self.inner.write_all(&value.to_be_bytes())
            } else {
                self.inner.write_all(&value.to_le_bytes())
            }
        }
    };
}

impl<W: Write> BinarySink<'_, W> {
    put!(put_u8, u8);
    put!(put_u32, u32);
    put!(put_i32, i32);
    put!(put_f32, f32);
    put!(put_f64, f64);
}

fn write_binary<W: Write>(
    writer: &mut W,
    mesh: &Mesh,
    layout: &Layout,
    big_endian: bool,
) -> io::Result<()> {
    let format = if big_endian { "binary_big_endian" } else { "binary_little_endian" };
    let position_type = if layout.double { "double" } else { "float" };
    let count_type = if layout.wide_count { "uint" } else { "uchar" };

    writeln!(writer, "ply")?;
    writeln!(writer, "format {format} 1.0")?;
    writeln!(writer, "comment {COMMENT}")?;
    writeln!(writer, "element vertex {}", mesh.vertex_count())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property {position_type} {axis}")?;
    }
    if layout.normals {
        for axis in ["nx", "ny", "nz"] {
            writeln!(writer, "property float {axis}")?;
        }
    }
    if layout.uvs {
        writeln!(writer, "property float u")?;
        writeln!(writer, "property float v")?;
    }
    writeln!(writer, "element face {}", mesh.face_count())?;
    writeln!(writer, "property list {count_type} int vertex_indices")?;
    writeln!(writer, "end_header")?;

    let mut sink = BinarySink {
        inner: writer,
        big_endian,
    };

    for v in mesh.vertices() {
        for c in v.position.to_array() {
            if layout.double {
                sink.put_f64(c)?;
            } else {
                sink.put_f32(c as f32)?;
            }
        }
        if layout.normals {
            for c in v.normal.to_array() {
                sink.put_f32(c as f32)?;
            }
        }
        if layout.uvs {
            sink.put_f32(v.uv.x as f32)?;
            sink.put_f32(v.uv.y as f32)?;
        }
    }

    for face in mesh.faces() {
        let count = face.vertex_count();
        if layout.wide_count {
            sink.put_u32(count as u32)?;
        } else {
            sink.put_u8(count as u8)?;
        }
        for &i in &face.vertices {
            sink.put_i32(i as i32)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_ply_file(content: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".ply").tempfile().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn options(ply_encoding: PlyEncoding, double_precision: bool) -> SaveOptions {
        SaveOptions {
            ply_encoding,
            double_precision,
        }
    }

    #[test]
    fn load_ascii_ply_basic() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0.0 0.0 0.0
1.0 0.0 0.0
0.0 1.0 0.0
3 0 1 2
",
        );
        let mesh = load_ply(file.path()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 3);
        assert!(!mesh.has_normals());
        assert!(!mesh.has_uvs());
    }

    #[test]
    fn polygons_are_kept() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
",
        );
        let mesh = load_ply(file.path()).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.face(0).unwrap().vertices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn normals_and_st_aliases() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element vertex 3
property double x
property double y
property double z
property float nx
property float ny
property float nz
property float s
property float t
element face 1
property list uchar uint vertex_index
end_header
0 0 0 0 0 1 0.5 0.25
1 0 0 0 0 1 1 0
0 1 0 0 0 1 0 1
3 0 1 2
",
        );
        let mesh = load_ply(file.path()).unwrap();
        assert!(mesh.has_normals());
        assert!(mesh.has_uvs());
        let v = mesh.vertex(0).unwrap();
        assert_eq!(v.normal, Vector3::Z);
        assert_eq!(v.uv, Vector2::new(0.5, 0.25));
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn integer_positions_are_accepted() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element vertex 3
property short x
property short y
property short z
element face 1
property list uchar ushort vertex_indices
end_header
-1 0 0
1 0 0
0 2 0
3 0 1 2
",
        );
        let mesh = load_ply(file.path()).unwrap();
        assert_eq!(mesh.bounding_box().min, Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(mesh.bounding_box().max, Vector3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn short_face_is_skipped() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 2
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
2 0 1
3 0 1 2
",
        );
        let mesh = load_ply(file.path()).unwrap();
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 1 7
",
        );
        let err = load_ply(file.path()).unwrap_err();
        assert!(matches!(err, MeshError::Input(_)));
        assert!(err.to_string().contains("face 0"));
    }

    #[test]
    fn negative_index_is_an_error() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
0 1 0
3 0 -1 2
",
        );
        let err = load_ply(file.path()).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn missing_vertex_element() {
        let file = write_ply_file(
            b"\
ply
format ascii 1.0
element point 1
property float x
end_header
0
",
        );
        let err = load_ply(file.path()).unwrap_err();
        assert!(err.to_string().contains("vertex"));
    }

    #[test]
    fn ascii_header_layout() {
        let mut mesh = generators::plane(1.0, 1.0, 1, 1).unwrap();
        mesh.compute_normals();
        let mut out = Vec::new();
        write_ply(&mut out, &mesh, &options(PlyEncoding::Ascii, false)).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("comment Generated by meshkit"));
        assert!(text.contains("element vertex 4"));
        assert!(text.contains("property float x"));
        assert!(text.contains("property float nx"));
        assert!(text.contains("property float u"));
        assert!(text.contains("property list uchar int vertex_indices"));
    }

    #[test]
    fn binary_header_and_size() {
        let mesh = generators::triangle(1.0).unwrap();
        let mut out = Vec::new();
        write_ply(&mut out, &mesh, &options(PlyEncoding::BinaryLittleEndian, false)).unwrap();

        let header_end = b"end_header\n";
        let pos = out
            .windows(header_end.len())
            .position(|w| w == header_end)
            .unwrap()
            + header_end.len();
        let header = std::str::from_utf8(&out[..pos]).unwrap();
        assert!(header.contains("format binary_little_endian 1.0"));
        assert!(!header.contains("property float nx"));
        // 3 vertices * 3 floats + one face (1 count byte + 3 ints)
        assert_eq!(out.len() - pos, 3 * 3 * 4 + 1 + 3 * 4);
        // first face count byte, then first index little-endian
        let face = &out[pos + 36..];
        assert_eq!(face[0], 3);
        assert_eq!(&face[1..5], &0i32.to_le_bytes());
    }

    #[test]
    fn big_endian_bytes() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vector3::new(1.0, 0.0, 0.0));
        mesh.add_vertex(Vector3::new(0.0, 1.0, 0.0));
        mesh.add_vertex(Vector3::new(0.0, 0.0, 1.0));
        mesh.add_triangle(0, 1, 2).unwrap();

        let mut out = Vec::new();
        write_ply(&mut out, &mesh, &options(PlyEncoding::BinaryBigEndian, true)).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("format binary_big_endian 1.0"));
        assert!(text.contains("property double x"));

        let marker = b"end_header\n";
        let pos = out.windows(marker.len()).position(|w| w == marker).unwrap() + marker.len();
        assert_eq!(&out[pos..pos + 8], &1.0f64.to_be_bytes());
    }

    #[test]
    fn wide_faces_use_uint_count() {
        let mut mesh = Mesh::new();
        let n = 300;
        for i in 0..n {
            let a = std::f64::consts::TAU * i as f64 / n as f64;
            mesh.add_vertex(Vector3::new(a.cos(), a.sin(), 0.0));
        }
        let face: Vec<VertexId> = (0..n).collect();
        mesh.add_face(&face).unwrap();

        for encoding in [
            PlyEncoding::Ascii,
            PlyEncoding::BinaryLittleEndian,
            PlyEncoding::BinaryBigEndian,
        ] {
            let file = tempfile::Builder::new().suffix(".ply").tempfile().unwrap();
            save_ply(file.path(), &mesh, &options(encoding, false)).unwrap();
            let loaded = load_ply(file.path()).unwrap();
            assert_eq!(loaded.face(0).unwrap().vertex_count(), n as usize);
        }
    }

    #[test]
    fn round_trip_all_encodings() {
        let mut mesh = generators::uv_sphere(1.5, 12, 6).unwrap();
        mesh.compute_face_normals();

        for encoding in [
            PlyEncoding::Ascii,
            PlyEncoding::BinaryLittleEndian,
            PlyEncoding::BinaryBigEndian,
        ] {
            for double in [false, true] {
                let file = tempfile::Builder::new().suffix(".ply").tempfile().unwrap();
                save_ply(file.path(), &mesh, &options(encoding, double)).unwrap();
                let loaded = load_ply(file.path()).unwrap();

                assert_eq!(loaded.vertex_count(), mesh.vertex_count());
                assert_eq!(loaded.face_count(), mesh.face_count());
                assert_eq!(loaded.edge_count(), mesh.edge_count());
                assert!(loaded.has_normals());

                let (a, b) = (loaded.bounding_box(), mesh.bounding_box());
                let tol = if double { 0.0 } else { 1e-6 };
                assert!((a.min - b.min).abs().max_element() <= tol);
                assert!((a.max - b.max).abs().max_element() <= tol);
            }
        }
    }

    #[test]
    fn save_to_bad_path_is_output_error() {
        let mesh = generators::triangle(1.0).unwrap();
        let err = save_ply(
            Path::new("/nonexistent/dir/out.ply"),
            &mesh,
            &SaveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::Output(_)));
    }
}
