pub mod obj;
pub mod ply;

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use crate::config::SaveOptions;
use crate::error::{MeshError, Result};
use crate::types::Mesh;

/// Mesh file formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Obj,
    Ply,
    Stl,
    Off,
}

/// Static description of a file format and what it can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub extensions: &'static [&'static str],
    pub supports_colors: bool,
    pub supports_normals: bool,
    pub supports_uvs: bool,
    pub supports_materials: bool,
    pub ascii: bool,
    pub binary: bool,
    /// Whether this crate can read and write it.
    pub implemented: bool,
}

impl FileFormat {
    /// Detect format from file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "obj" => Ok(FileFormat::Obj),
            "ply" => Ok(FileFormat::Ply),
            "stl" => Ok(FileFormat::Stl),
            "off" => Ok(FileFormat::Off),
            _ => Err(MeshError::UnsupportedFormat(format!(
                "{} (unknown extension .{ext})",
                path.display()
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Obj => "OBJ",
            FileFormat::Ply => "PLY",
            FileFormat::Stl => "STL",
            FileFormat::Off => "OFF",
        }
    }

    pub fn info(&self) -> FormatInfo {
        match self {
            FileFormat::Obj => FormatInfo {
                name: "Wavefront OBJ",
                description: "Widely supported text mesh format with material groups",
                extensions: &["obj"],
                supports_colors: false,
                supports_normals: true,
                supports_uvs: true,
                supports_materials: true,
                ascii: true,
                binary: false,
                implemented: true,
            },
            FileFormat::Ply => FormatInfo {
                name: "Stanford PLY",
                description: "Polygon File Format with flexible per-element properties",
                extensions: &["ply"],
                supports_colors: true,
                supports_normals: true,
                supports_uvs: true,
                supports_materials: false,
                ascii: true,
                binary: true,
                implemented: true,
            },
            FileFormat::Stl => FormatInfo {
                name: "STL",
                description: "Stereolithography triangle soup for 3D printing",
                extensions: &["stl"],
                supports_colors: false,
                supports_normals: true,
                supports_uvs: false,
                supports_materials: false,
                ascii: true,
                binary: true,
                implemented: false,
            },
            FileFormat::Off => FormatInfo {
                name: "Object File Format",
                description: "Minimal vertex and face list",
                extensions: &["off"],
                supports_colors: false,
                supports_normals: false,
                supports_uvs: false,
                supports_materials: false,
                ascii: true,
                binary: false,
                implemented: false,
            },
        }
    }

    fn ensure_implemented(&self) -> Result<()> {
        if self.info().implemented {
            Ok(())
        } else {
            Err(self.not_implemented())
        }
    }

    fn not_implemented(&self) -> MeshError {
        MeshError::UnsupportedFormat(format!("{self} is recognised but not implemented"))
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats that can be loaded and saved.
pub fn supported_formats() -> Vec<FileFormat> {
    vec![FileFormat::Obj, FileFormat::Ply]
}

/// Every recognised format, including those without a codec.
pub fn all_formats() -> Vec<FileFormat> {
    vec![
        FileFormat::Obj,
        FileFormat::Ply,
        FileFormat::Stl,
        FileFormat::Off,
    ]
}

/// Load a mesh, choosing the codec from the file extension.
pub fn load_mesh(path: &Path) -> Result<Mesh> {
    let format = FileFormat::from_path(path)?;
    format.ensure_implemented()?;

    if !path.exists() {
        return Err(MeshError::Input(format!(
            "Input file not found: {}",
            path.display()
        )));
    }

    info!(format = %format, path = %path.display(), "Loading mesh");
    let mesh = match format {
        FileFormat::Obj => obj::load_obj(path)?,
        FileFormat::Ply => ply::load_ply(path)?,
        FileFormat::Stl | FileFormat::Off => return Err(format.not_implemented()),
    };

    debug!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        edges = mesh.edge_count(),
        "Loaded mesh"
    );
    Ok(mesh)
}

/// Save a mesh, choosing the codec from the file extension.
pub fn save_mesh(path: &Path, mesh: &Mesh, options: &SaveOptions) -> Result<()> {
    let format = FileFormat::from_path(path)?;

    info!(format = %format, path = %path.display(), "Saving mesh");
    match format {
        FileFormat::Obj => obj::save_obj(path, mesh),
        FileFormat::Ply => ply::save_ply(path, mesh, options),
        FileFormat::Stl | FileFormat::Off => Err(format.not_implemented()),
    }
}
