use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::math::Real;

/// PLY output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PlyEncoding {
    #[default]
    #[value(name = "ascii")]
    Ascii,
    #[value(name = "binary-le")]
    BinaryLittleEndian,
    #[value(name = "binary-be")]
    BinaryBigEndian,
}

impl fmt::Display for PlyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlyEncoding::Ascii => write!(f, "ascii"),
            PlyEncoding::BinaryLittleEndian => write!(f, "binary-le"),
            PlyEncoding::BinaryBigEndian => write!(f, "binary-be"),
        }
    }
}

/// Primitive shapes the `generate` command can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Primitive {
    Triangle,
    Quad,
    Cube,
    Tetrahedron,
    Pyramid,
    Plane,
    Sphere,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::Triangle => "triangle",
            Primitive::Quad => "quad",
            Primitive::Cube => "cube",
            Primitive::Tetrahedron => "tetrahedron",
            Primitive::Pyramid => "pyramid",
            Primitive::Plane => "plane",
            Primitive::Sphere => "sphere",
        };
        f.write_str(name)
    }
}

/// Options that shape how a mesh is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    pub ply_encoding: PlyEncoding,
    /// Write PLY positions as `double` instead of `float`.
    pub double_precision: bool,
}

/// Shape parameters for the `generate` command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimitiveParams {
    /// Overall extent: edge length, width, base size or sphere diameter.
    pub size: Real,
    /// Quad/plane depth and pyramid height.
    pub height: Real,
    pub segments: u32,
    pub rings: u32,
}

impl Default for PrimitiveParams {
    fn default() -> Self {
        Self {
            size: 1.0,
            height: 1.0,
            segments: 16,
            rings: 8,
        }
    }
}

/// The single job a pipeline run performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    Stats {
        input: PathBuf,
        json: bool,
    },
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
    Generate {
        primitive: Primitive,
        params: PrimitiveParams,
        output: PathBuf,
    },
}

/// Fully resolved pipeline configuration (constructed from CLI args).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub task: Task,
    pub save: SaveOptions,
    /// Recompute face and vertex normals before reporting or saving.
    pub compute_normals: bool,
    pub profile: bool,
    pub verbose: bool,
    pub threads: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            task: Task::Stats {
                input: PathBuf::new(),
                json: false,
            },
            save: SaveOptions::default(),
            compute_normals: false,
            profile: false,
            verbose: false,
            threads: None,
        }
    }
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "meshkit",
    about = "Inspect, convert and generate polygon meshes (OBJ, PLY)",
    version
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Print a timing report when done
    #[arg(long, global = true)]
    pub profile: bool,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print statistics for a mesh file
    Stats {
        /// Input file (OBJ, PLY)
        input: PathBuf,

        /// Emit JSON instead of a text table
        #[arg(long)]
        json: bool,

        /// Recompute normals before measuring
        #[arg(long)]
        compute_normals: bool,
    },

    /// Convert a mesh between formats
    Convert {
        /// Input file (OBJ, PLY)
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Output file; format follows the extension
        #[arg(short = 'o', long)]
        output: PathBuf,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Generate a primitive and save it
    Generate {
        #[arg(value_enum)]
        primitive: Primitive,

        /// Output file; format follows the extension
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Overall size (edge, width, base or diameter)
        #[arg(long, default_value_t = 1.0)]
        size: f64,

        /// Depth for quad/plane, height for pyramid (default: size)
        #[arg(long)]
        height: Option<f64>,

        /// Plane subdivisions per axis, sphere meridians
        #[arg(long, default_value_t = 16)]
        segments: u32,

        /// Sphere latitude bands
        #[arg(long, default_value_t = 8)]
        rings: u32,

        #[command(flatten)]
        write: WriteArgs,
    },
}

/// Options shared by the commands that write a file.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Recompute normals before saving
    #[arg(long)]
    pub compute_normals: bool,

    /// PLY encoding
    #[arg(long, value_enum, default_value = "ascii")]
    pub ply_encoding: PlyEncoding,

    /// Write PLY positions in double precision
    #[arg(long)]
    pub double: bool,
}

impl From<&WriteArgs> for SaveOptions {
    fn from(args: &WriteArgs) -> Self {
        SaveOptions {
            ply_encoding: args.ply_encoding,
            double_precision: args.double,
        }
    }
}

impl From<CliArgs> for PipelineConfig {
    fn from(args: CliArgs) -> Self {
        let (task, save, compute_normals) = match args.command {
            Command::Stats {
                input,
                json,
                compute_normals,
            } => (
                Task::Stats { input, json },
                SaveOptions::default(),
                compute_normals,
            ),
            Command::Convert {
                input,
                output,
                write,
            } => (
                Task::Convert { input, output },
                SaveOptions::from(&write),
                write.compute_normals,
            ),
            Command::Generate {
                primitive,
                output,
                size,
                height,
                segments,
                rings,
                write,
            } => (
                Task::Generate {
                    primitive,
                    params: PrimitiveParams {
                        size,
                        height: height.unwrap_or(size),
                        segments,
                        rings,
                    },
                    output,
                },
                SaveOptions::from(&write),
                write.compute_normals,
            ),
        };

        PipelineConfig {
            task,
            save,
            compute_normals,
            profile: args.profile,
            verbose: args.verbose,
            threads: args.threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_save_options() {
        let opts = SaveOptions::default();
        assert_eq!(opts.ply_encoding, PlyEncoding::Ascii);
        assert!(!opts.double_precision);
    }

    #[test]
    fn default_primitive_params() {
        let p = PrimitiveParams::default();
        assert_eq!(p.size, 1.0);
        assert_eq!(p.segments, 16);
        assert_eq!(p.rings, 8);
    }

    #[test]
    fn enum_display() {
        assert_eq!(PlyEncoding::Ascii.to_string(), "ascii");
        assert_eq!(PlyEncoding::BinaryLittleEndian.to_string(), "binary-le");
        assert_eq!(PlyEncoding::BinaryBigEndian.to_string(), "binary-be");
        assert_eq!(Primitive::Sphere.to_string(), "sphere");
        assert_eq!(Primitive::Tetrahedron.to_string(), "tetrahedron");
    }

    #[test]
    fn cli_stats() {
        let args = CliArgs::parse_from(["meshkit", "stats", "model.obj", "--json", "-v", "--log-json"]);
        assert!(args.log_json);
        let config: PipelineConfig = args.into();

        assert_eq!(
            config.task,
            Task::Stats {
                input: PathBuf::from("model.obj"),
                json: true
            }
        );
        assert!(config.verbose);
        assert!(!config.compute_normals);
        assert!(!config.profile);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn cli_convert() {
        let args = CliArgs::parse_from([
            "meshkit",
            "-j",
            "4",
            "--profile",
            "convert",
            "-i",
            "scan.ply",
            "-o",
            "scan.obj",
            "--compute-normals",
            "--ply-encoding",
            "binary-be",
            "--double",
        ]);
        let config: PipelineConfig = args.into();

        assert_eq!(
            config.task,
            Task::Convert {
                input: PathBuf::from("scan.ply"),
                output: PathBuf::from("scan.obj"),
            }
        );
        assert_eq!(config.save.ply_encoding, PlyEncoding::BinaryBigEndian);
        assert!(config.save.double_precision);
        assert!(config.compute_normals);
        assert!(config.profile);
        assert_eq!(config.threads, Some(4));
    }

    #[test]
    fn cli_generate_defaults() {
        let args = CliArgs::parse_from(["meshkit", "generate", "cube", "-o", "cube.ply"]);
        let config: PipelineConfig = args.into();

        match config.task {
            Task::Generate {
                primitive,
                params,
                output,
            } => {
                assert_eq!(primitive, Primitive::Cube);
                assert_eq!(params, PrimitiveParams::default());
                assert_eq!(output, PathBuf::from("cube.ply"));
            }
            other => panic!("unexpected task {other:?}"),
        }
        assert_eq!(config.save, SaveOptions::default());
    }

    #[test]
    fn cli_generate_height_follows_size() {
        let args = CliArgs::parse_from([
            "meshkit", "generate", "pyramid", "-o", "p.obj", "--size", "3",
        ]);
        let config: PipelineConfig = args.into();
        let Task::Generate { params, .. } = config.task else {
            panic!("expected generate task");
        };
        assert_eq!(params.size, 3.0);
        assert_eq!(params.height, 3.0);

        let args = CliArgs::parse_from([
            "meshkit", "generate", "sphere", "-o", "s.ply", "--segments", "24", "--rings", "12",
            "--height", "2", "-v",
        ]);
        let config: PipelineConfig = args.into();
        let Task::Generate { primitive, params, .. } = config.task else {
            panic!("expected generate task");
        };
        assert_eq!(primitive, Primitive::Sphere);
        assert_eq!(params.segments, 24);
        assert_eq!(params.rings, 12);
        assert_eq!(params.height, 2.0);
        assert!(config.verbose);
    }

    #[test]
    fn cli_rejects_unknown_encoding() {
        let result = CliArgs::try_parse_from([
            "meshkit",
            "convert",
            "-i",
            "a.obj",
            "-o",
            "b.ply",
            "--ply-encoding",
            "utf8",
        ]);
        assert!(result.is_err());
    }
}
