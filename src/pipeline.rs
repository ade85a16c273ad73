use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use crate::analysis::{self, MeshStatistics};
use crate::config::{PipelineConfig, Primitive, PrimitiveParams, Task};
use crate::error::{MeshError, Result};
use crate::generators;
use crate::io;
use crate::profiling::Profiler;
use crate::types::Mesh;

/// Summary of a completed pipeline run.
#[derive(Debug)]
pub struct ProcessingResult {
    pub vertex_count: usize,
    pub face_count: usize,
    /// Present for the `stats` task.
    pub statistics: Option<MeshStatistics>,
    /// Rendered timing table when profiling was requested.
    pub profile_report: Option<String>,
    pub duration: Duration,
}

/// Pipeline orchestrator: runs one configured task.
pub struct Pipeline;

impl Pipeline {
    pub fn run(config: &PipelineConfig) -> Result<ProcessingResult> {
        let start = Instant::now();
        let mut profiler = if config.profile {
            Profiler::new()
        } else {
            Profiler::disabled()
        };

        let (mesh, statistics) = match &config.task {
            Task::Stats { input, json } => {
                info!(input = %input.display(), "Computing statistics");
                let mut mesh = profiler.time("load", || io::load_mesh(input))?;
                Self::prepare(config, &mut mesh, &mut profiler);
                let stats = profiler.time("statistics", || analysis::compute_statistics(&mesh));
                print_statistics(&stats, *json)?;
                (mesh, Some(stats))
            }
            Task::Convert { input, output } => {
                info!(input = %input.display(), output = %output.display(), "Converting");
                let mut mesh = profiler.time("load", || io::load_mesh(input))?;
                Self::prepare(config, &mut mesh, &mut profiler);
                Self::save(config, output, &mesh, &mut profiler)?;
                (mesh, None)
            }
            Task::Generate {
                primitive,
                params,
                output,
            } => {
                info!(%primitive, output = %output.display(), "Generating primitive");
                let mut mesh = profiler.time("generate", || build_primitive(*primitive, params))?;
                Self::prepare(config, &mut mesh, &mut profiler);
                Self::save(config, output, &mesh, &mut profiler)?;
                (mesh, None)
            }
        };

        let duration = start.elapsed();
        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            elapsed = ?duration,
            "Pipeline complete"
        );

        let profile_report = config.profile.then(|| profiler.report());
        Ok(ProcessingResult {
            vertex_count: mesh.vertex_count(),
            face_count: mesh.face_count(),
            statistics,
            profile_report,
            duration,
        })
    }

    fn prepare(config: &PipelineConfig, mesh: &mut Mesh, profiler: &mut Profiler) {
        if config.compute_normals {
            profiler.time("normals", || mesh.compute_normals());
        }
    }

    fn save(
        config: &PipelineConfig,
        output: &Path,
        mesh: &Mesh,
        profiler: &mut Profiler,
    ) -> Result<()> {
        profiler.time("save", || io::save_mesh(output, mesh, &config.save))
    }
}

/// Build the requested primitive from CLI parameters.
pub fn build_primitive(primitive: Primitive, params: &PrimitiveParams) -> Result<Mesh> {
    match primitive {
        Primitive::Triangle => generators::triangle(params.size),
        Primitive::Quad => generators::quad(params.size, params.height),
        Primitive::Cube => generators::cube(params.size),
        Primitive::Tetrahedron => generators::tetrahedron(params.size),
        Primitive::Pyramid => generators::pyramid(params.size, params.height),
        Primitive::Plane => {
            generators::plane(params.size, params.height, params.segments, params.segments)
        }
        Primitive::Sphere => generators::uv_sphere(params.size * 0.5, params.segments, params.rings),
    }
}

fn print_statistics(stats: &MeshStatistics, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(stats)
            .map_err(|e| MeshError::Output(format!("Failed to encode statistics: {e}")))?;
        println!("{text}");
    } else {
        println!("{stats}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SaveOptions;

    #[test]
    fn every_primitive_builds() {
        let params = PrimitiveParams::default();
        for primitive in [
            Primitive::Triangle,
            Primitive::Quad,
            Primitive::Cube,
            Primitive::Tetrahedron,
            Primitive::Pyramid,
            Primitive::Plane,
            Primitive::Sphere,
        ] {
            let mesh = build_primitive(primitive, &params).unwrap();
            assert!(mesh.face_count() > 0, "{primitive} produced no faces");
        }
    }

    #[test]
    fn sphere_size_is_diameter() {
        let params = PrimitiveParams {
            size: 4.0,
            ..Default::default()
        };
        let mesh = build_primitive(Primitive::Sphere, &params).unwrap();
        assert!((mesh.bounding_box().max.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn generate_then_stats() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cube.ply");

        let generate = PipelineConfig {
            task: Task::Generate {
                primitive: Primitive::Cube,
                params: PrimitiveParams {
                    size: 2.0,
                    ..Default::default()
                },
                output: output.clone(),
            },
            save: SaveOptions::default(),
            profile: true,
            ..Default::default()
        };
        let result = Pipeline::run(&generate).unwrap();
        assert_eq!(result.vertex_count, 8);
        let report = result.profile_report.unwrap();
        assert!(report.contains("generate"));
        assert!(report.contains("save"));

        let stats = PipelineConfig {
            task: Task::Stats {
                input: output,
                json: true,
            },
            ..Default::default()
        };
        let result = Pipeline::run(&stats).unwrap();
        let s = result.statistics.unwrap();
        assert_eq!(s.face_count, 12);
        assert!((s.volume - 8.0).abs() < 1e-5);
        assert!(result.profile_report.is_none());
    }

    #[test]
    fn convert_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            task: Task::Convert {
                input: dir.path().join("missing.obj"),
                output: dir.path().join("out.ply"),
            },
            ..Default::default()
        };
        let err = Pipeline::run(&config).unwrap_err();
        assert!(matches!(err, MeshError::Input(_)));
        assert!(!dir.path().join("out.ply").exists());
    }
}
