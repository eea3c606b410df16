use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::{Mat4, Vec2, Vec3};
use lod_mesh_graph::*;

mod source;
use source::*;

#[derive(Parser)]
#[command(name = "lod-bake")]
#[command(about = "Bake meshes into lod graph level files")]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Build the lod graph of a mesh and write one file per level
  Bake {
    /// Wavefront obj input, all models are merged
    #[arg(short, long, conflicts_with = "grid", required_unless_present = "grid")]
    input: Option<PathBuf>,

    /// Bake a generated flat grid with this many segments per side
    #[arg(long)]
    grid: Option<u32>,

    /// Level files are written to `<output>_<level>.lod`
    #[arg(short, long)]
    output: PathBuf,

    /// Toml build config, missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
  },

  /// Print a summary of every level file of a prefix
  Inspect { prefix: PathBuf },

  /// Select clusters for a camera on the +z axis looking at the origin
  Select {
    prefix: PathBuf,

    /// Camera distance to the origin
    #[arg(long, default_value_t = 5.0)]
    distance: f32,

    /// Max accepted on screen size in pixels
    #[arg(long, default_value_t = 1.0)]
    tolerance: f32,

    #[arg(long, default_value_t = 1920)]
    width: u32,

    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 60.0)]
    fov: f32,
  },
}

fn main() -> anyhow::Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  match Cli::parse().command {
    Command::Bake {
      input,
      grid,
      output,
      config,
    } => {
      let config = read_config(config.as_deref())?;
      let mesh = match (input, grid) {
        (Some(input), _) => load_obj_mesh(&input)?,
        (None, Some(segments)) => grid_mesh(segments),
        (None, None) => anyhow::bail!("either --input or --grid is required"),
      };
      bake(mesh, config, &output)
    }
    Command::Inspect { prefix } => inspect(&prefix),
    Command::Select {
      prefix,
      distance,
      tolerance,
      width,
      height,
      fov,
    } => {
      let graph = RuntimeLodGraph::load(&prefix)
        .with_context(|| format!("failed to load lod graph {prefix:?}"))?;
      let decider = LodDecider {
        view: Mat4::look_at_rh(Vec3::new(0., 0., distance), Vec3::ZERO, Vec3::Y),
        projection: Mat4::perspective_rh(
          fov.to_radians(),
          width as f32 / height.max(1) as f32,
          0.01,
          1000.,
        ),
        viewport: Vec2::new(width as f32, height as f32),
        tolerance_px: tolerance,
      };

      let selected = graph.select_clusters(&decider, |_| true);
      let mut per_level = vec![0; graph.levels.len()];
      let mut triangles = 0;
      for handle in &selected {
        per_level[handle.level as usize] += 1;
        triangles += graph.cluster(*handle).map_or(0, |c| c.triangle_count());
      }
      println!("{} clusters, {triangles} triangles selected", selected.len());
      for (level, count) in per_level.iter().enumerate() {
        println!("  level {level}: {count} clusters");
      }
      Ok(())
    }
  }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<LodGraphBuildConfig> {
  let Some(path) = path else {
    return Ok(LodGraphBuildConfig::default());
  };
  let text =
    std::fs::read_to_string(path).with_context(|| format!("failed to read config {path:?}"))?;
  let config: LodGraphBuildConfig =
    toml::from_str(&text).with_context(|| format!("failed to parse config {path:?}"))?;
  config.validate()?;
  Ok(config)
}

fn bake(mesh: MeshBufferSource, config: LodGraphBuildConfig, output: &Path) -> anyhow::Result<()> {
  let builder = DefaultMeshLodGraphBuilder::default();
  let graph = LodGraph::build_from_mesh(&builder, mesh, config).context("lod graph build failed")?;
  graph
    .validate()
    .context("built lod graph is inconsistent")?;

  if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create output directory {parent:?}"))?;
  }
  let paths = graph.write_to_files(output)?;
  for path in paths {
    println!("{}", path.display());
  }
  Ok(())
}

fn inspect(prefix: &Path) -> anyhow::Result<()> {
  let levels = read_levels(prefix).with_context(|| format!("failed to read {prefix:?}"))?;
  for (index, level) in levels.iter().enumerate() {
    let header = &level.header;
    let max_radius = level
      .clusters
      .iter()
      .map(|c| c.bounding.radius)
      .fold(0., f32::max);
    println!(
      "level {index}: {} clusters, {} groups, {} triangles, max cluster radius {max_radius}",
      header.cluster_count,
      header.group_count,
      header.vertex_count / 3,
    );
  }

  // rebuilding the DAG also checks every cross level link
  let graph = RuntimeLodGraph::from_disk_levels(levels)?;
  println!("{} clusters in {} levels", graph.cluster_count(), graph.levels.len());
  Ok(())
}
