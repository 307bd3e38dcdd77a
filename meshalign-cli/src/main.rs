//! Align a source mesh file onto a target mesh file
//!
//! Loads both meshes, aligns the source by oriented bounding boxes and ICP,
//! reports the Hausdorff distance of each stage and keeps the closest
//! placement of the source.

mod sink;

use anyhow::{Context, Result};
use clap::Parser;
use meshalign::prelude::*;
use sink::{ExportSink, LoggingSink};
use std::path::PathBuf;

/// Rigidly align one surface mesh onto another
#[derive(Parser, Debug)]
#[command(name = "meshalign")]
#[command(about = "Align a source mesh onto a target mesh with OBB landmarks and ICP", long_about = None)]
#[command(version)]
struct Cli {
    /// Mesh to move (.ply, .obj, .stl, .vtk, .g)
    source: PathBuf,

    /// Mesh to align onto
    target: PathBuf,

    /// Fail on unrecognised file extensions instead of substituting a sphere
    #[arg(long)]
    strict: bool,

    /// Write the aligned source mesh here (.ply, .obj, .stl, .vtk or .g)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// ICP iteration limit
    #[arg(long, default_value_t = 500)]
    max_iterations: usize,

    /// ICP convergence threshold on the mean distance
    #[arg(long, default_value_t = 1e-5)]
    max_mean_distance: f32,

    /// Maximum number of source points matched per ICP iteration
    #[arg(long, default_value_t = 100)]
    max_landmarks: usize,

    /// Depth of the oriented bounding box trees
    #[arg(long, default_value_t = 1)]
    obb_depth: usize,

    /// Distances within this tolerance of the minimum count as ties
    #[arg(long, default_value_t = 0.0)]
    tie_tolerance: f32,
}

impl Cli {
    fn load_policy(&self) -> LoadPolicy {
        if self.strict {
            LoadPolicy::Strict
        } else {
            LoadPolicy::Lenient
        }
    }

    fn alignment_options(&self) -> AlignmentOptions {
        AlignmentOptions::default()
            .with_obb(ObbAlignOptions::default().with_max_depth(self.obb_depth))
            .with_icp(
                IcpOptions::default()
                    .with_max_iterations(self.max_iterations)
                    .with_max_mean_distance(self.max_mean_distance)
                    .with_max_landmarks(self.max_landmarks),
            )
            .with_tie_tolerance(self.tie_tolerance)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let loader = MeshLoader::new(cli.load_policy());

    println!("Loading source: {}", cli.source.display());
    let source = loader
        .load(&cli.source)
        .with_context(|| format!("failed to load source mesh {}", cli.source.display()))?;

    println!("Loading target: {}", cli.target.display());
    let target = loader
        .load(&cli.target)
        .with_context(|| format!("failed to load target mesh {}", cli.target.display()))?;

    let report = MeshAligner::new(cli.alignment_options())
        .align(&source, &target)
        .context("alignment failed")?;

    println!(
        "Distance before, after align, after ICP, min: {}, {}, {}, {}",
        report.distance_before, report.distance_after_obb, report.distance_after_icp, report.min_distance
    );
    println!("Using {}", report.selected);
    if !report.icp.converged() {
        println!(
            "ICP stopped after {} iterations without reaching the mean distance threshold",
            report.icp.iterations
        );
    }

    present(&report, &source, &target, &mut LoggingSink)?;
    if let Some(path) = &cli.output {
        present(&report, &source, &target, &mut ExportSink::new(path))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}
