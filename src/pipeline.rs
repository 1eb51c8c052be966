use log::{error, info};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::chart::{plot_energy_chart, ChartStyle};
use crate::energy::{evaluate, EnergyBackend, EnergySeries};
use crate::error::PipelineResult;
use crate::extract::{extract_images, Extracted};
use crate::montage;
use crate::naming::output_names;
use crate::vmd::{self, VmdSettings};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub trajectory: PathBuf,
    pub images: NonZeroUsize,
    pub backend: EnergyBackend,
    pub vmd: VmdSettings,
    /// Saved `style.vmd` to replay instead of the interactive session.
    pub style: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Parent of the per-run working directory.
    pub scratch_dir: PathBuf,
    /// Remove the working directory after a successful run.
    pub cleanup: bool,
    pub chart: ChartStyle,
}

impl PipelineConfig {
    #[must_use]
    pub fn new(trajectory: PathBuf, images: NonZeroUsize) -> Self {
        Self {
            trajectory,
            images,
            backend: EnergyBackend::default(),
            vmd: VmdSettings::default(),
            style: None,
            output_dir: PathBuf::from("."),
            scratch_dir: std::env::temp_dir(),
            cleanup: false,
            chart: ChartStyle::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// `None` once cleaned up.
    pub workdir: Option<PathBuf>,
    pub montage: PathBuf,
    pub chart: PathBuf,
    pub energies: EnergySeries,
}

fn render_montage(config: &PipelineConfig, extracted: &Extracted, output: &Path) -> PipelineResult<()> {
    let workdir = &extracted.workdir;
    match &config.style {
        Some(style) => vmd::reuse_style(workdir, style)?,
        None => vmd::launch_for_style(workdir, &extracted.xyzs[0], &config.vmd)?,
    };
    let stills = vmd::render_frames(workdir, &extracted.naming, extracted.count(), &config.vmd)?;
    let pngs = montage::convert_to_png(&stills)?;
    montage::compose(&pngs, extracted.count(), output)
}

fn run_stages(config: &PipelineConfig, extracted: &Extracted) -> PipelineResult<(PathBuf, PathBuf, EnergySeries)> {
    let (montage_name, chart_name) = output_names(&config.trajectory);
    let montage_path = config.output_dir.join(montage_name);
    let chart_path = config.output_dir.join(chart_name);

    render_montage(config, extracted, &montage_path)?;
    println!("\nOutput: {}", montage_path.display());

    let energies = evaluate(
        &extracted.frames,
        &config.backend,
        extracted.workdir.path(),
        &extracted.naming,
    )?;
    plot_energy_chart(&energies, &chart_path, config.chart)?;
    println!("Saved energy profile: {}", chart_path.display());
    Ok((montage_path, chart_path, energies))
}

/// Extract, style, render, stitch, evaluate, plot. Any failure leaves the
/// working directory on disk.
pub fn run(config: &PipelineConfig) -> PipelineResult<PipelineOutput> {
    let extracted = extract_images(&config.trajectory, config.images, &config.scratch_dir)?;
    let workdir = extracted.workdir.path().to_path_buf();
    println!("Temporary directory: {}", workdir.display());

    let (montage, chart, energies) = run_stages(config, &extracted).inspect_err(|err| {
        error!("{} stage failed, partial results kept in {}", err.stage(), workdir.display());
    })?;

    let workdir = if config.cleanup {
        extracted.workdir.remove()?;
        info!("removed {}", workdir.display());
        None
    } else {
        Some(workdir)
    };
    Ok(PipelineOutput {
        workdir,
        montage,
        chart,
        energies,
    })
}
