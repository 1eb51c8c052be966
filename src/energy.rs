use anyhow::anyhow;
use log::info;
use rayon::prelude::*;
use std::path::Path;

use crate::emt::Emt;
use crate::error::{PipelineError, PipelineResult};
use crate::frame::Frame;
use crate::naming::FrameNaming;
use crate::psi4::Psi4Settings;

/// Where image energies come from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnergyBackend {
    /// Effective Medium Theory, fast and approximate.
    #[default]
    Emt,
    /// Psi4 SCF single points, slow and accurate.
    Psi4(Psi4Settings),
    /// Energies stored in the trajectory by the NEB run.
    Stored,
}

impl EnergyBackend {
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Emt => "EMT (fast, but less accurate)",
            Self::Psi4(_) => "Psi4 (this may take a while)",
            Self::Stored => "energies stored in the trajectory",
        }
    }
}

/// `(image index, energy in eV)` in image order, indices starting at 1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnergySeries {
    points: Vec<(usize, f64)>,
}

impl EnergySeries {
    #[must_use]
    pub fn from_energies(energies: impl IntoIterator<Item = f64>) -> Self {
        Self {
            points: (1..).zip(energies).collect(),
        }
    }

    #[must_use]
    pub fn points(&self) -> &[(usize, f64)] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Energies shifted so the lowest one is zero.
    #[must_use]
    pub fn relative(&self) -> Vec<(usize, f64)> {
        let min = self
            .points
            .iter()
            .map(|(_, e)| *e)
            .fold(f64::INFINITY, f64::min);
        self.points.iter().map(|&(i, e)| (i, e - min)).collect()
    }

    /// Highest relative energy along the path.
    #[must_use]
    pub fn barrier(&self) -> Option<f64> {
        self.relative()
            .into_iter()
            .map(|(_, e)| e)
            .reduce(f64::max)
    }
}

/// Computes one energy per frame, in frame order. The first failing frame
/// aborts the whole evaluation.
pub fn evaluate(
    frames: &[Frame],
    backend: &EnergyBackend,
    workdir: &Path,
    naming: &FrameNaming,
) -> PipelineResult<EnergySeries> {
    info!("computing energies with {}", backend.describe());
    let energies = match backend {
        EnergyBackend::Emt => {
            let emt = Emt::new();
            frames
                .par_iter()
                .enumerate()
                .map(|(i, frame)| {
                    emt.energy(frame)
                        .map_err(|source| PipelineError::EnergyComputation {
                            index: i + 1,
                            source,
                        })
                })
                .collect::<PipelineResult<Vec<_>>>()?
        }
        EnergyBackend::Psi4(settings) => (1..)
            .zip(frames)
            .map(|(index, frame)| {
                settings
                    .energy(
                        frame,
                        workdir,
                        &naming.psi4_input(index),
                        &naming.psi4_output(index),
                    )
                    .map_err(|source| PipelineError::EnergyComputation { index, source })
            })
            .collect::<PipelineResult<Vec<_>>>()?,
        EnergyBackend::Stored => (1..)
            .zip(frames)
            .map(|(index, frame)| {
                frame.energy.ok_or_else(|| PipelineError::EnergyComputation {
                    index,
                    source: anyhow!("the trajectory stores no energy for this image"),
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?,
    };
    let series = EnergySeries::from_energies(energies);
    for &(index, energy) in series.points() {
        info!("  image {} : {energy:.6} eV", naming.index(index));
    }
    Ok(series)
}
