use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that ends a run. None of these are retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read trajectory {}: {source:#}", .path.display())]
    Trajectory {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("trajectory has {available} frames, requested {requested}")]
    InsufficientFrames { available: usize, requested: usize },

    #[error("energy computation failed for image {index}: {source:#}")]
    EnergyComputation { index: usize, source: anyhow::Error },

    #[error("{} was not created, save the visualization state under this name before closing VMD", .0.display())]
    MissingStyleFile(PathBuf),

    #[error("rendering image {index} failed: {reason}")]
    Render { index: usize, reason: String },

    #[error("montage composition failed: {0}")]
    Montage(String),

    #[error("energy chart failed: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// Process exit code for this failure kind. 2 is left to clap's usage errors.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Io(_) => 1,
            Self::Trajectory { .. } | Self::InsufficientFrames { .. } => 3,
            Self::EnergyComputation { .. } => 4,
            Self::MissingStyleFile(_) => 5,
            Self::Render { .. } => 6,
            Self::Montage(_) => 7,
            Self::Plot(_) => 8,
        }
    }

    /// Name of the pipeline stage that failed.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Trajectory { .. } | Self::InsufficientFrames { .. } => "extraction",
            Self::EnergyComputation { .. } => "energy",
            Self::MissingStyleFile(_) => "style",
            Self::Render { .. } => "render",
            Self::Montage(_) => "montage",
            Self::Plot(_) => "chart",
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
