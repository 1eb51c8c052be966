use anyhow::{Context, Result};
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::frame::Trajectory;
use crate::{ulm, xyz};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryFormat {
    Ulm,
    Xyz,
}

impl TrajectoryFormat {
    /// Format from the file extension, falling back to sniffing the first bytes.
    pub fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "traj" => Ok(Self::Ulm),
            "xyz" | "extxyz" => Ok(Self::Xyz),
            _ => {
                let mut magic = [0u8; 8];
                let n = File::open(path)
                    .context(format!("Reading {}", path.to_string_lossy()))?
                    .read(&mut magic)?;
                if n == magic.len() && &magic == ulm::MAGIC {
                    Ok(Self::Ulm)
                } else {
                    Ok(Self::Xyz)
                }
            }
        }
    }
}

/// Reads all frames of a trajectory file.
pub fn read(path: &Path) -> Result<Trajectory> {
    let format = TrajectoryFormat::detect(path)?;
    debug!("reading {} as {format:?}", path.display());
    match format {
        TrajectoryFormat::Ulm => ulm::read_trajectory(path),
        TrajectoryFormat::Xyz => xyz::read_trajectory(path),
    }
}
