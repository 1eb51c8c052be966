use log::info;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::frame::Frame;
use crate::naming::FrameNaming;
use crate::{poscar, trajectory, xyz};

const WORKDIR_PREFIX: &str = "nebvis_";

/// Per-run scratch directory. It outlives the process unless removed explicitly,
/// so a failed run can be inspected.
#[derive(Debug, Clone)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub fn create() -> io::Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    pub fn create_in(parent: &Path) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(parent)?;
        Ok(Self { path: dir.keep() })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn remove(self) -> io::Result<()> {
        fs::remove_dir_all(&self.path)
    }
}

pub struct Extracted {
    pub workdir: WorkDir,
    pub naming: FrameNaming,
    pub frames: Vec<Frame>,
    pub poscars: Vec<PathBuf>,
    pub xyzs: Vec<PathBuf>,
}

impl Extracted {
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.frames.len()
    }
}

/// Reads the trajectory and selects its last `count` frames, oldest first.
pub fn select_images(path: &Path, count: NonZeroUsize) -> PipelineResult<Vec<Frame>> {
    let trajectory = trajectory::read(path).map_err(|source| PipelineError::Trajectory {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "{}: {} frames, taking the last {count}",
        path.display(),
        trajectory.len()
    );
    Ok(trajectory.last(count.get())?.to_vec())
}

/// Writes `image_XXX.POSCAR` and `image_XXX.xyz` for every frame.
fn write_images(workdir: WorkDir, frames: Vec<Frame>) -> PipelineResult<Extracted> {
    let naming = FrameNaming::new(frames.len());
    let mut poscars = Vec::with_capacity(frames.len());
    let mut xyzs = Vec::with_capacity(frames.len());
    for (index, frame) in (1..).zip(&frames) {
        let poscar_path = workdir.join(&naming.poscar(index));
        let xyz_path = workdir.join(&naming.xyz(index));
        poscar::save(frame, &poscar_path)?;
        xyz::save(frame, &xyz_path)?;
        poscars.push(poscar_path);
        xyzs.push(xyz_path);
    }
    Ok(Extracted {
        workdir,
        naming,
        frames,
        poscars,
        xyzs,
    })
}

/// Selects the last `count` frames and writes them into a fresh working directory
/// under `parent`. Nothing is created when the trajectory is too short.
pub fn extract_images(
    path: &Path,
    count: NonZeroUsize,
    parent: &Path,
) -> PipelineResult<Extracted> {
    let frames = select_images(path, count)?;
    let workdir = WorkDir::create_in(parent)?;
    info!("working directory: {}", workdir.path().display());
    write_images(workdir, frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    fn write_path(dir: &Path, frames: usize) -> PathBuf {
        let text = (0..frames).fold(String::new(), |mut text, i| {
            let _ = write!(text, "2\nenergy={}\nH 0 0 0\nH {} 0 0\n", -(i as f64), 0.7 + i as f64);
            text
        });
        let path = dir.join("neb.xyz");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_extract_last_images() {
        let input = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = write_path(input.path(), 8);
        let extracted =
            extract_images(&path, NonZeroUsize::new(5).unwrap(), scratch.path()).unwrap();
        assert_eq!(extracted.count(), 5);
        assert!(extracted
            .workdir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKDIR_PREFIX));
        let energies = extracted.frames.iter().map(|f| f.energy.unwrap()).collect::<Vec<_>>();
        assert_eq!(energies, vec![-3.0, -4.0, -5.0, -6.0, -7.0]);
        let mut names = fs::read_dir(extracted.workdir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".xyz"))
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(
            names,
            (1..=5).map(|i| format!("image_{i:03}.xyz")).collect::<Vec<_>>()
        );
        assert!(extracted.poscars.iter().all(|p| p.exists()));
        let first = xyz::read_trajectory(&extracted.xyzs[0]).unwrap();
        assert_eq!(first.frames()[0].positions[1].x, 3.7);
    }

    #[test]
    fn test_insufficient_frames_writes_nothing() {
        let input = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = write_path(input.path(), 8);
        let result = extract_images(&path, NonZeroUsize::new(11).unwrap(), scratch.path());
        assert!(matches!(
            result,
            Err(PipelineError::InsufficientFrames {
                available: 8,
                requested: 11
            })
        ));
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unreadable_trajectory() {
        let scratch = tempfile::tempdir().unwrap();
        let result = extract_images(
            Path::new("/nonexistent/neb.traj"),
            NonZeroUsize::new(1).unwrap(),
            scratch.path(),
        );
        assert!(matches!(result, Err(PipelineError::Trajectory { .. })));
    }

    #[test]
    fn test_workdir_persists_until_removed() {
        let scratch = tempfile::tempdir().unwrap();
        let workdir = WorkDir::create_in(scratch.path()).unwrap();
        let path = workdir.path().to_path_buf();
        assert!(path.is_dir());
        workdir.remove().unwrap();
        assert!(!path.exists());
    }
}
