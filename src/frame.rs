use nalgebra::{Matrix3, Point3};
use std::fmt;

use crate::error::PipelineError;

/// One atomic configuration of the band.
#[derive(Clone, PartialEq)]
pub struct Frame {
    pub symbols: Vec<String>,
    pub positions: Vec<Point3<f64>>,
    /// Rows are the lattice vectors, all zero when the frame has no cell.
    pub cell: Matrix3<f64>,
    pub pbc: [bool; 3],
    /// Energy stored alongside the geometry by whoever wrote the trajectory (eV).
    pub energy: Option<f64>,
}

impl Frame {
    #[must_use]
    pub fn new(symbols: Vec<String>, positions: Vec<Point3<f64>>) -> Self {
        debug_assert_eq!(symbols.len(), positions.len());
        Self {
            symbols,
            positions,
            cell: Matrix3::zeros(),
            pbc: [false; 3],
            energy: None,
        }
    }

    #[must_use]
    pub fn with_cell(mut self, cell: Matrix3<f64>, pbc: [bool; 3]) -> Self {
        self.cell = cell;
        self.pbc = pbc;
        self
    }

    #[must_use]
    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = Some(energy);
        self
    }

    #[inline]
    #[must_use]
    pub fn atoms_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn has_cell(&self) -> bool {
        self.cell.iter().any(|v| *v != 0.0)
    }

    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.pbc.iter().any(|p| *p) && self.has_cell()
    }

    /// Runs of identical consecutive symbols, the grouping POSCAR files use.
    #[must_use]
    pub fn symbol_runs(&self) -> Vec<(&str, usize)> {
        self.symbols
            .iter()
            .fold(Vec::<(&str, usize)>::new(), |mut runs, symbol| {
                match runs.last_mut() {
                    Some((last, count)) if *last == symbol.as_str() => *count += 1,
                    _ => runs.push((symbol, 1)),
                }
                runs
            })
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("atoms_count", &self.atoms_count())
            .field("pbc", &self.pbc)
            .field("energy", &self.energy)
            .finish()
    }
}

/// Ordered frames of a trajectory file.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    frames: Vec<Frame>,
}

impl Trajectory {
    #[must_use]
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The final `count` frames, oldest first.
    pub fn last(&self, count: usize) -> Result<&[Frame], PipelineError> {
        if count > self.frames.len() {
            return Err(PipelineError::InsufficientFrames {
                available: self.frames.len(),
                requested: count,
            });
        }
        Ok(&self.frames[self.frames.len() - count..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::point;

    fn frame(x: f64) -> Frame {
        Frame::new(vec!["H".into()], vec![point![x, 0.0, 0.0]])
    }

    #[test]
    fn test_last_keeps_order() {
        let trajectory = Trajectory::new((0..8).map(|i| frame(i as f64)).collect());
        let last = trajectory.last(3).unwrap();
        let xs = last.iter().map(|f| f.positions[0].x).collect::<Vec<_>>();
        assert_eq!(xs, vec![5.0, 6.0, 7.0]);
        assert_eq!(trajectory.last(8).unwrap().len(), 8);
    }

    #[test]
    fn test_last_insufficient() {
        let trajectory = Trajectory::new((0..8).map(|i| frame(i as f64)).collect());
        match trajectory.last(11) {
            Err(PipelineError::InsufficientFrames {
                available,
                requested,
            }) => {
                assert_eq!(available, 8);
                assert_eq!(requested, 11);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_symbol_runs() {
        let symbols = ["H", "H", "O", "H", "C", "C"];
        let frame = Frame::new(
            symbols.iter().map(|s| s.to_string()).collect(),
            vec![Point3::origin(); symbols.len()],
        );
        assert_eq!(
            frame.symbol_runs(),
            vec![("H", 2), ("O", 1), ("H", 1), ("C", 2)]
        );
    }

    #[test]
    fn test_periodicity() {
        let f = frame(0.0);
        assert!(!f.has_cell());
        assert!(!f.is_periodic());
        let f = f.with_cell(Matrix3::identity() * 5.0, [true, true, false]);
        assert!(f.has_cell());
        assert!(f.is_periodic());
    }
}
