use anyhow::{bail, Result};
use kd_tree::{KdPoint, KdTree};
use nalgebra::Vector3;

use crate::frame::Frame;

/// Position of an atom or one of its periodic images.
#[derive(Debug, Clone, Copy)]
pub struct Site {
    coords: [f64; 3],
    atom: usize,
    image: [i32; 3],
}

impl Site {
    fn new(coords: Vector3<f64>, atom: usize, image: [i32; 3]) -> Self {
        Self {
            coords: [coords.x, coords.y, coords.z],
            atom,
            image,
        }
    }

    #[must_use]
    pub fn coords(&self) -> Vector3<f64> {
        Vector3::new(self.coords[0], self.coords[1], self.coords[2])
    }
}

impl KdPoint for Site {
    type Scalar = f64;
    type Dim = typenum::U3;
    fn at(&self, i: usize) -> f64 {
        self.coords[i]
    }
}

/// A pair of atoms closer than the cutoff.
#[derive(Debug, Clone, Copy)]
pub struct Pair {
    pub i: usize,
    pub j: usize,
    pub r: f64,
}

fn image_range(frame: &Frame, cutoff: f64) -> Result<[i32; 3]> {
    if !frame.is_periodic() {
        return Ok([0; 3]);
    }
    let a = [
        frame.cell.row(0).transpose(),
        frame.cell.row(1).transpose(),
        frame.cell.row(2).transpose(),
    ];
    let volume = a[0].dot(&a[1].cross(&a[2])).abs();
    if volume < 1e-12 {
        bail!("periodic frame has a degenerate cell");
    }
    let mut range = [0; 3];
    for (k, n) in range.iter_mut().enumerate() {
        if frame.pbc[k] {
            let height = volume / a[(k + 1) % 3].cross(&a[(k + 2) % 3]).norm();
            *n = (cutoff / height).ceil() as i32;
        }
    }
    Ok(range)
}

/// Positions folded into the cell along the periodic axes. NEB images are
/// usually stored unwrapped, and the image range assumes fractional
/// coordinates in `[0, 1)`.
fn wrapped_positions(frame: &Frame) -> Result<Vec<Vector3<f64>>> {
    if !frame.is_periodic() {
        return Ok(frame.positions.iter().map(|p| p.coords).collect());
    }
    let lattice = frame.cell.transpose();
    let Some(inverse) = lattice.try_inverse() else {
        bail!("periodic frame has a degenerate cell");
    };
    Ok(frame
        .positions
        .iter()
        .map(|p| {
            let mut fractional = inverse * p.coords;
            for (k, f) in fractional.iter_mut().enumerate() {
                if frame.pbc[k] {
                    *f = f.rem_euclid(1.0);
                }
            }
            lattice * fractional
        })
        .collect())
}

/// Every pair of atoms (including periodic images) with `0 < r < cutoff`,
/// each unordered pair reported once.
pub fn pairs_within(frame: &Frame, cutoff: f64) -> Result<Vec<Pair>> {
    let [nx, ny, nz] = image_range(frame, cutoff)?;
    let positions = wrapped_positions(frame)?;
    let mut sites = Vec::new();
    for x in -nx..=nx {
        for y in -ny..=ny {
            for z in -nz..=nz {
                let shift = frame.cell.transpose() * Vector3::new(x as f64, y as f64, z as f64);
                sites.extend(
                    positions
                        .iter()
                        .enumerate()
                        .map(|(atom, p)| Site::new(p + shift, atom, [x, y, z])),
                );
            }
        }
    }
    let kdtree = KdTree::build_by_ordered_float(sites);
    let mut pairs = Vec::new();
    for (i, p) in positions.iter().enumerate() {
        let origin = Site::new(*p, i, [0; 3]);
        for site in kdtree.within_radius(&origin, cutoff) {
            let keep = site.atom > i || (site.atom == i && site.image > [0; 3]);
            if !keep {
                continue;
            }
            let r = (site.coords() - p).norm();
            if r > 0.0 && r < cutoff {
                pairs.push(Pair { i, j: site.atom, r });
            }
        }
    }
    Ok(pairs)
}
