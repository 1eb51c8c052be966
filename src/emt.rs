//! Effective Medium Theory potential with ASE's parameter set.
//!
//! Energies are relative to the fcc bulk at its equilibrium density, so an
//! isolated atom has energy `-E0` (its cohesive energy).

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;

use crate::frame::Frame;
use crate::neighbors::pairs_within;

const BOHR: f64 = 0.529_177_210_563_841_1;
/// `(16 pi / 3)^(1/3) / sqrt(2)`, rounded the way the published parameters assume.
const BETA: f64 = 1.809;
const SQRT_3: f64 = 1.732_050_807_568_877_2;

//  E0 (eV), s0 (bohr), V0 (eV), eta2 (1/bohr), kappa (1/bohr), lambda (1/bohr), n0 (1/bohr^3)
const PARAMETERS: [(&str, [f64; 7]); 11] = [
    ("Al", [-3.28, 3.00, 1.493, 1.240, 2.000, 1.169, 0.00700]),
    ("Cu", [-3.51, 2.67, 2.476, 1.652, 2.740, 1.906, 0.00910]),
    ("Ag", [-2.96, 3.01, 2.132, 1.652, 2.790, 1.892, 0.00547]),
    ("Au", [-3.80, 3.00, 2.321, 1.674, 2.873, 2.182, 0.00703]),
    ("Ni", [-4.44, 2.60, 3.673, 1.669, 2.757, 1.948, 0.01030]),
    ("Pd", [-3.90, 2.87, 2.773, 1.818, 3.107, 2.155, 0.00688]),
    ("Pt", [-5.85, 2.90, 4.067, 1.812, 3.145, 2.192, 0.00802]),
    ("H", [-3.21, 1.31, 0.132, 2.652, 2.790, 3.892, 0.00547]),
    ("C", [-3.50, 1.81, 0.332, 1.652, 2.790, 1.892, 0.01322]),
    ("N", [-5.10, 1.88, 0.132, 1.652, 2.790, 1.892, 0.01222]),
    ("O", [-4.60, 1.95, 0.332, 1.652, 2.790, 1.892, 0.00850]),
];

#[derive(Debug, Clone, Copy)]
struct Species {
    e0: f64,
    s0: f64,
    v0: f64,
    eta2: f64,
    kappa: f64,
    lambda: f64,
    n0: f64,
    gamma1: f64,
    gamma2: f64,
}

pub struct Emt {
    rc: f64,
    acut: f64,
    species: HashMap<&'static str, Species>,
}

impl Default for Emt {
    fn default() -> Self {
        Self::new()
    }
}

impl Emt {
    #[must_use]
    pub fn new() -> Self {
        let max_s0 = PARAMETERS
            .iter()
            .map(|(_, p)| p[1])
            .fold(f64::NEG_INFINITY, f64::max)
            * BOHR;
        // cutoff between the third and fourth fcc shells
        let rc = BETA * max_s0 * 0.5 * (SQRT_3 + 2.0);
        let rr = rc * 2.0 * 2.0 / (SQRT_3 + 2.0);
        let acut = 9999.0_f64.ln() / (rr - rc);
        let species = PARAMETERS
            .iter()
            .map(|&(symbol, p)| {
                let s0 = p[1] * BOHR;
                let eta2 = p[3] / BOHR;
                let kappa = p[4] / BOHR;
                let (gamma1, gamma2) = [12.0, 6.0, 24.0].iter().enumerate().fold(
                    (0.0, 0.0),
                    |(g1, g2), (i, &n)| {
                        let r = s0 * BETA * ((i + 1) as f64).sqrt();
                        let x = n / (12.0 * (1.0 + (acut * (r - rc)).exp()));
                        (
                            g1 + x * (-eta2 * (r - BETA * s0)).exp(),
                            g2 + x * (-kappa / BETA * (r - BETA * s0)).exp(),
                        )
                    },
                );
                let species = Species {
                    e0: p[0],
                    s0,
                    v0: p[2],
                    eta2,
                    kappa,
                    lambda: p[5] / BOHR,
                    n0: p[6] / BOHR.powi(3),
                    gamma1,
                    gamma2,
                };
                (symbol, species)
            })
            .collect();
        Self { rc, acut, species }
    }

    /// Pair interaction cutoff (Å).
    fn cutoff(&self) -> f64 {
        self.rc + 0.5
    }

    /// Potential energy of a frame (eV).
    pub fn energy(&self, frame: &Frame) -> Result<f64> {
        if frame.symbols.len() != frame.positions.len() {
            bail!(
                "{} symbols for {} positions",
                frame.symbols.len(),
                frame.positions.len()
            );
        }
        let par = frame
            .symbols
            .iter()
            .map(|symbol| {
                self.species
                    .get(symbol.as_str())
                    .ok_or_else(|| anyhow!("no EMT parameters for {symbol}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut energy = 0.0;
        let mut sigma1 = vec![0.0; frame.atoms_count()];
        for pair in pairs_within(frame, self.cutoff())? {
            let (p1, p2, r) = (par[pair.i], par[pair.j], pair.r);
            let ksi = p2.n0 / p1.n0;
            let theta = 1.0 / (1.0 + (self.acut * (r - self.rc)).exp());
            let y1 = 0.5 * p1.v0 * (-p2.kappa * (r / BETA - p2.s0)).exp() * ksi / p1.gamma2 * theta;
            let y2 = 0.5 * p2.v0 * (-p1.kappa * (r / BETA - p1.s0)).exp() / ksi / p2.gamma2 * theta;
            energy -= y1 + y2;
            sigma1[pair.i] += (-p2.eta2 * (r - BETA * p2.s0)).exp() * ksi * theta / p1.gamma1;
            sigma1[pair.j] += (-p1.eta2 * (r - BETA * p1.s0)).exp() / ksi * theta / p2.gamma1;
        }
        for (p, &sigma) in par.iter().zip(&sigma1) {
            if sigma <= 0.0 {
                energy -= p.e0;
                continue;
            }
            let ds = -(sigma / 12.0).ln() / (BETA * p.eta2);
            let x = p.lambda * ds;
            let y = (-x).exp();
            let z = 6.0 * p.v0 * (-p.kappa * ds).exp();
            energy += p.e0 * ((1.0 + x) * y - 1.0) + z;
        }
        if !energy.is_finite() {
            return Err(anyhow!("EMT energy is not finite"));
        }
        Ok(energy)
    }
}
