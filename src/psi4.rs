use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::command;
use crate::frame::Frame;

pub const HARTREE_TO_EV: f64 = 27.211_386_245_988;

/// How Psi4 is invoked and which SCF it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Psi4Settings {
    pub command: PathBuf,
    pub basis: String,
    pub scf_type: String,
    pub reference: String,
    pub charge: i32,
    pub multiplicity: u32,
}

impl Default for Psi4Settings {
    fn default() -> Self {
        Self {
            command: PathBuf::from("psi4"),
            basis: "def2-SVP".into(),
            scf_type: "df".into(),
            reference: "rhf".into(),
            charge: 0,
            multiplicity: 1,
        }
    }
}

impl Psi4Settings {
    /// Psi4 input for a single point SCF energy of `frame`. Orientation and
    /// centre of mass are kept as given.
    #[must_use]
    pub fn input(&self, frame: &Frame) -> String {
        let mut input = String::from("molecule {\n");
        let _ = writeln!(input, "{} {}", self.charge, self.multiplicity);
        for (symbol, p) in frame.symbols.iter().zip(&frame.positions) {
            let _ = writeln!(input, "{symbol} {:.10} {:.10} {:.10}", p.x, p.y, p.z);
        }
        input.push_str("units angstrom\nno_reorient\nno_com\nsymmetry c1\n}\n\n");
        input.push_str("set {\n");
        let _ = writeln!(input, "  basis {}", self.basis);
        let _ = writeln!(input, "  scf_type {}", self.scf_type);
        let _ = writeln!(input, "  reference {}", self.reference);
        input.push_str("  e_convergence 1e-8\n  d_convergence 1e-8\n}\n\nenergy('scf')\n");
        input
    }

    /// Writes `input_path`, runs Psi4 on it in `dir` and returns the energy in eV.
    pub fn energy(&self, frame: &Frame, dir: &Path, input: &str, output: &str) -> Result<f64> {
        let input_path = dir.join(input);
        fs::write(&input_path, self.input(frame))
            .context(format!("Writing {}", input_path.to_string_lossy()))?;
        command::run(
            Command::new(&self.command)
                .arg(input)
                .arg(output)
                .current_dir(dir),
            true,
        )?;
        let output_path = dir.join(output);
        let text = fs::read_to_string(&output_path)
            .context(format!("Reading {}", output_path.to_string_lossy()))?;
        let hartree = parse_total_energy(&text)
            .context(format!("Parsing {}", output_path.to_string_lossy()))?;
        Ok(hartree * HARTREE_TO_EV)
    }
}

/// Last `Total Energy =` value of a Psi4 output (Hartree).
pub fn parse_total_energy(text: &str) -> Result<f64> {
    let re = Regex::new(r"Total Energy\s*=\s*(-?\d+\.\d+(?:[eE][-+]?\d+)?)")?;
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .last()
        .ok_or_else(|| anyhow!("no total energy found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::assert_f64_near;
    use nalgebra::point;

    fn water() -> Frame {
        Frame::new(
            vec!["O".into(), "H".into(), "H".into()],
            vec![
                point![0.0, 0.0, 0.0],
                point![0.96, 0.0, 0.0],
                point![-0.24, 0.93, 0.0],
            ],
        )
    }

    #[test]
    fn test_input() {
        let settings = Psi4Settings {
            charge: -1,
            multiplicity: 2,
            basis: "cc-pVDZ".into(),
            reference: "uhf".into(),
            ..Psi4Settings::default()
        };
        let input = settings.input(&water());
        assert!(input.starts_with("molecule {\n-1 2\nO 0.0000000000"));
        assert!(input.contains("H -0.2400000000 0.9300000000 0.0000000000\n"));
        assert!(input.contains("  basis cc-pVDZ\n"));
        assert!(input.contains("  reference uhf\n"));
        assert!(input.contains("  scf_type df\n"));
        assert!(input.trim_end().ends_with("energy('scf')"));
    }

    #[test]
    fn test_parse_total_energy() {
        let text = "\
  ==> Energetics <==

    Nuclear Repulsion Energy =              9.1681932964243487
    Total Energy =                        -75.9000000000000000

  ==> Energetics <==

    Total Energy =                        -76.0266327341917523
";
        assert_f64_near!(parse_total_energy(text).unwrap(), -76.0266327341917523);
        assert!(parse_total_energy("SCF did not converge").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_energy_with_fake_psi4() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake-psi4");
        fs::write(
            &fake,
            "#!/bin/sh\ngrep -q '^O ' \"$1\" || exit 1\nprintf '    Total Energy =   -1.0000000000\\n' > \"$2\"\n",
        )
        .unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();
        let settings = Psi4Settings {
            command: fake,
            ..Psi4Settings::default()
        };
        let energy = settings
            .energy(&water(), dir.path(), "psi4_001.in", "psi4_001.out")
            .unwrap();
        assert_f64_near!(energy, -HARTREE_TO_EV);
        assert!(dir.path().join("psi4_001.in").exists());
    }
}
