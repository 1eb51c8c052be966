use anyhow::Result;
use clap::Parser;
use itertools::Itertools;
use log::info;
use neb_util_rust::{
    evaluate, plot_energy_chart, select_images, ChartStyle, EnergyBackend, FrameNaming,
    Psi4Settings, WorkDir,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Print the energy profile of the last N images of an NEB trajectory.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// NEB trajectory file (ASE .traj or multi-frame .xyz)
    traj: PathBuf,

    /// Number of images in the NEB; the last N frames are used
    nimages: NonZeroUsize,

    /// Use Psi4 instead of the EMT potential
    #[arg(long, conflicts_with = "stored_energies")]
    psi4: bool,

    /// Use the energies stored in the trajectory
    #[arg(long)]
    stored_energies: bool,

    /// Psi4 executable
    #[arg(long, default_value = "psi4")]
    psi4_command: PathBuf,

    /// Psi4 basis set
    #[arg(long, default_value = "def2-SVP")]
    basis: String,

    /// Molecular charge for Psi4
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    charge: i32,

    /// Spin multiplicity for Psi4
    #[arg(long, default_value_t = 1)]
    multiplicity: u32,

    /// Also draw the chart into this PNG
    #[arg(short, long)]
    chart: Option<PathBuf>,
}

impl Cli {
    fn backend(&self) -> EnergyBackend {
        if self.psi4 {
            EnergyBackend::Psi4(Psi4Settings {
                command: self.psi4_command.clone(),
                basis: self.basis.clone(),
                charge: self.charge,
                multiplicity: self.multiplicity,
                ..Psi4Settings::default()
            })
        } else if self.stored_energies {
            EnergyBackend::Stored
        } else {
            EnergyBackend::Emt
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let backend = cli.backend();
    let frames = select_images(&cli.traj, cli.nimages)?;
    info!("{}: {}", cli.traj.display(), backend.describe());
    let naming = FrameNaming::new(frames.len());
    // Psi4 needs somewhere to put its input and output files
    let workdir = match backend {
        EnergyBackend::Psi4(_) => Some(WorkDir::create()?),
        _ => None,
    };
    let scratch = workdir
        .as_ref()
        .map_or_else(std::env::temp_dir, |w| w.path().to_path_buf());
    let series = evaluate(&frames, &backend, &scratch, &naming)?;
    let table = series
        .points()
        .iter()
        .zip(series.relative())
        .map(|(&(i, e), (_, rel))| format!("{i:>7}\t{e:14.6}\t{rel:12.6}"))
        .join("\n");
    println!("# image energy_eV relative_eV\n{table}");
    if let Some(chart) = cli.chart {
        plot_energy_chart(&series, &chart, ChartStyle::default())?;
    }
    if let Some(workdir) = workdir {
        println!("# psi4 files kept in {}", workdir.path().display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_backend_selection() {
        let cli = Cli::parse_from(["neb-energy", "neb.traj", "7"]);
        assert_eq!(cli.backend(), EnergyBackend::Emt);
        assert_eq!(cli.chart, None);
        let cli = Cli::parse_from([
            "neb-energy",
            "--psi4",
            "--basis",
            "cc-pVDZ",
            "--multiplicity",
            "2",
            "neb.traj",
            "7",
        ]);
        match cli.backend() {
            EnergyBackend::Psi4(settings) => {
                assert_eq!(settings.basis, "cc-pVDZ");
                assert_eq!(settings.multiplicity, 2);
                assert_eq!(settings.charge, 0);
            }
            other => panic!("unexpected backend {other:?}"),
        }
        let cli = Cli::parse_from(["neb-energy", "--stored-energies", "-c", "p.png", "a.xyz", "3"]);
        assert_eq!(cli.backend(), EnergyBackend::Stored);
        assert_eq!(cli.chart, Some(PathBuf::from("p.png")));
        let cli = Cli::parse_from(["neb-energy", "--psi4", "--charge", "-1", "neb.traj", "5"]);
        assert!(matches!(cli.backend(), EnergyBackend::Psi4(Psi4Settings { charge: -1, .. })));
        assert!(Cli::try_parse_from(["neb-energy", "--psi4", "--stored-energies", "a.traj", "2"]).is_err());
    }

    #[test]
    fn test_image_count_must_be_positive() {
        assert!(Cli::try_parse_from(["neb-energy", "neb.traj", "0"]).is_err());
        assert!(Cli::try_parse_from(["neb-energy", "neb.traj"]).is_err());
        let cli = Cli::parse_from(["neb-energy", "neb.traj", "11"]);
        assert_eq!(cli.nimages.get(), 11);
    }
}
