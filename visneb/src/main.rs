use clap::Parser;
use log::{debug, error};
use neb_util_rust::{
    run, EnergyBackend, PipelineConfig, PipelineOutput, Psi4Settings, VmdSettings,
};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Render the last N images of an NEB trajectory with VMD and plot their energy profile.
///
/// VMD opens for you to set the style. Save it as style.vmd, close VMD, and the
/// images are rendered in batch mode and stitched into <traj>-visualize.png.
/// The energy profile goes to <traj>-chart.png.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// NEB trajectory file (ASE .traj or multi-frame .xyz)
    traj: PathBuf,

    /// Number of images in the NEB; the last N frames are extracted
    nimages: NonZeroUsize,

    /// Use Psi4 instead of the EMT potential
    #[arg(long, conflicts_with = "stored_energies")]
    psi4: bool,

    /// Use the energies stored in the trajectory
    #[arg(long)]
    stored_energies: bool,

    /// Replay a previously saved style.vmd instead of opening VMD interactively
    #[arg(long, value_name = "STYLE_FILE")]
    style: Option<PathBuf>,

    /// Do not wait for Enter before launching VMD
    #[arg(long)]
    no_prompt: bool,

    /// VMD executable
    #[arg(long, default_value = "vmd")]
    vmd: PathBuf,

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

    /// Directory where the montage and chart are written
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Delete the temporary directory after a successful run
    #[arg(long)]
    cleanup: bool,
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

    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.traj.clone(), self.nimages);
        config.backend = self.backend();
        config.vmd = VmdSettings {
            command: self.vmd,
            prompt: !self.no_prompt,
        };
        config.style = self.style;
        config.output_dir = self.output_dir;
        config.cleanup = self.cleanup;
        config
    }
}

fn report(output: &PipelineOutput) {
    println!("\n# image energy_eV relative_eV");
    for (&(i, e), &(_, rel)) in output
        .energies
        .points()
        .iter()
        .zip(output.energies.relative().iter())
    {
        println!("{i:>7} {e:>14.6} {rel:>12.6}");
    }
    if let Some(barrier) = output.energies.barrier() {
        println!("barrier: {barrier:.6} eV");
    }
    if let Some(workdir) = &output.workdir {
        println!("working files kept in {}", workdir.display());
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.into_config();
    debug!("{config:?}");
    println!(
        "Using {} for energy calculations...",
        config.backend.describe()
    );
    match run(&config) {
        Ok(output) => {
            report(&output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
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
        let cli = Cli::parse_from(["visneb", "neb.traj", "5"]);
        assert_eq!(cli.backend(), EnergyBackend::Emt);
        let cli = Cli::parse_from(["visneb", "--psi4", "--charge", "-1", "neb.traj", "5"]);
        match cli.backend() {
            EnergyBackend::Psi4(settings) => {
                assert_eq!(settings.charge, -1);
                assert_eq!(settings.basis, "def2-SVP");
            }
            other => panic!("unexpected backend {other:?}"),
        }
        let cli = Cli::parse_from(["visneb", "--stored-energies", "neb.traj", "5"]);
        assert_eq!(cli.backend(), EnergyBackend::Stored);
        assert!(Cli::try_parse_from(["visneb", "--psi4", "--stored-energies", "a.traj", "2"]).is_err());
    }

    #[test]
    fn test_image_count_must_be_positive() {
        assert!(Cli::try_parse_from(["visneb", "neb.traj", "0"]).is_err());
        assert!(Cli::try_parse_from(["visneb", "neb.traj", "-3"]).is_err());
        let config = Cli::parse_from(["visneb", "--no-prompt", "neb.traj", "11"]).into_config();
        assert_eq!(config.images.get(), 11);
        assert!(!config.vmd.prompt);
        assert!(!config.cleanup);
    }
}
