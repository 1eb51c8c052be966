pub mod chart;
pub mod command;
pub mod emt;
pub mod energy;
mod error;
pub mod extract;
mod frame;
pub mod math;
pub mod montage;
pub mod naming;
pub mod neighbors;
pub mod pipeline;
pub mod poscar;
pub mod psi4;
pub mod trajectory;
pub mod ulm;
pub mod vmd;
pub mod xyz;

pub use chart::{plot_energy_chart, ChartStyle};
pub use emt::Emt;
pub use energy::{evaluate, EnergyBackend, EnergySeries};
pub use error::{PipelineError, PipelineResult};
pub use extract::{extract_images, select_images, Extracted, WorkDir};
pub use frame::{Frame, Trajectory};
pub use naming::{output_names, FrameNaming, STYLE_FILE};
pub use pipeline::{run, PipelineConfig, PipelineOutput};
pub use psi4::Psi4Settings;
pub use vmd::VmdSettings;
