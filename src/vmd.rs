//! Driving VMD: one interactive session where the user saves a style, then
//! one batch invocation per image that replays it.

use anyhow::Context;
use log::{debug, info, warn};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::command;
use crate::error::{PipelineError, PipelineResult};
use crate::extract::WorkDir;
use crate::naming::{FrameNaming, STYLE_FILE};

/// Lines VMD saves in a visualization state that would clash with loading a
/// new molecule per image.
const BANNED_PREFIXES: [&str; 2] = ["mol new", "mol delrep"];

const RENDER_PREAMBLE: &str = "\
display projection Orthographic
axes location Off
color Display Background gray

light 0 on
light 1 on
light 2 on
light 3 off
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmdSettings {
    pub command: PathBuf,
    /// Wait for Enter before opening VMD.
    pub prompt: bool,
}

impl Default for VmdSettings {
    fn default() -> Self {
        Self {
            command: PathBuf::from("vmd"),
            prompt: true,
        }
    }
}

fn print_instructions(workdir: &Path) {
    println!("\n*** Launching VMD ***");
    println!("Edit the representation, then SAVE VISUALIZATION STATE as '{STYLE_FILE}'.");
    println!("\nNOTE: save it in the working directory {}.", workdir.display());
    println!("VMD is started there, so the save dialog should already point at it.");
    println!("Close VMD when done.\n");
}

fn wait_for_enter() -> io::Result<()> {
    print!("Press Enter to continue...");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

/// Opens VMD on the first image and blocks until it exits. The user is expected
/// to save `style.vmd` into the working directory meanwhile.
pub fn launch_for_style(
    workdir: &WorkDir,
    first_xyz: &Path,
    settings: &VmdSettings,
) -> PipelineResult<PathBuf> {
    print_instructions(workdir.path());
    if settings.prompt {
        wait_for_enter()?;
    }
    let file = first_xyz.file_name().unwrap_or(first_xyz.as_os_str());
    let mut vmd = Command::new(&settings.command);
    vmd.arg(file).current_dir(workdir.path());
    debug!(">> {} (in {})", command::display(&vmd), workdir.path().display());
    // only a failed launch is a render error, the style file decides the rest
    let status = vmd.status().map_err(|err| PipelineError::Render {
        index: 1,
        reason: format!("failed to start `{}`: {err}", command::display(&vmd)),
    })?;
    let style = workdir.join(STYLE_FILE);
    if !style.is_file() {
        return Err(PipelineError::MissingStyleFile(style));
    }
    if !status.success() {
        warn!("VMD exited with {status}, using the saved style anyway");
    }
    info!("style saved: {}", style.display());
    Ok(style)
}

/// Copies a previously saved style into the working directory instead of
/// asking the user for one.
pub fn reuse_style(workdir: &WorkDir, source: &Path) -> PipelineResult<PathBuf> {
    if !source.is_file() {
        return Err(PipelineError::MissingStyleFile(source.to_path_buf()));
    }
    let style = workdir.join(STYLE_FILE);
    fs::copy(source, &style)?;
    info!("reusing style {}", source.display());
    Ok(style)
}

/// Drops the `mol new` / `mol delrep` lines from a saved style, in place.
pub fn sanitize_style(style: &Path) -> io::Result<usize> {
    let text = fs::read_to_string(style)?;
    let mut removed = 0;
    let cleaned = text
        .split_inclusive('\n')
        .filter(|line| {
            let banned = BANNED_PREFIXES
                .iter()
                .any(|prefix| line.trim().starts_with(*prefix));
            removed += usize::from(banned);
            !banned
        })
        .collect::<String>();
    fs::write(style, cleaned)?;
    Ok(removed)
}

/// Tcl script that renders a single image with the saved style.
#[must_use]
pub fn render_script(xyz: &str, tga: &str) -> String {
    format!(
        "{RENDER_PREAMBLE}
puts \"Rendering {xyz}\"
mol new {xyz} type xyz waitfor all

source {STYLE_FILE}

render TachyonInternal {tga}
mol delete top
quit
"
    )
}

/// Renders every image in batch mode, stopping at the first failure.
/// Returns the `.tga` paths in image order.
pub fn render_frames(
    workdir: &WorkDir,
    naming: &FrameNaming,
    count: usize,
    settings: &VmdSettings,
) -> PipelineResult<Vec<PathBuf>> {
    let style = workdir.join(STYLE_FILE);
    if !style.is_file() {
        return Err(PipelineError::MissingStyleFile(style));
    }
    let removed = sanitize_style(&style)?;
    info!("sanitized {STYLE_FILE}: {removed} lines removed");
    let mut stills = Vec::with_capacity(count);
    for index in 1..=count {
        let script = naming.render_script(index);
        let tga = naming.tga(index);
        fs::write(
            workdir.join(&script),
            render_script(&naming.xyz(index), &tga),
        )?;
        info!("rendering image {} of {count}", naming.index(index));
        command::run(
            Command::new(&settings.command)
                .args(["-dispdev", "text", "-e"])
                .arg(&script)
                .current_dir(workdir.path()),
            true,
        )
        .context(format!("rendering {}", naming.xyz(index)))
        .map_err(|err| PipelineError::Render {
            index,
            reason: format!("{err:#}"),
        })?;
        let tga_path = workdir.join(&tga);
        if !tga_path.is_file() {
            return Err(PipelineError::Render {
                index,
                reason: format!("VMD did not write {tga}"),
            });
        }
        stills.push(tga_path);
    }
    Ok(stills)
}
