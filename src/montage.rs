use image::{imageops, ImageFormat, Rgba, RgbaImage};
use log::info;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};

fn montage_error(path: &Path, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::Montage(format!("{}: {err}", path.display()))
}

/// Converts VMD's `.tga` renders into RGBA `.png` files next to them.
pub fn convert_to_png(stills: &[PathBuf]) -> PipelineResult<Vec<PathBuf>> {
    stills
        .iter()
        .map(|tga| {
            let png = tga.with_extension("png");
            let image = image::open(tga).map_err(|err| montage_error(tga, err))?;
            image
                .to_rgba8()
                .save_with_format(&png, ImageFormat::Png)
                .map_err(|err| montage_error(&png, err))?;
            Ok(png)
        })
        .collect()
}

/// Lays the stills out left to right in the given order. Shorter stills are
/// centred vertically on a transparent background.
#[must_use]
pub fn strip(images: &[RgbaImage]) -> RgbaImage {
    let height = images.iter().map(RgbaImage::height).max().unwrap_or(0);
    let width = images.iter().map(RgbaImage::width).sum();
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
    let mut x = 0;
    for image in images {
        let y = (height - image.height()) / 2;
        imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
        x += image.width();
    }
    canvas
}

/// Stitches `stills` (in image order) into one PNG at `output`.
pub fn compose(stills: &[PathBuf], expected: usize, output: &Path) -> PipelineResult<()> {
    if stills.len() < expected {
        return Err(PipelineError::Montage(format!(
            "{} stills for {expected} images",
            stills.len()
        )));
    }
    let images = stills
        .iter()
        .map(|path| {
            image::open(path)
                .map(|image| image.to_rgba8())
                .map_err(|err| montage_error(path, err))
        })
        .collect::<PipelineResult<Vec<_>>>()?;
    let montage = strip(&images);
    montage
        .save_with_format(output, ImageFormat::Png)
        .map_err(|err| montage_error(output, err))?;
    info!(
        "montage {}x{} written to {}",
        montage.width(),
        montage.height(),
        output.display()
    );
    Ok(())
}
