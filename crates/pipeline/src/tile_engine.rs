//! Tile partition, per-tile upscaling and stitching.
//!
//! Tiles are upscaled one at a time in row-major order on the calling
//! thread; the upscaler is not assumed reentrant. Each output is written
//! into a canvas pre-sized to `height*upscale x width*upscale` before the
//! per-tile callback fires, so observers never run ahead of the canvas.

use std::path::Path;

use image::imageops;
use image::RgbImage;
use superres_core::error::JobError;
use superres_core::tiling::{self, Tile, TileGrid};
use superres_core::upscaler::Upscaler;

/// Read and decode the source image into 8-bit RGB.
pub fn decode_source(path: &Path) -> Result<RgbImage, JobError> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(JobError::ImageNotFound(path.display().to_string()));
    }
    let image = image::ImageReader::open(path)
        .map_err(|e| JobError::ImageNotFound(format!("{}: {e}", path.display())))?
        .with_guessed_format()
        .map_err(|e| JobError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| JobError::Decode(e.to_string()))?;
    Ok(image.to_rgb8())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TileEngine {
    grid: TileGrid,
}

impl TileEngine {
    pub fn new(grid: TileGrid) -> Self {
        Self { grid }
    }

    /// Upscale `image` tile by tile and return the stitched canvas.
    ///
    /// `on_tile(tile, done, total)` runs once per tile, after that tile's
    /// pixels are on the canvas. Tiles with an empty source region (more
    /// grid rows or columns than pixels) are counted but not upscaled.
    /// The first failing tile aborts the whole run.
    pub fn process<F>(
        &self,
        image: &RgbImage,
        upscaler: &dyn Upscaler,
        mut on_tile: F,
    ) -> Result<RgbImage, JobError>
    where
        F: FnMut(&Tile, usize, usize),
    {
        let (width, height) = image.dimensions();
        let plan = tiling::plan(width, height, self.grid, upscaler.scale())
            .map_err(|e| JobError::Decode(e.to_string()))?;

        let mut canvas = RgbImage::new(plan.canvas_width(), plan.canvas_height());
        let total = plan.len();

        for (index, tile) in plan.tiles.iter().enumerate() {
            if !tile.src.is_empty() {
                let out = upscale_tile(image, tile, upscaler)?;
                imageops::replace(
                    &mut canvas,
                    &out,
                    i64::from(tile.dst.x0),
                    i64::from(tile.dst.y0),
                );
            }
            on_tile(tile, index + 1, total);
        }

        Ok(canvas)
    }
}

fn upscale_tile(
    image: &RgbImage,
    tile: &Tile,
    upscaler: &dyn Upscaler,
) -> Result<RgbImage, JobError> {
    let src = tile.src;
    let view = imageops::crop_imm(image, src.x0, src.y0, src.width(), src.height()).to_image();

    let out = upscaler.upscale(&view).map_err(|e| JobError::Inference {
        row: tile.row,
        col: tile.col,
        message: e.to_string(),
    })?;

    // A wrongly sized tile would leave gaps or overwrite its neighbours.
    let expected = (tile.dst.width(), tile.dst.height());
    if out.dimensions() != expected {
        return Err(JobError::Inference {
            row: tile.row,
            col: tile.col,
            message: format!(
                "upscaler returned {}x{}, expected {}x{}",
                out.width(),
                out.height(),
                expected.0,
                expected.1
            ),
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
