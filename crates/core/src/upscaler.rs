//! The super-resolution capability, seen from the pipeline.
//!
//! The model is opaque: given one tile it synchronously returns that tile
//! enlarged by [`Upscaler::scale`] in both dimensions, or fails.
//! Implementations are assumed CPU-bound and not reentrant, so the
//! pipeline calls them from one thread per job, one tile at a time.

use image::imageops::{self, FilterType};
use image::RgbImage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct UpscaleError(pub String);

pub trait Upscaler: Send + Sync {
    /// Fixed multiplier applied to both dimensions of every tile.
    fn scale(&self) -> u32;

    fn upscale(&self, tile: &RgbImage) -> Result<RgbImage, UpscaleError>;
}

/// Interpolating upscaler used when no learned model is wired in.
#[derive(Debug, Clone)]
pub struct ResizeUpscaler {
    factor: u32,
    filter: FilterType,
}

impl ResizeUpscaler {
    pub fn new(factor: u32) -> Result<Self, UpscaleError> {
        if factor == 0 {
            return Err(UpscaleError("upscale factor must be at least 1".to_string()));
        }
        Ok(Self {
            factor,
            filter: FilterType::Lanczos3,
        })
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl Upscaler for ResizeUpscaler {
    fn scale(&self) -> u32 {
        self.factor
    }

    fn upscale(&self, tile: &RgbImage) -> Result<RgbImage, UpscaleError> {
        let (w, h) = tile.dimensions();
        let (out_w, out_h) = match (w.checked_mul(self.factor), h.checked_mul(self.factor)) {
            (Some(out_w), Some(out_h)) => (out_w, out_h),
            _ => return Err(UpscaleError(format!("tile {w}x{h} too large to upscale"))),
        };
        Ok(imageops::resize(tile, out_w, out_h, self.filter))
    }
}
