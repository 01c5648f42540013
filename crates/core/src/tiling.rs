//! Tile grid partitioning.
//!
//! Splits a `width x height` source into a `rows x cols` grid. The last
//! row and last column absorb the remainder when the dimensions do not
//! divide evenly, so the tiles always cover the source exactly with no
//! gaps or overlaps. A `1 x 1` grid degenerates to single-pass
//! processing.

use crate::error::CoreError;

/// Default grid used when no explicit layout is configured.
pub const DEFAULT_TILE_ROWS: u32 = 3;
pub const DEFAULT_TILE_COLS: u32 = 6;

/// Default upscale factor of the super-resolution capability.
pub const DEFAULT_UPSCALE: u32 = 4;

/// Upper bound on rows or columns of a grid.
pub const MAX_GRID_DIM: u32 = 64;

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    rows: u32,
    cols: u32,
}

impl TileGrid {
    pub fn new(rows: u32, cols: u32) -> Result<Self, CoreError> {
        if rows == 0 || cols == 0 {
            return Err(CoreError::Validation(format!(
                "Tile grid must have at least one row and column, got {rows}x{cols}"
            )));
        }
        if rows > MAX_GRID_DIM || cols > MAX_GRID_DIM {
            return Err(CoreError::Validation(format!(
                "Tile grid must not exceed {MAX_GRID_DIM}x{MAX_GRID_DIM}, got {rows}x{cols}"
            )));
        }
        Ok(Self { rows, cols })
    }

    /// The whole image as one tile.
    pub fn single() -> Self {
        Self { rows: 1, cols: 1 }
    }

    pub fn rows(self) -> u32 {
        self.rows
    }

    pub fn cols(self) -> u32 {
        self.cols
    }

    pub fn tile_count(self) -> usize {
        (self.rows * self.cols) as usize
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            rows: DEFAULT_TILE_ROWS,
            cols: DEFAULT_TILE_COLS,
        }
    }
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl Rect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    fn scaled(&self, factor: u32) -> Rect {
        Rect {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub row: u32,
    pub col: u32,
    /// Region of the source image.
    pub src: Rect,
    /// Region of the output canvas the upscaled tile fills.
    pub dst: Rect,
}

/// Every tile of one image, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlan {
    pub width: u32,
    pub height: u32,
    pub upscale: u32,
    /// Nominal tile height, `floor(height / rows)`.
    pub tile_h: u32,
    /// Nominal tile width, `floor(width / cols)`.
    pub tile_w: u32,
    pub tiles: Vec<Tile>,
}

impl TilePlan {
    pub fn canvas_width(&self) -> u32 {
        self.width * self.upscale
    }

    pub fn canvas_height(&self) -> u32 {
        self.height * self.upscale
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// Partition a `width x height` image according to `grid`.
pub fn plan(width: u32, height: u32, grid: TileGrid, upscale: u32) -> Result<TilePlan, CoreError> {
    if upscale == 0 {
        return Err(CoreError::Validation(
            "Upscale factor must be at least 1".to_string(),
        ));
    }
    if width.checked_mul(upscale).is_none() || height.checked_mul(upscale).is_none() {
        return Err(CoreError::Validation(format!(
            "Image {width}x{height} is too large for upscale factor {upscale}"
        )));
    }

    let tile_h = height / grid.rows;
    let tile_w = width / grid.cols;
    let mut tiles = Vec::with_capacity(grid.tile_count());

    for row in 0..grid.rows {
        let y0 = row * tile_h;
        let y1 = if row == grid.rows - 1 { height } else { (row + 1) * tile_h };
        for col in 0..grid.cols {
            let x0 = col * tile_w;
            let x1 = if col == grid.cols - 1 { width } else { (col + 1) * tile_w };
            let src = Rect { x0, y0, x1, y1 };
            tiles.push(Tile {
                row,
                col,
                src,
                dst: src.scaled(upscale),
            });
        }
    }

    Ok(TilePlan {
        width,
        height,
        upscale,
        tile_h,
        tile_w,
        tiles,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
