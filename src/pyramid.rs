use tracing::{debug, trace};

use crate::error::ReconError;
use crate::pixel::PixelState;
use crate::tile::{TileMode, TileState};
use crate::{ACTIVITY_DELTA_THRESHOLD, AVG_TOLERANCE};

/// Tile-size factors tried when building levels above the base, smallest
/// first.
const LEVEL_FACTORS: [u32; 4] = [2, 3, 5, 7];

/// One level of the activity pyramid.
///
/// `tile_size_x/y` are measured in subtiles of the level below (pixels at
/// level 0); `width`/`height` are this level's own dimensions in tiles.
pub struct TileLevel {
    tile_size_x: u16,
    tile_size_y: u16,
    width: u16,
    height: u16,
    area: f32,
    inv_area: f32,
    tiles: Vec<TileState>,
}

impl TileLevel {
    fn new(tile_size_x: u32, tile_size_y: u32, width: u32, height: u32) -> Self {
        let area = (tile_size_x * tile_size_y) as f32;
        Self {
            tile_size_x: tile_size_x as u16,
            tile_size_y: tile_size_y as u16,
            width: width as u16,
            height: height as u16,
            area,
            inv_area: 1.0 / area,
            tiles: vec![TileState::default(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn tile_size(&self) -> (u16, u16) {
        (self.tile_size_x, self.tile_size_y)
    }

    pub fn tiles(&self) -> &[TileState] {
        &self.tiles
    }
}

/// Stack of tile levels summarizing pixel activity and brightness.
///
/// Level 0 summarizes the pixel grid in tiles of the configured size; every
/// level above summarizes the one below. Levels live in a single indexed
/// `Vec`; parent and child are expressed as `level + 1` / `level - 1`, with
/// the pixel grid standing in as the child of level 0. Activation edges
/// propagate upward (`sub_tile_active` / `sub_tile_inactive`), large
/// brightness deltas propagate upward with forced average corrections pushed
/// back down into still-inactive regions (`subtile_has_changed` /
/// `set_state`). Built once at initialization, never resized.
pub struct ActivityTilePyramid {
    levels: Vec<TileLevel>,
    grid_width: usize,
    grid_height: usize,
    activity_threshold: u16,
}

impl ActivityTilePyramid {
    /// Build the pyramid for a `width` x `height` pixel grid.
    ///
    /// `tile_size` must evenly divide both dimensions and its square must fit
    /// the per-tile active-count range. Levels above the base are created by
    /// repeatedly factoring the remaining tile-grid dimensions by the
    /// smallest of {2, 3, 5, 7} dividing both; when no factor applies the
    /// remainder becomes the single apex tile.
    pub fn new(
        width: u32,
        height: u32,
        tile_size: u32,
        activity_threshold: u16,
    ) -> Result<Self, ReconError> {
        if tile_size == 0 || width % tile_size != 0 || height % tile_size != 0 {
            return Err(ReconError::TileSizeMismatch {
                width,
                height,
                tile_size,
            });
        }
        if tile_size * tile_size > u32::from(u16::MAX) {
            return Err(ReconError::TileSizeTooLarge {
                tile_size,
                max: u32::from(u16::MAX),
            });
        }
        let mut levels = Vec::new();
        let mut w = width / tile_size;
        let mut h = height / tile_size;
        levels.push(TileLevel::new(tile_size, tile_size, w, h));
        debug!(level = 0, tiles_w = w, tiles_h = h, tile_size, "created base tile level");
        loop {
            let factor = LEVEL_FACTORS.iter().find(|&&f| w % f == 0 && h % f == 0);
            match factor {
                Some(&f) => {
                    w /= f;
                    h /= f;
                    levels.push(TileLevel::new(f, f, w, h));
                    debug!(level = levels.len() - 1, tiles_w = w, tiles_h = h, factor = f,
                           "created tile level");
                }
                None => {
                    // no factor left: the remainder becomes the apex tile,
                    // whose area must still fit the active-count range
                    if w * h > u32::from(u16::MAX) {
                        return Err(ReconError::ApexAreaTooLarge {
                            width: w,
                            height: h,
                            max: u32::from(u16::MAX),
                        });
                    }
                    levels.push(TileLevel::new(w, h, 1, 1));
                    debug!(level = levels.len() - 1, apex_w = w, apex_h = h,
                           "created apex tile level");
                    break;
                }
            }
        }
        Ok(Self {
            levels,
            grid_width: width as usize,
            grid_height: height as usize,
            activity_threshold: activity_threshold.max(1),
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &TileLevel {
        &self.levels[level]
    }

    fn tile_index(&self, level: usize, x_t: u16, y_t: u16) -> Result<usize, ReconError> {
        let lvl = &self.levels[level];
        if x_t >= lvl.width || y_t >= lvl.height {
            return Err(ReconError::TileIndexOutOfRange { level, x: x_t, y: y_t });
        }
        Ok(usize::from(y_t) * usize::from(lvl.width) + usize::from(x_t))
    }

    /// Tile coordinates of the tile at `level` containing subtile (x, y) of
    /// the level below.
    fn locate(&self, level: usize, x: u16, y: u16) -> (u16, u16) {
        let lvl = &self.levels[level];
        (x / lvl.tile_size_x, y / lvl.tile_size_y)
    }

    pub fn tile(&self, level: usize, x_t: u16, y_t: u16) -> Result<&TileState, ReconError> {
        let idx = self.tile_index(level, x_t, y_t)?;
        Ok(&self.levels[level].tiles[idx])
    }

    pub fn tile_average(&self, level: usize, x_t: u16, y_t: u16) -> Result<f32, ReconError> {
        Ok(self.tile(level, x_t, y_t)?.l)
    }

    pub fn tile_active_count(&self, level: usize, x_t: u16, y_t: u16) -> Result<u16, ReconError> {
        Ok(self.tile(level, x_t, y_t)?.num_active)
    }

    pub fn tile_is_active(&self, level: usize, x_t: u16, y_t: u16) -> Result<bool, ReconError> {
        Ok(self.tile(level, x_t, y_t)?.is_active())
    }

    /// A subtile of `level` (a pixel, for level 0) at (x, y) went active:
    /// bump the containing tile's count and propagate the activation edge
    /// upward when the count crosses the threshold.
    pub fn sub_tile_active(&mut self, level: usize, x: u16, y: u16) -> Result<(), ReconError> {
        let (x_t, y_t) = self.locate(level, x, y);
        let idx = self.tile_index(level, x_t, y_t)?;
        let area = u32::from(self.levels[level].tile_size_x)
            * u32::from(self.levels[level].tile_size_y);
        let threshold = self.activity_threshold;
        let tile = &mut self.levels[level].tiles[idx];
        if u32::from(tile.num_active) >= area {
            return Err(ReconError::TileCountOverflow { level, x: x_t, y: y_t });
        }
        tile.num_active += 1;
        if tile.mode == TileMode::Inactive && tile.num_active >= threshold {
            tile.mode = TileMode::Active;
            if level + 1 < self.levels.len() {
                self.sub_tile_active(level + 1, x_t, y_t)?;
            }
        }
        Ok(())
    }

    /// Symmetric to [`sub_tile_active`](Self::sub_tile_active): a subtile went
    /// inactive.
    pub fn sub_tile_inactive(&mut self, level: usize, x: u16, y: u16) -> Result<(), ReconError> {
        let (x_t, y_t) = self.locate(level, x, y);
        let idx = self.tile_index(level, x_t, y_t)?;
        let threshold = self.activity_threshold;
        let tile = &mut self.levels[level].tiles[idx];
        if tile.num_active == 0 {
            return Err(ReconError::EmptyTileDecrement { level, x: x_t, y: y_t });
        }
        tile.num_active -= 1;
        if tile.mode == TileMode::Active && tile.num_active < threshold {
            tile.mode = TileMode::Inactive;
            if level + 1 < self.levels.len() {
                self.sub_tile_inactive(level + 1, x_t, y_t)?;
            }
        }
        Ok(())
    }

    /// Force tile (x_t, y_t) of `level` toward `target` average, called from
    /// the level above. Returns the tile's `l_last` after the update.
    ///
    /// No-op when the tile is active (or reporting), or when its average is
    /// already within tolerance of the target. Otherwise the target is pushed
    /// recursively to every child and the tile average recomputed as the mean
    /// of the children's `l_last`.
    pub fn set_state(
        &mut self,
        level: usize,
        target: f32,
        x_t: u16,
        y_t: u16,
        pixels: &mut [PixelState],
    ) -> Result<f32, ReconError> {
        let idx = self.tile_index(level, x_t, y_t)?;
        let tile = self.levels[level].tiles[idx];
        if tile.is_active() {
            return Ok(tile.l_last);
        }
        if (target - tile.l).abs() <= AVG_TOLERANCE {
            return Ok(tile.l_last);
        }
        let new_avg = self.update_children(level, target, x_t, y_t, pixels)?;
        let tile = &mut self.levels[level].tiles[idx];
        tile.l = new_avg;
        tile.l_last = new_avg;
        Ok(new_avg)
    }

    /// Push `target` to all children of tile (x_t, y_t) and return the
    /// resulting mean of the children's `l_last`. Active children (including
    /// the one currently reporting upward) keep their value and contribute
    /// their last propagated one.
    fn update_children(
        &mut self,
        level: usize,
        target: f32,
        x_t: u16,
        y_t: u16,
        pixels: &mut [PixelState],
    ) -> Result<f32, ReconError> {
        let lvl = &self.levels[level];
        let (tsx, tsy) = (u32::from(lvl.tile_size_x), u32::from(lvl.tile_size_y));
        let inv_area = lvl.inv_area;
        let xs = u32::from(x_t) * tsx;
        let ys = u32::from(y_t) * tsy;
        let mut sum = 0.0f32;
        if level == 0 {
            for xi in xs..xs + tsx {
                for yi in ys..ys + tsy {
                    let px = &mut pixels[yi as usize * self.grid_width + xi as usize];
                    if !px.is_active() {
                        px.l = target;
                        px.l_last = target;
                        sum += target;
                    } else {
                        sum += px.l_last;
                    }
                }
            }
        } else {
            for xi in xs..xs + tsx {
                for yi in ys..ys + tsy {
                    sum += self.set_state(level - 1, target, xi as u16, yi as u16, pixels)?;
                }
            }
        }
        Ok(sum * inv_area)
    }

    /// Re-verify the tile-average invariant for tile (x_t, y_t) by summing
    /// the children's `l_last`. A mismatch beyond tolerance is a fatal
    /// internal error.
    pub fn check_tile_average(
        &self,
        level: usize,
        x_t: u16,
        y_t: u16,
        pixels: &[PixelState],
    ) -> Result<(), ReconError> {
        let idx = self.tile_index(level, x_t, y_t)?;
        let lvl = &self.levels[level];
        let (tsx, tsy) = (u32::from(lvl.tile_size_x), u32::from(lvl.tile_size_y));
        let xs = u32::from(x_t) * tsx;
        let ys = u32::from(y_t) * tsy;
        let mut sum = 0.0f32;
        for xi in xs..xs + tsx {
            for yi in ys..ys + tsy {
                sum += if level == 0 {
                    pixels[yi as usize * self.grid_width + xi as usize].l_last
                } else {
                    let child = self.tile_index(level - 1, xi as u16, yi as u16)?;
                    self.levels[level - 1].tiles[child].l_last
                };
            }
        }
        let computed = sum * lvl.inv_area;
        let stored = lvl.tiles[idx].l;
        if (computed - stored).abs() >= AVG_TOLERANCE {
            return Err(ReconError::TileAverageMismatch {
                level,
                x: x_t,
                y: y_t,
                stored,
                computed,
            });
        }
        Ok(())
    }

    /// A subtile at (x, y) of the level below reports that its average moved
    /// by `delta`: fold the delta into this tile's average, push the implied
    /// correction down to non-active children, re-verify the invariant, and
    /// forward the remaining tile-level delta to the parent if it still
    /// exceeds the activity-delta threshold. While forwarding, the tile is
    /// held in the Reporting state so the parent's descent skips it.
    pub fn subtile_has_changed(
        &mut self,
        level: usize,
        delta: f32,
        x: u16,
        y: u16,
        pixels: &mut [PixelState],
    ) -> Result<(), ReconError> {
        let (x_t, y_t) = self.locate(level, x, y);
        let idx = self.tile_index(level, x_t, y_t)?;
        let tile = self.levels[level].tiles[idx];
        let target = (tile.l * self.levels[level].area + delta) * self.levels[level].inv_area;
        let new_l = self.update_children(level, target, x_t, y_t, pixels)?;
        self.levels[level].tiles[idx].l = new_l;
        self.check_tile_average(level, x_t, y_t, pixels)?;
        let d_tile = new_l - tile.l_last;
        if d_tile.abs() > ACTIVITY_DELTA_THRESHOLD && level + 1 < self.levels.len() {
            trace!(level, x_t, y_t, d_tile, "forwarding tile delta upward");
            let t = &mut self.levels[level].tiles[idx];
            t.l_last = new_l;
            let was_active = t.is_active();
            if !was_active {
                t.mode = TileMode::Reporting;
            }
            let forwarded = self.subtile_has_changed(level + 1, d_tile, x_t, y_t, pixels);
            if !was_active {
                self.levels[level].tiles[idx].mode = TileMode::Inactive;
            }
            forwarded?;
        }
        Ok(())
    }

    /// A pixel's propagated brightness changed: refresh the level-0 tile
    /// average (the pixel's own `l_last` already carries the change, so the
    /// invariant holds without touching its neighbors) and forward the tile
    /// delta upward when it is large enough.
    pub fn pixel_has_changed(
        &mut self,
        x: u16,
        y: u16,
        pixels: &mut [PixelState],
    ) -> Result<(), ReconError> {
        let (x_t, y_t) = self.locate(0, x, y);
        let idx = self.tile_index(0, x_t, y_t)?;
        let tile = self.levels[0].tiles[idx];
        // mean over the tile's pixels, in the same summation order as
        // check_tile_average so the invariant holds exactly
        let lvl = &self.levels[0];
        let (tsx, tsy) = (u32::from(lvl.tile_size_x), u32::from(lvl.tile_size_y));
        let xs = u32::from(x_t) * tsx;
        let ys = u32::from(y_t) * tsy;
        let mut sum = 0.0f32;
        for xi in xs..xs + tsx {
            for yi in ys..ys + tsy {
                sum += pixels[yi as usize * self.grid_width + xi as usize].l_last;
            }
        }
        let new_l = sum * lvl.inv_area;
        self.levels[0].tiles[idx].l = new_l;
        let d_tile = new_l - tile.l_last;
        if d_tile.abs() > ACTIVITY_DELTA_THRESHOLD && self.levels.len() > 1 {
            let t = &mut self.levels[0].tiles[idx];
            t.l_last = new_l;
            let was_active = t.is_active();
            if !was_active {
                t.mode = TileMode::Reporting;
            }
            let forwarded = self.subtile_has_changed(1, d_tile, x_t, y_t, pixels);
            if !was_active {
                self.levels[0].tiles[idx].mode = TileMode::Inactive;
            }
            forwarded?;
        }
        Ok(())
    }

    /// Check the average invariant for every non-active tile at every level.
    pub fn verify_averages(&self, pixels: &[PixelState]) -> Result<(), ReconError> {
        for level in 0..self.levels.len() {
            let (w, h) = (self.levels[level].width, self.levels[level].height);
            for y_t in 0..h {
                for x_t in 0..w {
                    let idx = usize::from(y_t) * usize::from(w) + usize::from(x_t);
                    if !self.levels[level].tiles[idx].is_active() {
                        self.check_tile_average(level, x_t, y_t, pixels)?;
                    }
                }
            }
        }
        Ok(())
    }
}
