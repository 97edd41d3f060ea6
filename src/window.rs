use std::collections::VecDeque;

use tracing::debug;

use crate::error::ReconError;
use crate::event::Event;

/// Event window size before the first recompute.
pub const START_WINDOW_SIZE: u64 = 2000;

/// Feedback controller sizing the retained-event window.
///
/// Holds the event FIFO and the occupancy counters. After every retirement
/// pass the window is rescaled by the current occupied-tiles to
/// occupied-pixels ratio against the configured fill ratio:
///
///   window <- window * tiles * fill_denom / (pixels * fill_num)
///
/// Sparse activity (one pixel here and there, tiles barely filled) grows the
/// window so features get time to fill out; saturated tiles shrink it. The
/// target ratio is clamped so it never asks for less than one active pixel
/// per tile, nor more than 1.0.
pub struct EventWindowController {
    window_size: u64,
    fill_ratio_num: u64,
    fill_ratio_denom: u64,
    num_occupied_pixels: u64,
    num_occupied_tiles: u64,
    events: VecDeque<Event>,
}

impl EventWindowController {
    pub fn new(tile_size: u32, fill_ratio: f64) -> Result<Self, ReconError> {
        if !fill_ratio.is_finite() || fill_ratio <= 0.0 {
            return Err(ReconError::InvalidFillRatio { fill_ratio });
        }
        let fill_ratio_denom = 100u64;
        // how many tiles per pixel when a tile is fully filled
        let tiles_per_pixel = 1.0 / f64::from(tile_size * tile_size);
        // a fill ratio below one pixel per tile is not achievable
        let r = fill_ratio.max(tiles_per_pixel + 1e-3).min(1.0);
        let fill_ratio_num = ((tiles_per_pixel / r) * fill_ratio_denom as f64) as u64;
        let fill_ratio_num = fill_ratio_num.max(1);
        debug!(fill_ratio, fill_ratio_num, fill_ratio_denom, "fill ratio set");
        Ok(Self {
            window_size: START_WINDOW_SIZE,
            fill_ratio_num,
            fill_ratio_denom,
            num_occupied_pixels: 0,
            num_occupied_tiles: 0,
            events: VecDeque::new(),
        })
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn set_window_size(&mut self, size: u64) {
        self.window_size = size;
    }

    pub fn queue_len(&self) -> usize {
        self.events.len()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// True while the FIFO holds more events than the window allows.
    pub fn over_capacity(&self) -> bool {
        self.events.len() as u64 > self.window_size
    }

    pub fn pop_front(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn num_occupied_pixels(&self) -> u64 {
        self.num_occupied_pixels
    }

    pub fn num_occupied_tiles(&self) -> u64 {
        self.num_occupied_tiles
    }

    pub fn pixel_occupied(&mut self) {
        self.num_occupied_pixels += 1;
    }

    pub fn pixel_retired(&mut self) {
        self.num_occupied_pixels -= 1;
    }

    pub fn tile_occupied(&mut self) {
        self.num_occupied_tiles += 1;
    }

    pub fn tile_retired(&mut self) {
        self.num_occupied_tiles -= 1;
    }

    /// Rescale the window from the current occupancy ratio. Skipped while no
    /// pixel is occupied (the ratio is undefined and the window keeps its
    /// size).
    pub fn recompute(&mut self) {
        if self.num_occupied_pixels == 0 {
            return;
        }
        self.window_size = (self.window_size * self.num_occupied_tiles * self.fill_ratio_denom)
            / (self.num_occupied_pixels * self.fill_ratio_num);
    }
}
