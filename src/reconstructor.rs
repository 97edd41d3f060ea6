use crate::error::ReconError;
use crate::event::Event;
use crate::pixel::PixelState;
use crate::pyramid::ActivityTilePyramid;
use crate::spatial_filter::SpatialFilter;
use crate::temporal_filter::TemporalFilter;
use crate::window::EventWindowController;
use crate::{ACTIVITY_DELTA_THRESHOLD, MAX_SENSOR_DIM};

/// Streaming brightness reconstructor.
///
/// Owns the pixel grid and orchestrates the full per-event pipeline: temporal
/// filter update, activity bookkeeping and duplicate suppression, window
/// retirement cascade with spatial denoising, and pyramid propagation. Each
/// event is fully processed before the next is accepted; a returned error
/// means the instance is faulted and must be discarded.
pub struct Reconstructor {
    width: usize,
    height: usize,
    tile_size: u16,
    pixels: Vec<PixelState>,
    filter: TemporalFilter,
    spatial: SpatialFilter,
    pyramid: ActivityTilePyramid,
    window: EventWindowController,
}

impl Reconstructor {
    /// Allocate the grid and pyramid and precompute the filter and window
    /// control constants. Image dimensions are fixed for the lifetime of the
    /// instance.
    pub fn new(
        width: u32,
        height: u32,
        cutoff_period: u32,
        tile_size: u32,
        fill_ratio: f64,
    ) -> Result<Self, ReconError> {
        Self::with_activity_threshold(width, height, cutoff_period, tile_size, fill_ratio, 1)
    }

    /// Like [`new`](Self::new) with an explicit tile activation threshold
    /// (minimum active pixels before a tile counts as active; default 1).
    pub fn with_activity_threshold(
        width: u32,
        height: u32,
        cutoff_period: u32,
        tile_size: u32,
        fill_ratio: f64,
        activity_threshold: u16,
    ) -> Result<Self, ReconError> {
        if width == 0 || height == 0 || width > MAX_SENSOR_DIM || height > MAX_SENSOR_DIM {
            return Err(ReconError::InvalidDimensions { width, height });
        }
        let filter = TemporalFilter::new(cutoff_period)?;
        let pyramid = ActivityTilePyramid::new(width, height, tile_size, activity_threshold)?;
        let window = EventWindowController::new(tile_size, fill_ratio)?;
        Ok(Self {
            width: width as usize,
            height: height as usize,
            tile_size: tile_size as u16,
            pixels: vec![PixelState::default(); (width * height) as usize],
            filter,
            spatial: SpatialFilter::Gaussian3x3,
            pyramid,
            window,
        })
    }

    /// Replace the denoising kernel (3x3 Gaussian by default).
    pub fn set_spatial_filter(&mut self, filter: SpatialFilter) {
        self.spatial = filter;
    }

    /// Sole streaming ingestion point. `polarity` is interpreted by sign.
    pub fn event(&mut self, x: u16, y: u16, polarity: i8) -> Result<(), ReconError> {
        if usize::from(x) >= self.width || usize::from(y) >= self.height {
            return Err(ReconError::CoordinatesOutOfRange {
                x,
                y,
                width: self.width as u32,
                height: self.height as u32,
            });
        }
        let idx = usize::from(y) * self.width + usize::from(x);
        let p: i8 = if polarity > 0 { 1 } else { -1 };
        let l = self.filter.apply(&mut self.pixels[idx], x, y, p)?;
        // how much the pixel moved since its last propagated value
        let delta_state = l - self.pixels[idx].l_last;

        if !self.pixels[idx].is_active_for(p) {
            // first event of this polarity since the pixel last retired
            if !self.pixels[idx].is_active() {
                self.window.pixel_occupied();
                let (tx, ty) = (x / self.tile_size, y / self.tile_size);
                if self.pyramid.tile_active_count(0, tx, ty)? == 0 {
                    self.window.tile_occupied();
                }
                self.pyramid.sub_tile_active(0, x, y)?;
            }
            self.pixels[idx].mark_active(p);
            self.window.push(Event::new(x, y, p));
            self.process_event_queue()?;
        }
        // duplicate same-polarity events still reach here: the filter ran,
        // only the bookkeeping above was skipped

        if delta_state.abs() > ACTIVITY_DELTA_THRESHOLD {
            self.pixels[idx].l_last = l;
            self.pyramid.pixel_has_changed(x, y, &mut self.pixels)?;
        }
        Ok(())
    }

    /// Retire events from the front of the FIFO while it exceeds the window,
    /// then let the controller rescale the window.
    fn process_event_queue(&mut self) -> Result<(), ReconError> {
        while self.window.over_capacity() {
            let Some(e) = self.window.pop_front() else {
                break;
            };
            let idx = usize::from(e.y) * self.width + usize::from(e.x);
            if !self.pixels[idx].is_active() {
                return Err(ReconError::RetiredInactivePixel { x: e.x, y: e.y });
            }
            self.pixels[idx].mark_inactive(e.polarity);
            if !self.pixels[idx].is_active() {
                // both polarities retired: denoise the pixel into its
                // neighborhood, then unwind the tile bookkeeping
                let (l, l_lag) =
                    self.spatial
                        .apply(&self.pixels, e.x, e.y, self.width, self.height);
                self.pixels[idx].l = l;
                self.pixels[idx].l_lag = l_lag;
                self.pyramid.sub_tile_inactive(0, e.x, e.y)?;
                let (tx, ty) = (e.x / self.tile_size, e.y / self.tile_size);
                if self.pyramid.tile_active_count(0, tx, ty)? == 0 {
                    self.window.tile_retired();
                }
                self.window.pixel_retired();
            }
        }
        self.window.recompute();
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Filtered brightness of one pixel.
    pub fn pixel_value(&self, x: u16, y: u16) -> Result<f32, ReconError> {
        if usize::from(x) >= self.width || usize::from(y) >= self.height {
            return Err(ReconError::CoordinatesOutOfRange {
                x,
                y,
                width: self.width as u32,
                height: self.height as u32,
            });
        }
        Ok(self.pixels[usize::from(y) * self.width + usize::from(x)].l)
    }

    pub fn pixels(&self) -> &[PixelState] {
        &self.pixels
    }

    pub fn pyramid(&self) -> &ActivityTilePyramid {
        &self.pyramid
    }

    pub fn tile_average(&self, level: usize, x_t: u16, y_t: u16) -> Result<f32, ReconError> {
        self.pyramid.tile_average(level, x_t, y_t)
    }

    pub fn tile_active_count(&self, level: usize, x_t: u16, y_t: u16) -> Result<u16, ReconError> {
        self.pyramid.tile_active_count(level, x_t, y_t)
    }

    pub fn tile_is_active(&self, level: usize, x_t: u16, y_t: u16) -> Result<bool, ReconError> {
        self.pyramid.tile_is_active(level, x_t, y_t)
    }

    pub fn event_window_size(&self) -> u64 {
        self.window.window_size()
    }

    pub fn num_occupied_pixels(&self) -> u64 {
        self.window.num_occupied_pixels()
    }

    pub fn num_occupied_tiles(&self) -> u64 {
        self.window.num_occupied_tiles()
    }

    /// Clamp the event window and immediately drain the queue down to it.
    /// Setting 0 retires everything currently held.
    pub fn set_event_window_size(&mut self, size: u64) -> Result<(), ReconError> {
        self.window.set_window_size(size);
        self.process_event_queue()
    }

    /// Check the tile-average invariant across the whole pyramid.
    pub fn check_invariants(&self) -> Result<(), ReconError> {
        self.pyramid.verify_averages(&self.pixels)
    }

    /// Min/max-normalized 8-bit rendering of the pixel grid. A flat image
    /// (no brightness range) maps to mid-gray.
    pub fn get_image(&self) -> Vec<u8> {
        let mut min_l = f32::INFINITY;
        let mut max_l = f32::NEG_INFINITY;
        for px in &self.pixels {
            min_l = min_l.min(px.l);
            max_l = max_l.max(px.l);
        }
        if !(max_l > min_l) {
            return vec![128; self.pixels.len()];
        }
        let scale = 255.0 / (max_l - min_l);
        self.pixels
            .iter()
            .map(|px| ((px.l - min_l) * scale) as u8)
            .collect()
    }
}
