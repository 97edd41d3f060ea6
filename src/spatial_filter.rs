use crate::pixel::PixelState;

/// Gaussian 3x3 kernel, weights sum to 1.
pub const GAUSSIAN_3X3: [[f32; 3]; 3] = [
    [0.0625, 0.125, 0.0625],
    [0.125, 0.25, 0.125],
    [0.0625, 0.125, 0.0625],
];

/// Gaussian 5x5 kernel, weights sum to 1.
pub const GAUSSIAN_5X5: [[f32; 5]; 5] = [
    [0.003663, 0.01465201, 0.02564103, 0.01465201, 0.003663],
    [0.01465201, 0.05860806, 0.0952381, 0.05860806, 0.01465201],
    [0.02564103, 0.0952381, 0.15018315, 0.0952381, 0.02564103],
    [0.01465201, 0.05860806, 0.0952381, 0.05860806, 0.01465201],
    [0.003663, 0.01465201, 0.02564103, 0.01465201, 0.003663],
];

/// Boundary-aware weighted-neighbor blend, applied when a pixel goes fully
/// inactive to smooth it into its surroundings.
///
/// Out-of-grid neighbors are simply omitted: their weight contributes zero and
/// no renormalization takes place, so boundary pixels blend slightly darker
/// toward zero. Only the brightness fields `l` and `l_lag` are blended; the
/// caller carries polarity, `l_last` and activity flags from the center pixel
/// unchanged.
pub enum SpatialFilter {
    Gaussian3x3,
    Gaussian5x5,
}

impl SpatialFilter {
    fn radius(&self) -> i32 {
        match self {
            SpatialFilter::Gaussian3x3 => 1,
            SpatialFilter::Gaussian5x5 => 2,
        }
    }

    fn weight(&self, dx: i32, dy: i32) -> f32 {
        match self {
            SpatialFilter::Gaussian3x3 => GAUSSIAN_3X3[(dy + 1) as usize][(dx + 1) as usize],
            SpatialFilter::Gaussian5x5 => GAUSSIAN_5X5[(dy + 2) as usize][(dx + 2) as usize],
        }
    }

    /// Blend the neighborhood of (x, y) and return the new (l, l_lag) pair.
    pub fn apply(
        &self,
        pixels: &[PixelState],
        x: u16,
        y: u16,
        width: usize,
        height: usize,
    ) -> (f32, f32) {
        let r = self.radius();
        let cx = i32::from(x);
        let cy = i32::from(y);
        let mut l = 0.0f32;
        let mut l_lag = 0.0f32;
        for dy in -r..=r {
            let ny = cy + dy;
            if ny < 0 || ny >= height as i32 {
                continue;
            }
            for dx in -r..=r {
                let nx = cx + dx;
                if nx < 0 || nx >= width as i32 {
                    continue;
                }
                let w = self.weight(dx, dy);
                let px = &pixels[ny as usize * width + nx as usize];
                l += w * px.l;
                l_lag += w * px.l_lag;
            }
        }
        (l, l_lag)
    }
}
