use crate::error::ReconError;
use crate::pixel::PixelState;

/// Two-pole per-event temporal filter.
///
/// Each event nudges the pixel brightness by the change in polarity, smoothed
/// by an IIR recursion whose coefficients are derived once from the configured
/// cutoff period (in events):
///
///   omega = 2*pi/T, phi = 2 - cos(omega)
///   alpha = (1 - sin(omega)) / cos(omega)
///   beta  = phi - sqrt(phi^2 - 1)
///
///   L' = alpha * L + (1 - alpha) * L_lag + beta * dp
///
/// where dp = p_new - p_prev. Duplicate same-polarity events give dp = 0 and
/// only let the recursion settle; a polarity flip gives dp = +-2.
pub struct TemporalFilter {
    c0: f32, // alpha
    c1: f32, // 1 - alpha
    c2: f32, // beta
}

impl TemporalFilter {
    /// Compute coefficients for the given cutoff period.
    ///
    /// Periods below 5 are rejected: cos(omega) reaches zero at T = 4 and the
    /// alpha formula degenerates.
    pub fn new(cutoff_period: u32) -> Result<Self, ReconError> {
        if cutoff_period < 5 {
            return Err(ReconError::InvalidCutoffPeriod {
                period: cutoff_period,
            });
        }
        let omega = 2.0 * std::f64::consts::PI / f64::from(cutoff_period);
        let phi = 2.0 - omega.cos();
        let alpha = (1.0 - omega.sin()) / omega.cos();
        let beta = phi - (phi * phi - 1.0).sqrt();
        Ok(Self {
            c0: alpha as f32,
            c1: (1.0 - alpha) as f32,
            c2: beta as f32,
        })
    }

    /// Run the filter for one event on one pixel and return the new
    /// brightness. Updates `l`, `l_lag` and `p`; the caller decides whether
    /// the change is large enough to propagate (`l_last` stays untouched).
    ///
    /// A non-finite result is a numerics bug and therefore fatal.
    pub fn apply(
        &self,
        px: &mut PixelState,
        x: u16,
        y: u16,
        polarity: i8,
    ) -> Result<f32, ReconError> {
        let p_new: i8 = if polarity > 0 { 1 } else { -1 };
        let dp = f32::from(p_new - px.p);
        let l = self.c0 * px.l + self.c1 * px.l_lag + self.c2 * dp;
        if !l.is_finite() {
            return Err(ReconError::NonFiniteFilterOutput { x, y });
        }
        px.l_lag = px.l;
        px.l = l;
        px.p = p_new;
        Ok(l)
    }

    pub fn alpha(&self) -> f32 {
        self.c0
    }

    pub fn beta(&self) -> f32 {
        self.c2
    }
}
