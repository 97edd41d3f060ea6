pub mod error;
pub mod event;
pub mod pixel;
pub mod pyramid;
pub mod reconstructor;
pub mod spatial_filter;
pub mod temporal_filter;
pub mod tile;
pub mod window;

/// Maximum allowed sensor dimension to prevent excessive memory allocation.
/// 32768 x 32768 is far beyond any real event camera sensor.
pub const MAX_SENSOR_DIM: u32 = 32768;

/// Brightness delta a tile must accumulate before the change is forwarded to
/// the next pyramid level. Smaller drift is absorbed locally.
pub const ACTIVITY_DELTA_THRESHOLD: f32 = 0.1;

/// Absolute tolerance for the tile-average consistency invariant and for the
/// top-down no-op check.
pub const AVG_TOLERANCE: f32 = 1e-6;
