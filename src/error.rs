use thiserror::Error;

/// Errors raised by the reconstructor and its tile pyramid.
///
/// There is a single taxonomy: invariant violation or misuse. None of these
/// are recoverable — the incremental bookkeeping only pays off if the tile
/// averages hold exactly, so a detected inconsistency aborts the instance
/// rather than attempting repair. A faulted reconstructor must be discarded
/// and recreated, never resumed.
#[derive(Debug, Error)]
pub enum ReconError {
    #[error("invalid sensor dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("tile size {tile_size} does not evenly divide {width}x{height}")]
    TileSizeMismatch {
        width: u32,
        height: u32,
        tile_size: u32,
    },

    #[error("tile size {tile_size} too big, area exceeds active-count range {max}")]
    TileSizeTooLarge { tile_size: u32, max: u32 },

    #[error("apex tile {width}x{height} exceeds active-count range {max}")]
    ApexAreaTooLarge { width: u32, height: u32, max: u32 },

    #[error("cutoff period {period} too short, must be at least 5")]
    InvalidCutoffPeriod { period: u32 },

    #[error("fill ratio {fill_ratio} must be finite and positive")]
    InvalidFillRatio { fill_ratio: f64 },

    #[error("event coordinates ({x},{y}) outside {width}x{height} grid")]
    CoordinatesOutOfRange {
        x: u16,
        y: u16,
        width: u32,
        height: u32,
    },

    #[error("non-finite filter output at pixel ({x},{y})")]
    NonFiniteFilterOutput { x: u16, y: u16 },

    #[error("retiring already-inactive pixel ({x},{y})")]
    RetiredInactivePixel { x: u16, y: u16 },

    #[error("decrementing empty tile ({x},{y}) at level {level}")]
    EmptyTileDecrement { level: usize, x: u16, y: u16 },

    #[error("active-subtile count overflow in tile ({x},{y}) at level {level}")]
    TileCountOverflow { level: usize, x: u16, y: u16 },

    #[error("tile index ({x},{y}) outside level {level}")]
    TileIndexOutOfRange { level: usize, x: u16, y: u16 },

    #[error(
        "tile average invariant broken at level {level} tile ({x},{y}): \
         stored {stored}, children give {computed}"
    )]
    TileAverageMismatch {
        level: usize,
        x: u16,
        y: u16,
        stored: f32,
        computed: f32,
    },
}
