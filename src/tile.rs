/// Activity mode of a tile.
///
/// `Reporting` is a transient state: the tile is forwarding a brightness delta
/// to its parent and must be excluded from top-down overrides for the duration
/// of that call, after which it returns to `Inactive`. Keeping it explicit
/// makes the exclusion checkable independent of call-stack ordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TileMode {
    #[default]
    Inactive,
    Active,
    Reporting,
}

/// One tile of one pyramid level.
///
/// `l` is the mean of the children's `l_last`; `l_last` is this tile's own
/// value at its last upward propagation. `num_active` counts active subtiles
/// (active pixels at level 0). Invariant: while the tile is not active, `l`
/// equals the arithmetic mean of the children's `l_last` within 1e-6.
#[derive(Clone, Copy, Debug, Default)]
pub struct TileState {
    pub l: f32,
    pub l_last: f32,
    pub num_active: u16,
    pub mode: TileMode,
}

impl TileState {
    /// Active or currently reporting upward; either way the tile is exempt
    /// from forced top-down overrides.
    pub fn is_active(&self) -> bool {
        self.mode != TileMode::Inactive
    }
}
