/// Per-pixel filter and activity state.
///
/// `l` is the current filtered brightness, `l_lag` the one-step-delayed value
/// used by the two-pole recursion, and `l_last` the brightness at the last
/// change that was propagated up the tile pyramid. The two activity flags are
/// independent per polarity; a pixel is overall-active while either is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelState {
    pub l: f32,
    pub l_lag: f32,
    pub l_last: f32,
    pub p: i8,
    pub active_on: bool,
    pub active_off: bool,
}

impl PixelState {
    /// True if any polarity of this pixel is active.
    pub fn is_active(&self) -> bool {
        self.active_on || self.active_off
    }

    /// True if the given polarity of this pixel is active.
    pub fn is_active_for(&self, polarity: i8) -> bool {
        if polarity > 0 {
            self.active_on
        } else {
            self.active_off
        }
    }

    pub fn mark_active(&mut self, polarity: i8) {
        if polarity > 0 {
            self.active_on = true;
        } else {
            self.active_off = true;
        }
    }

    pub fn mark_inactive(&mut self, polarity: i8) {
        if polarity > 0 {
            self.active_on = false;
        } else {
            self.active_off = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_struct_update_literal() {
        // downstream tests build pixel fixtures this way
        let px = PixelState {
            l: 1.0,
            active_on: true,
            ..PixelState::default()
        };
        assert!(px.is_active());
        assert!(!px.active_off);
    }

    #[test]
    fn test_initially_inactive() {
        let px = PixelState::default();
        assert!(!px.is_active());
        assert!(!px.is_active_for(1));
        assert!(!px.is_active_for(-1));
    }

    #[test]
    fn test_polarities_independent() {
        let mut px = PixelState::default();
        px.mark_active(1);
        assert!(px.is_active());
        assert!(px.is_active_for(1));
        assert!(!px.is_active_for(-1));

        px.mark_active(-1);
        px.mark_inactive(1);
        assert!(px.is_active(), "off polarity still holds the pixel active");
        assert!(!px.is_active_for(1));

        px.mark_inactive(-1);
        assert!(!px.is_active());
    }
}
