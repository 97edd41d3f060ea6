use approx::assert_abs_diff_eq;

use event_recon::reconstructor::Reconstructor;
use event_recon::ACTIVITY_DELTA_THRESHOLD;

// ---------------------------------------------------------------------------
// Scenario A: single ON event activates pixel, tile, and apex
// ---------------------------------------------------------------------------

#[test]
fn test_scenario_a_activation_reaches_apex() {
    let mut r = Reconstructor::new(4, 4, 5, 2, 0.5).unwrap();
    r.event(1, 1, 1).unwrap();

    // cutoff 5 gives beta = 0.327376; from rest dp = +1 so L = beta
    assert_abs_diff_eq!(r.pixel_value(1, 1).unwrap(), 0.327376, epsilon = 1e-5);
    assert!(r.pixels()[4 + 1].is_active());

    // tile (0,0) got its first active pixel and flipped active
    assert_eq!(r.tile_active_count(0, 0, 0).unwrap(), 1);
    assert!(r.tile_is_active(0, 0, 0).unwrap());

    // the activation edge propagated all the way to the apex
    let apex = r.pyramid().num_levels() - 1;
    assert_eq!(r.tile_active_count(apex, 0, 0).unwrap(), 1);
    assert!(r.tile_is_active(apex, 0, 0).unwrap());

    assert_eq!(r.num_occupied_pixels(), 1);
    assert_eq!(r.num_occupied_tiles(), 1);
    r.check_invariants().unwrap();
}

// ---------------------------------------------------------------------------
// Scenario B: retiring the event deactivates, denoises and unwinds the apex
// ---------------------------------------------------------------------------

#[test]
fn test_scenario_b_retirement_unwinds_to_apex() {
    let mut r = Reconstructor::new(4, 4, 5, 2, 0.5).unwrap();
    r.event(1, 1, 1).unwrap();
    let l_before = r.pixel_value(1, 1).unwrap();

    r.set_event_window_size(0).unwrap();

    // pixel fully retired and blended into its (all-zero) neighborhood:
    // interior 3x3 kernel keeps only the 0.25 center weight
    assert!(!r.pixels()[4 + 1].is_active());
    assert_abs_diff_eq!(r.pixel_value(1, 1).unwrap(), 0.25 * l_before, epsilon = 1e-6);

    // tile count back to zero, deactivation reached the apex
    assert_eq!(r.tile_active_count(0, 0, 0).unwrap(), 0);
    assert!(!r.tile_is_active(0, 0, 0).unwrap());
    let apex = r.pyramid().num_levels() - 1;
    assert_eq!(r.tile_active_count(apex, 0, 0).unwrap(), 0);
    assert!(!r.tile_is_active(apex, 0, 0).unwrap());

    assert_eq!(r.num_occupied_pixels(), 0);
    assert_eq!(r.num_occupied_tiles(), 0);
    // no occupied pixels: the window keeps the forced size
    assert_eq!(r.event_window_size(), 0);
    r.check_invariants().unwrap();
}

// ---------------------------------------------------------------------------
// Scenario C: large deltas ripple to the apex and force corrections back
// down into every non-active region
// ---------------------------------------------------------------------------

#[test]
fn test_scenario_c_apex_delta_forces_leaf_corrections() {
    let mut r = Reconstructor::new(4, 4, 5, 2, 0.5).unwrap();
    let apex = r.pyramid().num_levels() - 1;

    // hammer one pixel with alternating polarity; each flip is a dp = +-2
    // swing and the growing deltas eventually push the apex average past
    // the activity-delta threshold
    let mut polarity: i8 = 1;
    let mut moved = false;
    for _ in 0..50 {
        r.event(0, 0, polarity).unwrap();
        polarity = -polarity;
        if r.tile_average(apex, 0, 0).unwrap().abs() > ACTIVITY_DELTA_THRESHOLD {
            moved = true;
            break;
        }
    }
    assert!(moved, "apex average never crossed the threshold");

    // every pixel outside the active tile received the same forced
    // correction on the way up
    let forced = r.pixel_value(3, 3).unwrap();
    assert!(forced != 0.0, "correction never reached the far corner");
    for y in 0..4u16 {
        for x in 0..4u16 {
            if x < 2 && y < 2 {
                continue; // the active tile is exempt
            }
            assert_abs_diff_eq!(r.pixel_value(x, y).unwrap(), forced, epsilon = 1e-6);
        }
    }

    // and the consistency invariant still holds exactly
    r.check_invariants().unwrap();
}

// ---------------------------------------------------------------------------
// Streaming properties
// ---------------------------------------------------------------------------

#[test]
fn test_invariant_holds_after_every_event() {
    let mut r = Reconstructor::new(8, 8, 6, 2, 0.5).unwrap();
    for i in 0..200u16 {
        let x = (i * 3 + 1) % 8;
        let y = (i * 5 + 2) % 8;
        let polarity = if i % 3 == 0 { -1 } else { 1 };
        r.event(x, y, polarity).unwrap();
        r.check_invariants().unwrap();
    }
}

#[test]
fn test_invariant_holds_through_retirement() {
    let mut r = Reconstructor::new(8, 8, 6, 2, 0.5).unwrap();
    for i in 0..300u16 {
        let x = (i * 7 + 3) % 8;
        let y = (i * 11 + 1) % 8;
        let polarity = if i % 2 == 0 { 1 } else { -1 };
        r.event(x, y, polarity).unwrap();
        // clamp the window back down so the retirement cascade (spatial
        // blend, tile unwind, occupancy) runs on almost every event
        r.set_event_window_size(6).unwrap();
        r.check_invariants().unwrap();
    }
    assert!(r.num_occupied_pixels() <= 6);
}

#[test]
fn test_tile_counts_stay_in_range() {
    let mut r = Reconstructor::new(8, 8, 6, 2, 0.5).unwrap();
    r.set_event_window_size(10).unwrap();
    for i in 0..300u16 {
        r.event((i * 3) % 8, (i * 5) % 8, if i % 2 == 0 { 1 } else { -1 })
            .unwrap();
        let pyramid = r.pyramid();
        for level in 0..pyramid.num_levels() {
            let lvl = pyramid.level(level);
            let (tsx, tsy) = lvl.tile_size();
            let area = u32::from(tsx) * u32::from(tsy);
            for tile in lvl.tiles() {
                assert!(u32::from(tile.num_active) <= area);
            }
        }
    }
}

#[test]
fn test_full_drain_returns_to_quiescence() {
    let mut r = Reconstructor::new(8, 8, 6, 2, 0.5).unwrap();
    for i in 0..64u16 {
        r.event(i % 8, i / 8, 1).unwrap();
    }
    // the adaptive window retires pixels as the activity spreads out, so
    // only a remnant is still occupied when the stream ends
    assert!(r.num_occupied_pixels() > 0);
    r.set_event_window_size(0).unwrap();
    assert_eq!(r.num_occupied_pixels(), 0);
    assert_eq!(r.num_occupied_tiles(), 0);
    let pyramid = r.pyramid();
    for level in 0..pyramid.num_levels() {
        for tile in pyramid.level(level).tiles() {
            assert_eq!(tile.num_active, 0);
            assert!(!tile.is_active());
        }
    }
    r.check_invariants().unwrap();
}

#[test]
fn test_window_adapts_while_streaming() {
    // one pixel per tile spread across the grid keeps the tiles/pixels
    // ratio at 1.0, above the 0.5 target, so the window only ever grows
    let mut r = Reconstructor::new(8, 8, 30, 2, 0.5).unwrap();
    let mut last = r.event_window_size();
    for ty in 0..4u16 {
        for tx in 0..4u16 {
            r.event(tx * 2, ty * 2, 1).unwrap();
            let now = r.event_window_size();
            assert!(now >= last, "window shrank with ratio above target");
            last = now;
        }
    }
}
