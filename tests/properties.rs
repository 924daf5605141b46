use proptest::prelude::*;

use seat_map_client::config::ViewportConfig;
use seat_map_client::models::{SeatKey, SeatPatch, SeatStatus, Venue};
use seat_map_client::selection::SelectionSet;
use seat_map_client::store::SeatStore;
use seat_map_client::viewport::{GestureEvent, ViewportController, ViewportEvent};

fn venue() -> Venue {
    serde_json::from_value(serde_json::json!({
        "venueName": "Hall",
        "sections": [{"sectionId": "A", "rows": [
            {"rowNumber": 1, "seats": [
                {"seatNumber": 1, "price": 150, "status": "available",
                 "geometry": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"seatNumber": 2, "price": 150, "status": "available",
                 "geometry": {"x": 20, "y": 0, "width": 10, "height": 10}},
                {"seatNumber": 3, "price": 90, "status": "booked",
                 "geometry": {"x": 40, "y": 0, "width": 10, "height": 10}}
            ]}
        ]}]
    }))
    .unwrap()
}

fn gesture() -> impl Strategy<Value = GestureEvent> {
    prop_oneof![
        Just(GestureEvent::PinchStart),
        (-1.0f64..10.0).prop_map(|ratio| GestureEvent::PinchUpdate { ratio }),
        Just(GestureEvent::PinchEnd),
        Just(GestureEvent::PanStart),
        (-500.0f64..500.0, -500.0f64..500.0).prop_map(|(dx, dy)| GestureEvent::PanUpdate { dx, dy }),
        Just(GestureEvent::PanEnd),
        Just(GestureEvent::ReturnToOverview),
    ]
}

fn seat_key() -> impl Strategy<Value = SeatKey> {
    ("[A-C]", 1u8..5, 1u8..5).prop_map(|(s, r, n)| SeatKey::new(s, r.to_string(), n.to_string()))
}

fn status() -> impl Strategy<Value = SeatStatus> {
    prop_oneof![Just(SeatStatus::Available), Just(SeatStatus::Booked)]
}

proptest! {
    #[test]
    fn scale_stays_within_bounds(gestures in prop::collection::vec(gesture(), 1..60), ticks in 0usize..40) {
        let config = ViewportConfig::default();
        let mut controller = ViewportController::new(&config);

        for g in gestures {
            controller.handle(g);
            let target = controller.target().scale;
            prop_assert!(target >= config.min_scale && target <= config.max_scale);
            for _ in 0..ticks {
                controller.advance(std::time::Duration::from_millis(16));
                let shown = controller.transform().scale;
                prop_assert!(shown >= config.min_scale && shown <= config.max_scale);
            }
        }
    }

    #[test]
    fn toggle_twice_is_identity(
        preselected in prop::collection::vec(seat_key(), 0..8),
        key in seat_key(),
    ) {
        let mut selection = SelectionSet::new();
        for k in &preselected {
            if !selection.contains(k) {
                selection.toggle(k, SeatStatus::Available);
            }
        }
        let before = selection.clone();

        selection.toggle(&key, SeatStatus::Available);
        selection.toggle(&key, SeatStatus::Available);
        prop_assert_eq!(
            selection.iter().collect::<std::collections::HashSet<_>>(),
            before.iter().collect::<std::collections::HashSet<_>>()
        );
    }

    #[test]
    fn booked_toggle_never_changes_selection(
        preselected in prop::collection::vec(seat_key(), 0..8),
        key in seat_key(),
    ) {
        let mut selection = SelectionSet::new();
        for k in &preselected {
            if !selection.contains(k) {
                selection.toggle(k, SeatStatus::Available);
            }
        }
        let before = selection.clone();

        prop_assert!(!selection.toggle(&key, SeatStatus::Booked));
        prop_assert_eq!(selection, before);
    }

    #[test]
    fn patch_is_idempotent(seat in 1u8..5, status in status()) {
        let key = SeatKey::new("A", "1", seat.to_string());
        let patch = SeatPatch::new(&key, status);

        let mut once = SeatStore::from_venue(venue());
        once.apply_patch(&patch);
        let mut twice = once.clone();
        let second = twice.apply_patch(&patch);

        prop_assert!(!second.changed());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn detail_event_fires_once_per_upward_crossing(ratios in prop::collection::vec(0.3f64..2.5, 1..80)) {
        let config = ViewportConfig::default();
        let mut controller = ViewportController::new(&config);
        controller.pinch_start();

        // Базовый масштаб 1.0, значит порог пересекается при ratio > 1.5
        let crosses = ratios.iter().any(|&r| r > config.zoom_threshold);
        let mut fired = 0;
        for ratio in ratios {
            if controller.pinch_update(ratio) == Some(ViewportEvent::EnteredDetailView) {
                fired += 1;
            }
        }
        // Без возврата в обзор переход случается ровно один раз
        prop_assert_eq!(fired, usize::from(crosses));
    }
}

#[test]
fn repeated_updates_above_threshold_fire_once() {
    let mut controller = ViewportController::new(&ViewportConfig::default());
    controller.pinch_start();

    let events: Vec<_> = [1.2, 1.6, 1.7, 1.9, 2.0, 1.8]
        .into_iter()
        .filter_map(|ratio| controller.pinch_update(ratio))
        .collect();
    assert_eq!(events, vec![ViewportEvent::EnteredDetailView]);

    // Опускание ниже порога ничего не порождает
    assert_eq!(controller.pinch_update(1.0), None);
}

#[test]
fn return_to_overview_rearms_crossing() {
    let mut controller = ViewportController::new(&ViewportConfig::default());
    controller.pinch_start();
    assert_eq!(controller.pinch_update(1.8), Some(ViewportEvent::EnteredDetailView));

    controller.return_to_overview();
    assert_eq!(controller.pinch_update(1.9), None);
    assert_eq!(controller.pinch_update(1.2), None);
    assert_eq!(controller.pinch_update(1.6), Some(ViewportEvent::EnteredDetailView));
}
