//! Controller integration tests against recording ports.
//!
//! Light patterns run with compressed timing unless the test checks the
//! default warning-blink bounds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pickbylight::PortSelectionController;
use pickbylight::app::commands::{CommandOutcome, StationCommand};
use pickbylight::app::content::ContentEntry;
use pickbylight::app::events::{ActivityEvent, ActivitySink, StationEvent};
use pickbylight::app::ports::{EventSink, Port};
use pickbylight::app::state::PortState;
use pickbylight::config::SignalTiming;
use pickbylight::error::Error;
use serde_json::json;

use crate::mock_hw::{RecordingPort, RecordingSink, Station, fast_timing, wait_until};

const SETTLE: Duration = Duration::from_secs(3);

fn assert_idle_and_dark(station: &Station, port: u32) {
    assert!(
        wait_until(SETTLE, || !station.controller.is_signalling(port)
            && !station.controller.is_warning(port)),
        "port {port} process did not finish"
    );
    assert_eq!(station.port(port).light(), 0);
}

// ── Select / state round trip ─────────────────────────────────

#[test]
fn select_then_get_state() {
    let station = Station::new(&[1, 2], fast_timing());
    assert!(station.controller.select(2, 3, "top shelf"));

    let state = station.controller.state(2).unwrap();
    assert_eq!(
        state,
        PortState {
            selected: true,
            amount_to_pick: 3,
            select_instructions: "top shelf".into(),
            work_finished: false,
        }
    );
    assert_eq!(station.controller.state(1).unwrap(), PortState::default());

    station.controller.deselect(2, false);
    assert_idle_and_dark(&station, 2);
}

#[test]
fn non_positive_amount_is_rejected_without_state_change() {
    let station = Station::new(&[1], fast_timing());
    assert!(!station.controller.select(1, 0, "none"));
    assert!(!station.controller.select(1, -4, "negative"));
    assert!(matches!(
        station.controller.try_select(1, 0, ""),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(station.controller.state(1).unwrap(), PortState::default());
    assert!(!station.controller.is_signalling(1));
    assert!(station.port(1).levels().is_empty());
}

#[test]
fn unknown_port_is_rejected_without_creating_state() {
    let station = Station::new(&[1, 2], fast_timing());
    assert!(!station.controller.select(9, 1, ""));
    assert_eq!(station.controller.try_select(9, 1, ""), Err(Error::NotFound(9)));
    assert!(!station.controller.deselect(9, false));
    assert_eq!(station.controller.try_deselect(9, true), Err(Error::NotFound(9)));
    assert!(station.controller.state(9).is_none());
    assert_eq!(station.controller.ports_state().len(), 2);
    assert!(!station.controller.simulate_activity(9));
}

#[test]
fn deselect_is_idempotent() {
    let station = Station::new(&[1], fast_timing());
    station.controller.select(1, 2, "x");
    assert!(station.controller.deselect(1, false));
    let once = station.controller.state(1).unwrap();
    assert!(station.controller.deselect(1, false));
    assert_eq!(station.controller.state(1).unwrap(), once);
    assert!(!once.selected);
    assert_eq!(once.amount_to_pick, 0);
    assert!(once.select_instructions.is_empty());
    assert_idle_and_dark(&station, 1);
}

#[test]
fn work_finished_deselects_and_marks_done() {
    let station = Station::new(&[4], fast_timing());
    station.controller.select(4, 1, "");
    assert!(station.controller.work_finished(4));
    let state = station.controller.state(4).unwrap();
    assert!(!state.selected);
    assert!(state.work_finished);
    assert_idle_and_dark(&station, 4);
}

// ── Signal process ────────────────────────────────────────────

#[test]
fn selected_port_ramps_to_full_and_fades_after_deselect() {
    let station = Station::new(&[1], fast_timing());
    station.controller.select(1, 1, "");
    assert!(station.controller.is_signalling(1));
    assert!(wait_until(SETTLE, || station.port(1).max_level() == 100));

    station.controller.deselect(1, false);
    assert_idle_and_dark(&station, 1);
    assert_eq!(station.port(1).levels().last(), Some(&0));
}

#[test]
fn concurrent_selects_never_overlap_ramps() {
    let station = Station::new(&[1], fast_timing());

    std::thread::scope(|s| {
        for i in 0..100 {
            let controller = &station.controller;
            s.spawn(move || {
                assert!(controller.select(1, 1 + i, "rush"));
            });
        }
    });
    std::thread::sleep(Duration::from_millis(400));
    station.controller.deselect(1, false);
    assert_idle_and_dark(&station, 1);

    let port = station.port(1);
    assert_eq!(port.writers().len(), 1, "more than one process drove the light");
    let levels = port.levels();
    for pair in levels.windows(2) {
        assert!(
            pair[0].abs_diff(pair[1]) <= 1,
            "light jumped from {} to {}",
            pair[0],
            pair[1]
        );
    }
    assert_eq!(
        station
            .sink
            .count(|e| matches!(e, StationEvent::Selected { port: 1, .. })),
        100
    );
}

#[test]
fn reselect_keeps_single_process_and_updates_parameters() {
    let station = Station::new(&[1], fast_timing());
    station.controller.select(1, 1, "first");
    station.controller.select(1, 5, "second");
    let state = station.controller.state(1).unwrap();
    assert_eq!(state.amount_to_pick, 5);
    assert_eq!(state.select_instructions, "second");
    std::thread::sleep(Duration::from_millis(100));
    station.controller.deselect(1, false);
    assert_idle_and_dark(&station, 1);
    assert_eq!(station.port(1).writers().len(), 1);
}

// ── Activity reconciliation ───────────────────────────────────

#[test]
fn activity_on_selected_port_confirms_pick() {
    let station = Station::new(&[1, 2], fast_timing());
    station.controller.select(1, 1, "one");
    assert!(station.controller.simulate_activity(1));

    assert!(wait_until(SETTLE, || !station.controller.state(1).unwrap().selected));
    let state = station.controller.state(1).unwrap();
    assert_eq!(state.amount_to_pick, 0);
    assert!(!state.work_finished);
    assert!(state.select_instructions.is_empty());
    assert_idle_and_dark(&station, 1);
    assert!(!station.controller.is_warning(1));
    assert_eq!(
        station
            .sink
            .count(|e| *e == StationEvent::PickConfirmed { port: 1 }),
        1
    );
}

#[test]
fn synthetic_activity_without_a_port_edge() {
    let station = Station::new(&[3], fast_timing());
    station.controller.select(3, 2, "");
    assert!(station.controller.activity_sink().notify(ActivityEvent::now(3)));
    assert!(wait_until(SETTLE, || !station.controller.state(3).unwrap().selected));
    assert_idle_and_dark(&station, 3);
}

#[test]
fn activity_on_idle_port_blinks_with_default_timing() {
    let station = Station::new(&[1], SignalTiming::default());
    let start = Instant::now();
    assert!(station.controller.simulate_activity(1));

    assert!(wait_until(Duration::from_secs(1), || station.port(1).light() > 0));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(station.controller.is_warning(1));
    assert!(wait_until(Duration::from_millis(1500), || station.port(1).light() == 0));
    assert!(!station.controller.state(1).unwrap().selected);

    assert_idle_and_dark(&station, 1);
    let ons = station.port(1).levels().iter().filter(|&&l| l == 100).count();
    assert!((1..=5).contains(&ons), "{ons} blinks");
    assert!(!station.controller.state(1).unwrap().selected);
    assert_eq!(
        station
            .sink
            .count(|e| *e == StationEvent::UnsolicitedActivity { port: 1 }),
        1
    );
}

#[test]
fn edges_inside_cooldown_produce_one_callback() {
    let station = Station::new(&[1], fast_timing());
    assert!(station.controller.simulate_activity(1));
    for _ in 0..5 {
        assert!(!station.controller.simulate_activity(1));
    }
    assert_idle_and_dark(&station, 1);
    assert_eq!(
        station
            .sink
            .count(|e| matches!(e, StationEvent::UnsolicitedActivity { .. })),
        1
    );
    assert!(station.controller.ports()[0].active);
}

#[test]
fn select_during_warning_hands_light_over_cleanly() {
    let station = Station::new(&[1], fast_timing());
    station.controller.simulate_activity(1);
    assert!(wait_until(SETTLE, || station.port(1).light() == 100));
    station.controller.select(1, 1, "");

    assert!(wait_until(SETTLE, || !station.controller.is_warning(1)));
    assert!(station.controller.state(1).unwrap().selected);
    assert!(wait_until(SETTLE, || station.controller.is_signalling(1)
        && station.port(1).writers().len() == 2));

    station.controller.deselect(1, false);
    assert_idle_and_dark(&station, 1);

    // All warning writes precede all signal writes.
    let history = station.port(1).history();
    let switches = history
        .windows(2)
        .filter(|w| w[0].thread != w[1].thread)
        .count();
    assert_eq!(switches, 1);
}

#[test]
fn activity_during_fade_out_still_blinks() {
    let timing = SignalTiming {
        ramp_step_ms: 3,
        hold_slice_ms: 20,
        hold_slices: 50,
        ..fast_timing()
    };
    let station = Station::new(&[1], timing);
    station.controller.select(1, 1, "");
    assert!(wait_until(SETTLE, || station.port(1).light() == 100));

    station.controller.deselect(1, false);
    let mark = station.port(1).levels().len();
    assert!(wait_until(SETTLE, || {
        let light = station.port(1).light();
        light > 0 && light < 100
    }));
    assert!(station.controller.is_signalling(1));
    assert!(station.controller.simulate_activity(1));

    // The fade reaches 0 first, then the warning lights the port again.
    assert!(wait_until(SETTLE, || {
        let levels = station.port(1).levels();
        let after = &levels[mark..];
        after
            .iter()
            .position(|&l| l == 0)
            .is_some_and(|zero| after[zero..].contains(&100))
    }));
    assert_idle_and_dark(&station, 1);
    assert!(!station.controller.state(1).unwrap().selected);
    assert_eq!(station.port(1).writers().len(), 2);
}

#[test]
fn amount_beyond_range_is_rejected_without_state_change() {
    let station = Station::new(&[1], fast_timing());
    let too_many = i64::from(u32::MAX) + 1;
    assert!(!station.controller.select(1, too_many, ""));
    assert!(matches!(
        station.controller.try_select(1, too_many, ""),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(station.controller.state(1).unwrap(), PortState::default());
    assert!(!station.controller.is_signalling(1));
}

#[test]
fn deselect_all_finishes_every_port() {
    let station = Station::new(&[1, 2, 3], fast_timing());
    for p in [1, 2] {
        station.controller.select(p, 1, "");
    }
    assert!(station.controller.deselect_all());
    for (_, state) in station.controller.ports_state() {
        assert!(!state.selected);
        assert!(state.work_finished);
        assert_eq!(state.amount_to_pick, 0);
    }
    for p in [1, 2, 3] {
        assert_idle_and_dark(&station, p);
    }
}

// ── Content ───────────────────────────────────────────────────

fn stocked() -> Station {
    let station = Station::new(&[1, 2, 3], fast_timing());
    station.controller.set_content(
        1,
        ContentEntry::new()
            .with("display_name", "Screws")
            .with("name", "screw-m3"),
    );
    station.controller.set_content(
        2,
        ContentEntry::new()
            .with("display_name", "Washers")
            .with("name", "washer-m4"),
    );
    station
        .controller
        .set_content(3, ContentEntry::new().with("name", "washer-m4"));
    station
}

#[test]
fn select_by_content_name_picks_first_in_registry_order() {
    let station = stocked();
    assert_eq!(
        station
            .controller
            .select_by_content_name("washer-m4", 2, "two please"),
        (true, Some(2))
    );
    assert!(station.controller.state(2).unwrap().selected);
    assert!(!station.controller.state(3).unwrap().selected);

    assert_eq!(
        station.controller.select_by_content_name("bolt", 1, ""),
        (false, None)
    );

    assert_eq!(
        station.controller.deselect_by_content_name("washer-m4", true),
        (true, Some(2))
    );
    assert!(station.controller.state(2).unwrap().work_finished);
    assert_idle_and_dark(&station, 2);
}

#[test]
fn content_field_all_fills_placeholders() {
    let station = stocked();
    let names = station.controller.content_field_all("display_name");
    assert_eq!(names.get(&1).map(String::as_str), Some("Screws"));
    assert_eq!(names.get(&3).map(String::as_str), Some("?"));
    let images = station.controller.content_field_all("image_path");
    assert_eq!(images.get(&2).map(String::as_str), Some(""));
}

#[test]
fn content_accessors() {
    let station = Station::new(&[1, 2], fast_timing());
    assert!(station.controller.content(1).is_empty());
    assert!(station.controller.set_content_field(1, "description", "small"));
    assert_eq!(station.controller.content(1).get("description"), Some("small"));
    assert!(!station.controller.set_content_field(7, "name", "x"));
    assert!(!station.controller.set_content(7, ContentEntry::new()));

    assert!(station
        .controller
        .set_content_json(2, &json!({ "name": "nut", "count": 12 })));
    assert_eq!(station.controller.content(2).get("count"), Some("12"));
    assert!(!station.controller.set_content_json(2, &json!(["not", "an", "object"])));
    assert_eq!(station.controller.content(2).name(), Some("nut"));
    assert_eq!(
        station
            .sink
            .count(|e| matches!(e, StationEvent::ContentChanged { .. })),
        2
    );
}

// ── Construction / lifecycle ──────────────────────────────────

#[test]
fn duplicate_port_numbers_are_rejected() {
    let ports: Vec<Arc<dyn Port>> = vec![
        Arc::new(RecordingPort::new(1, Duration::from_secs(5))),
        Arc::new(RecordingPort::new(1, Duration::from_secs(5))),
    ];
    let res = PortSelectionController::new(
        ports,
        fast_timing(),
        Arc::new(RecordingSink::default()) as Arc<dyn EventSink>,
    );
    assert!(matches!(res, Err(Error::InvalidArgument(_))));
}

#[test]
fn started_event_reports_port_count() {
    let station = Station::new(&[1, 2, 3], fast_timing());
    assert_eq!(station.sink.events()[0], StationEvent::Started { ports: 3 });
    assert_eq!(station.controller.port_numbers(), vec![1, 2, 3]);
}

#[test]
fn shutdown_closes_the_activity_sink() {
    let station = Station::new(&[1], fast_timing());
    let sink = station.controller.activity_sink();
    station.controller.shutdown();
    station.controller.shutdown();
    assert!(!sink.is_open());

    let late = RecordingPort::new(2, Duration::from_secs(5));
    assert!(matches!(
        late.register_activity_callback(sink),
        Err(Error::InvalidArgument(_))
    ));
    let (open, _rx) = ActivitySink::channel();
    assert!(late.register_activity_callback(open).is_ok());
}

#[test]
fn status_command_lists_every_port() {
    let station = Station::new(&[5, 6], fast_timing());
    let cmd: StationCommand = "select 6 2 left bin".parse().unwrap();
    assert_eq!(station.controller.handle_command(cmd), CommandOutcome::Done(true));

    let CommandOutcome::Status(rows) = station.controller.handle_command(StationCommand::Status)
    else {
        panic!("status did not return rows");
    };
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].port, 5);
    assert!(!rows[0].selected);
    assert!(rows[1].selected);
    assert_eq!(rows[1].amount_to_pick, 2);
    assert_eq!(rows[1].instructions, "left bin");

    station.controller.handle_command(StationCommand::DeselectAll);
    assert_idle_and_dark(&station, 6);
}
