//! Content map persistence through the controller.

use std::fs;

use pickbylight::adapters::content_file::JsonContentFile;
use pickbylight::app::content::{ContentEntry, ContentMap};
use pickbylight::app::ports::ContentStore;

use crate::mock_hw::{Station, fast_timing};

#[test]
fn save_and_load_round_trip_field_for_field() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonContentFile::new();

    let original = Station::new(&[1, 2, 3], fast_timing());
    original.controller.set_content(
        1,
        ContentEntry::new()
            .with("display_name", "Screws")
            .with("name", "screw-m3")
            .with("image_path", "img/screw.png"),
    );
    original
        .controller
        .set_content_field(3, "description", "spare fuses, 5 A");

    let written = original
        .controller
        .save_content_map(&store, &dir.path().join("rack"))
        .unwrap();
    assert_eq!(written.extension().and_then(|e| e.to_str()), Some("json"));

    let restored = Station::new(&[1, 2, 3], fast_timing());
    let loaded = restored.controller.load_content_map(&store, &written);
    assert_eq!(loaded, original.controller.content_map());
    assert_eq!(restored.controller.content_map(), loaded);
    assert_eq!(
        restored.controller.content(3).get("description"),
        Some("spare fuses, 5 A")
    );
    assert!(restored.controller.content(2).is_empty());
}

#[test]
fn unreadable_map_yields_empty_and_keeps_current_content() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonContentFile::new();
    let station = Station::new(&[1], fast_timing());
    station
        .controller
        .set_content(1, ContentEntry::new().with("name", "bolt"));

    let missing = station
        .controller
        .load_content_map(&store, &dir.path().join("missing.json"));
    assert!(missing.is_empty());

    let garbled = dir.path().join("garbled.json");
    fs::write(&garbled, "{ not json").unwrap();
    assert!(station.controller.load_content_map(&store, &garbled).is_empty());

    assert_eq!(station.controller.content(1).name(), Some("bolt"));
}

#[test]
fn hand_written_map_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("content_map.json");
    fs::write(
        &path,
        r#"{
            "2": { "display_name": "Washers", "name": "washer-m4" },
            "4": {}
        }"#,
    )
    .unwrap();

    let map: ContentMap = JsonContentFile::new().load(&path).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&2].display_name(), Some("Washers"));
    assert!(map[&4].is_empty());
}
