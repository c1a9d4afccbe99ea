mod common;

use std::fs;

use mission_core::{
    load_compressed, save_compressed, worst_compressed_size, Mission, Registry, Shared,
    NOMINAL_SIZE,
};

#[test]
fn save_and_load_through_zlib() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sandstorm.msn");

    let original = Shared::new(common::sample_mission());
    save_compressed(&original, &path).unwrap();
    assert!(!original.is_dirty());
    let name = path.to_string_lossy().into_owned();
    assert_eq!(original.name(), Some(name));
    assert!(original.saved_at().is_some());

    let on_disk = fs::metadata(&path).unwrap().len();
    assert!(on_disk < NOMINAL_SIZE);
    assert!(on_disk <= worst_compressed_size(&original).unwrap());

    let loaded = Shared::new(Mission::new());
    drop(loaded.edit());
    assert!(loaded.is_dirty());
    load_compressed(&loaded, &path).unwrap();
    assert!(!loaded.is_dirty());
    assert_eq!(*loaded.get(), *original.get());
}

#[test]
fn loaded_missions_can_be_shared() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.msn");
    save_compressed(&Shared::new(common::sample_mission()), &path).unwrap();

    let registry = Registry::new();
    let mission = Shared::new(Mission::new());
    load_compressed(&mission, &path).unwrap();
    assert!(mission.set_shared(&registry));

    let name = path.to_string_lossy();
    let again = Shared::find_shared(&registry, &name).expect("registered");
    assert!(again.ptr_eq(&mission));
    assert_eq!(mission.ref_count(), 2);

    drop(again);
    drop(mission);
    assert!(Shared::<Mission>::find_shared(&registry, &name).is_none());
}

#[test]
fn corrupt_stream_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.msn");
    fs::write(&path, b"definitely not zlib").unwrap();

    let mission = Shared::new(Mission::new());
    assert!(load_compressed(&mission, &path).is_err());
    assert!(mission.name().is_none());
}
