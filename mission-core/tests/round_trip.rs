mod common;

use mission_core::{
    CoarseCoord2d, Mission, MissionError, ShipMode, Target, TriggerAction, NOMINAL_SIZE,
};

fn encode(m: &Mission) -> Vec<u8> {
    let mut out = Vec::new();
    m.write(&mut out).expect("mission writes");
    out
}

#[test]
fn full_mission_round_trips() {
    let mission = common::sample_mission();
    let bytes = encode(&mission);
    assert_eq!(bytes.len() as u64, NOMINAL_SIZE);

    let back = Mission::read(&bytes[..]).expect("mission reads");
    assert_eq!(back, mission);
    assert_eq!(encode(&back), bytes);
}

#[test]
fn references_are_rebuilt_after_read() {
    let bytes = encode(&common::sample_mission());
    let back = Mission::read(&bytes[..]).unwrap();

    let ships: Vec<_> = back.ships.iter().collect();
    let (carrier, _) = ships[0];
    let (raider, _) = ships[2];
    assert_eq!(back.player.docked_ship, Some(carrier));
    assert_eq!(
        back.ships.get(carrier).unwrap().mode(),
        ShipMode::Attack(Target::Ship(raider))
    );
    match ships[2].1.mode() {
        ShipMode::FlightPath { path, waypoint } => {
            let path = back.paths.get(path).unwrap();
            assert_eq!(path.waypoints()[1].id, waypoint);
        }
        other => panic!("unexpected mode {other:?}"),
    }
}

#[test]
fn chain_targets_come_from_list_order() {
    let bytes = encode(&common::sample_mission());
    let back = Mission::read(&bytes[..]).unwrap();

    let list: Vec<_> = back.triggers.iter().collect();
    for (i, (id, trigger)) in list.iter().enumerate() {
        if trigger.action == TriggerAction::ChainReaction {
            assert_eq!(back.triggers.chain_target(*id), Some(list[i - 1].1.coords));
        }
    }
    assert!(back.triggers.is_occupied(CoarseCoord2d::new(14, 11)));
    assert!(!back.triggers.is_occupied(CoarseCoord2d::new(62, 63)));
}

#[test]
fn text_offsets_follow_string_sizes() {
    let mission = common::sample_mission();
    let bytes = encode(&mission);
    let offset = |slot: usize| {
        let at = 3208 + slot * 4;
        i32::from_le_bytes(bytes[at..at + 4].try_into().unwrap()) as usize
    };
    assert_eq!(offset(0), 80);
    assert_eq!(offset(1), 80 + mission.briefing.title.encoded_len());
    assert_eq!(offset(2), offset(1) + mission.briefing.blocks()[0].encoded_len());
    assert_eq!(offset(3), 0);
}

#[test]
fn every_truncation_point_fails_cleanly() {
    let bytes = encode(&common::sample_mission());
    for len in [0, 1, 23, 24, 35, 500, 1031, 1040, 3119, 3203, 3207, 3290] {
        let err = Mission::read(&bytes[..len]).unwrap_err();
        assert!(
            matches!(err, MissionError::Truncated),
            "length {len} gave {err}"
        );
    }
}

#[test]
fn removing_objects_keeps_the_file_writable() {
    let mut mission = common::sample_mission();
    let ids: Vec<_> = mission.ships.iter().map(|(id, _)| id).collect();
    let patrol = mission.paths.iter().next().unwrap().id();

    mission.remove_ship(ids[0]).unwrap();
    mission.remove_path(patrol).unwrap();
    assert_eq!(mission.player.docked_ship, None);
    assert_eq!(
        mission.ships.get(ids[1]).unwrap().mode(),
        ShipMode::Follow {
            leader: Target::Player,
            offset: mission_core::FormationOffset { x: -3, y: 2, z: 0 },
        }
    );
    assert_eq!(
        mission.ships.get(ids[2]).unwrap().mode(),
        ShipMode::Attack(Target::Player)
    );

    let back = Mission::read(&encode(&mission)[..]).unwrap();
    assert_eq!(back, mission);
    assert_eq!(back.ships.len(), 3);
    assert_eq!(back.paths.len(), 1);
}
