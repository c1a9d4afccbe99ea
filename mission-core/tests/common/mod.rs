use mission_core::{
    Behaviour, CloudType, Clouds, CoarseCoord2d, CoarseCoord3d, CursorType, EngineType,
    FilenameKind, FineCoord3d, FormationOffset, Importance, LaserType, Mission, MissionType,
    Pilot, Probability, Pyramid, ShipFlags, ShipMode, ShipType, Target, Text, TriggerAction,
};

/// A mission touching every part of the file.
pub fn sample_mission() -> Mission {
    let mut m = Mission::new();

    m.player.pos = FineCoord3d::new(40 << 16, 90 << 16, 3 << 16);
    m.player.direction = 64;
    m.player.shields = 750;
    m.player.laser = LaserType::Triple;
    m.player.engine = EngineType::Afterburner;
    m.player.weapons.ata = 12;
    m.player.weapons.bombs = 4;
    m.player.weapons.multi_ata = 2;

    m.mission_type = MissionType::Space;
    m.clouds = Clouds {
        colours: [3, 9],
        kind: CloudType::Scattered,
    };
    m.dock_to_finish = true;
    m.defences.laser = LaserType::Double;
    m.defences.fire_rate = 60;
    m.defences.missile_prob = Probability::from_raw(300).unwrap();
    m.pyramid = Pyramid {
        pos: CoarseCoord2d::new(120, 130),
        level: 4,
    };
    m.set_impervious_map(true);
    m.set_time_limit(Some(900)).unwrap();

    m.fighter_perf[1].speed = 400;
    m.fighter_perf[3].ata_prob = Probability::ALWAYS;
    m.big_ship_perf[0].set_shields(3500).unwrap();
    m.big_ship_perf[2].set_remote_shield_gen();

    m.triggers.max_losses = 3;
    m.triggers
        .add(CoarseCoord2d::new(10, 11), TriggerAction::MissionTarget, 0, None)
        .unwrap();
    m.triggers
        .add(CoarseCoord2d::new(12, 11), TriggerAction::ExtraLife, 1, None)
        .unwrap();
    m.triggers
        .add(
            CoarseCoord2d::new(14, 11),
            TriggerAction::ChainReaction,
            0,
            Some(CoarseCoord2d::new(10, 11)),
        )
        .unwrap();
    m.triggers
        .add(
            CoarseCoord2d::new(60, 61),
            TriggerAction::ChainReaction,
            0,
            Some(CoarseCoord2d::new(62, 63)),
        )
        .unwrap();

    let info = m.target_infos.add(CoarseCoord2d::new(10, 11)).unwrap();
    info.texts[0].set_string("Command bunker");
    info.texts[1].set_string("Heavily defended.\nUse bombs!");
    info.texts[1].cursor = CursorType::Block;
    m.target_infos.add(CoarseCoord2d::new(200, 5)).unwrap();

    let patrol = m.paths.add().unwrap();
    let path = m.paths.get_mut(patrol).unwrap();
    path.add_waypoint(CoarseCoord3d::new(20, 20, 5)).unwrap();
    let turn = path.add_waypoint(CoarseCoord3d::new(40, 20, 5)).unwrap();
    path.add_waypoint(CoarseCoord3d::new(40, 40, 8)).unwrap();
    let spare = m.paths.add().unwrap();
    m.paths
        .get_mut(spare)
        .unwrap()
        .add_waypoint(CoarseCoord3d::new(1, 2, 3))
        .unwrap();

    let carrier = m
        .ships
        .add(ShipType::BigShip3, CoarseCoord3d::new(50, 50, 10))
        .unwrap();
    if let Some(ship) = m.ships.get_mut(carrier) {
        ship.importance = Importance::MustSurvive;
        ship.flags = ShipFlags::SCANNER_INVISIBLE;
    }
    let escort = m
        .ships
        .add(ShipType::Fighter2, CoarseCoord3d::new(52, 50, 10))
        .unwrap();
    let raider = m
        .ships
        .add(ShipType::Fighter4, CoarseCoord3d::new(20, 20, 5))
        .unwrap();
    if let Some(ship) = m.ships.get_mut(raider) {
        ship.behaviour = Behaviour::Evasive;
        ship.pilot = Pilot::Ace;
        ship.flags = ShipFlags::CLOAKED | ShipFlags::IGNORES_PLAYER;
        ship.direction = 200;
    }
    m.ships
        .add(ShipType::Satellite, CoarseCoord3d::new(128, 128, 90))
        .unwrap();

    m.set_ship_mode(
        escort,
        ShipMode::Follow {
            leader: Target::Ship(carrier),
            offset: FormationOffset { x: -3, y: 2, z: 0 },
        },
    )
    .unwrap();
    m.set_ship_mode(
        raider,
        ShipMode::FlightPath {
            path: patrol,
            waypoint: turn,
        },
    )
    .unwrap();
    m.set_ship_mode(carrier, ShipMode::Attack(Target::Ship(raider)))
        .unwrap();
    assert!(m.dock_player(Some(carrier)));

    m.filenames.set(FilenameKind::Tiles, "DESERT.TIL").unwrap();
    m.filenames.set(FilenameKind::Sky, "DUSK").unwrap();
    m.filenames.set(FilenameKind::Palette, "PAL_02").unwrap();

    m.briefing.title.set_string("Operation Sandstorm");
    m.briefing.title.colour = 12;
    if let Some(block) = m.briefing.block_mut(0) {
        block.set_string("Destroy the command bunker.");
        block.duration = 800;
    }
    let mut block = Text::new("Protect the carrier (at all costs).");
    block.x = 16;
    block.y = 200;
    block.repeat = true;
    m.briefing.add_block(block).unwrap();

    m
}
