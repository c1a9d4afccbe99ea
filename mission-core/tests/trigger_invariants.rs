use std::collections::HashMap;

use mission_core::{CoarseCoord2d, DeleteOutcome, TriggerAction, TriggerId, Triggers};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const GRID: u8 = 6;

const ACTIONS: [TriggerAction; 12] = [
    TriggerAction::MissionTarget,
    TriggerAction::ChainReaction,
    TriggerAction::MegaLaser,
    TriggerAction::CloakingDevice,
    TriggerAction::ExtraLife,
    TriggerAction::AtaMissiles,
    TriggerAction::AtgMissiles,
    TriggerAction::Bombs,
    TriggerAction::Mines,
    TriggerAction::MultiAtaMissiles,
    TriggerAction::Shields,
    TriggerAction::DefencesOff,
];

fn cell(rng: &mut StdRng) -> CoarseCoord2d {
    CoarseCoord2d::new(rng.gen_range(0..GRID), rng.gen_range(0..GRID))
}

fn check(triggers: &Triggers, aims: &mut HashMap<TriggerId, CoarseCoord2d>) {
    aims.retain(|id, _| {
        triggers
            .get(*id)
            .is_some_and(|t| t.action == TriggerAction::ChainReaction)
    });

    let list: Vec<_> = triggers.iter().collect();
    assert_eq!(list.len(), triggers.len());
    for (i, (id, trigger)) in list.iter().enumerate() {
        if trigger.action != TriggerAction::ChainReaction {
            assert_eq!(triggers.chain_target(*id), None);
            continue;
        }
        assert!(i > 0, "chain reaction at head of list");
        let aim = aims[id];
        assert_eq!(triggers.chain_target(*id), Some(aim));
        assert_eq!(list[i - 1].1.coords, aim, "chain {id:?} lost its target");
    }

    for y in 0..GRID {
        for x in 0..GRID {
            let c = CoarseCoord2d::new(x, y);
            let busy = list
                .iter()
                .any(|(_, t)| t.coords == c && t.action != TriggerAction::Dummy);
            assert_eq!(triggers.is_occupied(c), busy, "bitmap wrong at {c:?}");
            assert_eq!(
                triggers.at(c).count(),
                list.iter().filter(|(_, t)| t.coords == c).count()
            );
        }
    }

    let whole = triggers
        .in_area(CoarseCoord2d::new(0, 0), CoarseCoord2d::new(GRID, GRID))
        .count();
    assert_eq!(whole, triggers.len());
}

fn run(seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut triggers = Triggers::default();
    let mut aims = HashMap::new();

    for _ in 0..steps {
        let ids: Vec<TriggerId> = triggers.iter().map(|(id, _)| id).collect();
        if ids.is_empty() || rng.gen_bool(0.6) {
            let action = ACTIONS[rng.gen_range(0..ACTIONS.len())];
            let coords = cell(&mut rng);
            let next = (action == TriggerAction::ChainReaction).then(|| cell(&mut rng));
            let before = triggers.len();
            let id = triggers
                .add(coords, action, rng.gen(), next)
                .expect("well under capacity");
            if let Some(aim) = next {
                aims.insert(id, aim);
                assert!(triggers.len() - before <= 2);
            }
        } else {
            let id = ids[rng.gen_range(0..ids.len())];
            let outcome = triggers.delete(id).expect("live trigger");
            match outcome {
                DeleteOutcome::Removed => assert!(triggers.get(id).is_none()),
                DeleteOutcome::Converted | DeleteOutcome::Retained => {
                    assert_eq!(triggers.get(id).unwrap().action, TriggerAction::Dummy)
                }
            }
        }
        check(&triggers, &mut aims);
    }

    triggers.flush();
    check(&triggers, &mut aims);
}

#[test]
fn random_edits_keep_chains_and_bitmap_consistent() {
    for seed in 0..40 {
        run(seed, 150);
    }
}

#[test]
fn deleting_everything_empties_the_list() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut triggers = Triggers::default();
    let mut aims = HashMap::new();
    for _ in 0..60 {
        let action = ACTIONS[rng.gen_range(0..ACTIONS.len())];
        let next = (action == TriggerAction::ChainReaction).then(|| cell(&mut rng));
        let coords = cell(&mut rng);
        let id = triggers.add(coords, action, 0, next).unwrap();
        if let Some(aim) = next {
            aims.insert(id, aim);
        }
    }

    // Chains go first, so every placeholder eventually becomes redundant.
    let mut rounds = 0;
    while !triggers.is_empty() {
        rounds += 1;
        assert!(rounds < 1000, "deletion made no progress");
        let chains: Vec<TriggerId> = triggers
            .iter()
            .filter(|(_, t)| t.action == TriggerAction::ChainReaction)
            .map(|(id, _)| id)
            .collect();
        let victim = match chains.last() {
            Some(id) => *id,
            None => triggers.iter().map(|(id, _)| id).next().unwrap(),
        };
        triggers.delete(victim);
        check(&triggers, &mut aims);
    }
}
