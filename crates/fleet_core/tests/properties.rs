//! Property tests over generated snapshots.

use std::collections::BTreeMap;

use fleet_core::prelude::*;
use fleet_test_utils::determinism::verify_engine_determinism;
use fleet_test_utils::proptest::prelude::*;
use fleet_test_utils::strategies::arb_snapshot;
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn engine() -> FleetEngine {
    FleetEngine::new(EngineConfig::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn claims_never_exceed_stock(snapshot in arb_snapshot()) {
        let mut rng = SmallRng::seed_from_u64(0);
        let decision = engine().decide(&snapshot, &EngineMemory::new(), &mut rng).unwrap();

        let mut claimed: BTreeMap<(NodeId, ResourceId), i64> = BTreeMap::new();
        for (_, command) in decision.batch.iter() {
            if let Command::Trade { target, resource, amount } = command {
                if *amount > 0 {
                    *claimed.entry((*target, *resource)).or_default() += amount;
                }
            }
        }

        for ((node, resource), total) in claimed {
            let stock = snapshot.node(node).and_then(|n| n.resources.get(&resource)).map_or(0, |line| line.amount);
            prop_assert!(total <= stock, "node {node} resource {resource}: claimed {total} of {stock}");
        }
    }

    #[test]
    fn same_inputs_same_outputs(snapshot in arb_snapshot(), seed in any::<u64>()) {
        let engine = engine();
        let first = engine.decide(&snapshot, &EngineMemory::new(), &mut SmallRng::seed_from_u64(seed)).unwrap();
        let second = engine.decide(&snapshot, &EngineMemory::new(), &mut SmallRng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(first.batch, second.batch);
        prop_assert_eq!(first.memory, second.memory);
    }

    #[test]
    fn commands_only_for_our_units(snapshot in arb_snapshot()) {
        let mut rng = SmallRng::seed_from_u64(3);
        let decision = engine().decide(&snapshot, &EngineMemory::new(), &mut rng).unwrap();
        for (unit, _) in decision.batch.iter() {
            let owner = snapshot.unit(*unit).map(|u| u.owner);
            prop_assert_eq!(owner, Some(snapshot.player_id));
        }
        prop_assert!(decision.batch.validate(&snapshot).is_ok());
    }

    #[test]
    fn threatened_traders_never_trade(snapshot in arb_snapshot()) {
        let config = EngineConfig::default();
        let mut rng = SmallRng::seed_from_u64(5);
        let decision = engine().decide(&snapshot, &EngineMemory::new(), &mut rng).unwrap();
        prop_assume!(!decision.summary.objective_met);

        for unit in snapshot.units.values() {
            if unit.owner != snapshot.player_id || !unit.class.is(ClassRole::TRADER) {
                continue;
            }
            let threatened = snapshot.units.values().any(|other| {
                other.owner != snapshot.player_id
                    && other.class.is(ClassRole::DANGEROUS)
                    && other.position.distance(unit.position) < config.trade.avoid_radius
            });
            if threatened {
                let is_trade = matches!(decision.batch.get(unit.id), Some(Command::Trade { .. }));
                prop_assert!(!is_trade);
            }
        }
    }
}

#[test]
fn skirmish_is_deterministic_over_many_ticks() {
    let result = verify_engine_determinism(&engine(), &fleet_test_utils::fixtures::skirmish(), 9, 4, 30);
    result.assert_deterministic();
}
