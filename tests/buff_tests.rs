//! Buff ledger properties.

use proptest::prelude::*;
use snap_engine::cards::{Buff, BuffKind, BuffLedger};

#[derive(Clone, Debug)]
enum Op {
    AddPower(i64),
    SetPower(i64),
    AddCost(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-5i64..=5).prop_map(Op::AddPower),
        (0i64..=12).prop_map(Op::SetPower),
        (-3i64..=3).prop_map(Op::AddCost),
    ]
}

proptest! {
    #[test]
    fn prop_ledger_matches_sequential_model(
        base_power in 0i64..10,
        base_cost in 0i64..7,
        ops in prop::collection::vec(op(), 0..24),
    ) {
        let mut ledger = BuffLedger::new();
        let mut power = base_power;
        let mut cost = base_cost;

        for op in &ops {
            match *op {
                Op::AddPower(amount) => {
                    ledger.apply(Buff::new(BuffKind::AdditionalPower, amount));
                    power += amount;
                }
                Op::SetPower(amount) => {
                    ledger.apply(Buff::new(BuffKind::SetPower, amount));
                    power = amount;
                }
                Op::AddCost(amount) => {
                    ledger.apply(Buff::new(BuffKind::AdditionalCost, amount));
                    cost += amount;
                }
            }
            let sets = ledger.iter().filter(|b| b.kind == BuffKind::SetPower).count();
            prop_assert!(sets <= 1, "more than one SetPower in the ledger");
        }

        prop_assert_eq!(ledger.power(base_power), power);
        prop_assert_eq!(ledger.cost(base_cost), cost.max(0));
    }
}

#[test]
fn test_set_power_keeps_cost_buffs() {
    let mut ledger = BuffLedger::new();
    ledger.apply(Buff::new(BuffKind::AdditionalCost, 2));
    ledger.apply(Buff::new(BuffKind::Keyword("Armor".into()), 0));
    let displaced = ledger.apply(Buff::new(BuffKind::SetPower, 1));

    assert!(displaced.is_empty());
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger.cost(1), 3);
}
