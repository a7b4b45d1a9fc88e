//! Property-based tests for map backends using proptest
//!
//! Arbitrary single-threaded sequences of the three measured operations are replayed
//! against each backend and against an `Option` model of the single key.

use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Step {
    Insert,
    ComputeToAbsent,
    Remove,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Insert),
        Just(Step::ComputeToAbsent),
        Just(Step::Remove),
    ]
}

fn replay<M: ContendedMap<Identifier, Identifier>>(
    steps: &[Step],
    seeded: bool,
) -> core::result::Result<(), TestCaseError> {
    let map = M::new_map();
    let key = Identifier::new_v4();
    let mut model: Option<Identifier> = None;

    if seeded {
        map.insert(key, key);
        model = Some(key);
    }

    for &step in steps {
        match step {
            Step::Insert => {
                prop_assert_eq!(map.insert(key, key), model);
                model = Some(key);
            }
            Step::ComputeToAbsent => {
                prop_assert_eq!(map.compute_to_absent(&key), None);
                model = None;
            }
            Step::Remove => {
                prop_assert_eq!(map.remove(&key), model);
                model = None;
            }
        }

        prop_assert_eq!(map.get(&key), model);
        prop_assert_eq!(map.len(), usize::from(model.is_some()));
    }

    Ok(())
}

proptest! {
    #[test]
    fn test_flurry_matches_model(
        steps in prop::collection::vec(step(), 1..64),
        seeded in any::<bool>()
    ) {
        replay::<FlurryMap>(&steps, seeded)?;
    }

    #[test]
    fn test_dashmap_matches_model(
        steps in prop::collection::vec(step(), 1..64),
        seeded in any::<bool>()
    ) {
        replay::<ShardedMap>(&steps, seeded)?;
    }

    #[test]
    fn test_locked_matches_model(
        steps in prop::collection::vec(step(), 1..64),
        seeded in any::<bool>()
    ) {
        replay::<LockedHashMap<Identifier, Identifier>>(&steps, seeded)?;
    }
}
