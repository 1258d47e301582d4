/*!
 * Map Property Tests
 * Model-based checks against std::collections::HashMap
 */

use memkit::RhMap;
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, u32),
    Remove(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<u8>(), any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        any::<u8>().prop_map(Op::Remove),
    ]
}

proptest! {
    /// Membership, values, and iteration order all agree with a reference
    /// model over arbitrary insert/remove interleavings.
    #[test]
    fn map_behaves_like_model(ops in proptest::collection::vec(op_strategy(), 0..300)) {
        let mut map = RhMap::with_capacity(7);
        let mut model: HashMap<u8, u32> = HashMap::new();
        let mut order: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    let expect_insert = !model.contains_key(&k);
                    prop_assert_eq!(map.insert(k, v), expect_insert);
                    if expect_insert {
                        model.insert(k, v);
                        order.push(k);
                    }
                }
                Op::Remove(k) => {
                    let expected = model.remove(&k);
                    prop_assert_eq!(map.remove(&k).map(|(_, v)| v), expected);
                    if expected.is_some() {
                        order.retain(|x| *x != k);
                    }
                }
            }
        }

        prop_assert_eq!(map.len(), model.len());
        for (k, v) in &model {
            prop_assert_eq!(map.get(k), Some(v));
        }
        let iterated: Vec<u8> = map.keys().copied().collect();
        prop_assert_eq!(iterated, order);
    }
}
