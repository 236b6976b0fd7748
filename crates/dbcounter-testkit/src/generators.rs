//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use proptest::prelude::*;

use dbcounter_core::{CounterValue, ValueKind};

/// Largest magnitude generated for a single value.
///
/// Small enough that a few additions never saturate.
pub const VALUE_BOUND: i64 = 1 << 40;

/// Generate a counter key.
pub fn counter_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.-]{0,23}".prop_map(String::from)
}

/// Generate a ValueKind.
pub fn value_kind() -> impl Strategy<Value = ValueKind> {
    prop_oneof![Just(ValueKind::Int), Just(ValueKind::Duration)]
}

/// Generate a counter value of either kind.
pub fn counter_value() -> impl Strategy<Value = CounterValue> {
    (value_kind(), -VALUE_BOUND..=VALUE_BOUND)
        .prop_map(|(kind, raw)| CounterValue::from_raw(kind, raw))
}

/// Generate a full counter state with distinct keys.
pub fn counter_state(max_keys: usize) -> impl Strategy<Value = Vec<(String, CounterValue)>> {
    prop::collection::btree_map(counter_key(), counter_value(), 0..=max_keys)
        .prop_map(|map: BTreeMap<_, _>| map.into_iter().collect())
}

/// Parameters for a persist/reload scenario.
#[derive(Debug, Clone)]
pub struct CounterStateParams {
    /// Initial counter contents.
    pub state: Vec<(String, CounterValue)>,
    /// How many times to reload into the fresh counter.
    pub reloads: u8,
}

impl Arbitrary for CounterStateParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (counter_state(16), 1u8..=3u8)
            .prop_map(|(state, reloads)| CounterStateParams { state, reloads })
            .boxed()
    }
}

impl CounterStateParams {
    /// The value each key should hold after all reloads into an empty counter.
    pub fn expected_after_reloads(&self) -> Vec<(String, CounterValue)> {
        self.state
            .iter()
            .map(|(key, value)| {
                let raw = value.raw() * i64::from(self.reloads);
                (key.clone(), CounterValue::from_raw(value.kind(), raw))
            })
            .collect()
    }
}
