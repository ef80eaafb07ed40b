//! Field-by-field merging of configuration tiers.
//!
//! Each tier is first turned into a JSON value, then tiers are folded from
//! lowest to highest priority. Mappings merge recursively, everything else
//! (lists included) is replaced wholesale, and an explicit `null` leaves the
//! lower tier's value in place.

use serde_json::Value;

/// Overlay `upper` onto `lower`.
pub fn deep_merge(lower: Value, upper: Value) -> Value {
    match (lower, upper) {
        (Value::Object(mut merged), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (lower, Value::Null) => lower,
        (_, upper) => upper,
    }
}

/// Fold tiers in priority order (later wins).
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}
