//! Operation Taxonomy Module
//!
//! Persistable operation kinds, the value expectation that gates each one,
//! and the ephemeral record handed to a solver.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use crate::cache::ByteIdentity;
use crate::commands::{Codec, Method};
use crate::error::CodecError;

// == Operation Kind ==
/// What a persisted call did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Store a key/value, optionally with TTL
    Write,
    /// Delete one or more explicit keys
    RemoveKeys,
    /// Delete every key matching a prefix
    RemoveBySimilarity,
    /// Flush the entire cache
    RemoveAll,
    /// Overwrite a key's TTL
    ReplaceDuration,
    /// Restore a key's TTL to the one it was written with
    ResetDuration,
    /// Swap a key's value
    ReplaceValue,
}

impl OperationKind {
    /// The expectation a call's return value must meet for the operation to be recorded.
    pub fn expectation(self) -> ValueExpectation {
        match self {
            OperationKind::Write
            | OperationKind::RemoveAll
            | OperationKind::ReplaceDuration
            | OperationKind::ResetDuration => ValueExpectation::Truthy,
            OperationKind::RemoveKeys => ValueExpectation::Positive,
            OperationKind::RemoveBySimilarity => ValueExpectation::NonEmpty,
            OperationKind::ReplaceValue => ValueExpectation::NonNull,
        }
    }
}

// == Outcome ==
/// Shape of a command's return value, as far as gating cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Unit,
    Bool(bool),
    Count(usize),
    /// Keys of a returned mapping
    Mapping(Vec<String>),
    /// Whether an optional value was present
    Value(bool),
}

/// Exposes a return value to the gating predicates.
pub trait Observe {
    fn observe(&self) -> Outcome;
}

impl Observe for () {
    fn observe(&self) -> Outcome {
        Outcome::Unit
    }
}

impl Observe for bool {
    fn observe(&self) -> Outcome {
        Outcome::Bool(*self)
    }
}

impl Observe for usize {
    fn observe(&self) -> Outcome {
        Outcome::Count(*self)
    }
}

impl<V> Observe for HashMap<String, V> {
    fn observe(&self) -> Outcome {
        Outcome::Mapping(self.keys().cloned().collect())
    }
}

impl<T> Observe for Option<T> {
    fn observe(&self) -> Outcome {
        Outcome::Value(self.is_some())
    }
}

// == Value Expectation ==
/// Pure predicate over a return value. Never consults cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueExpectation {
    /// Boolean result is true
    Truthy,
    /// Numeric result is greater than zero
    Positive,
    /// Returned mapping has at least one entry
    NonEmpty,
    /// Returned value is present
    NonNull,
}

impl ValueExpectation {
    /// A result of the wrong shape never passes.
    pub fn expects(self, outcome: &Outcome) -> bool {
        match (self, outcome) {
            (ValueExpectation::Truthy, Outcome::Bool(value)) => *value,
            (ValueExpectation::Positive, Outcome::Count(count)) => *count > 0,
            (ValueExpectation::NonEmpty, Outcome::Mapping(keys)) => !keys.is_empty(),
            (ValueExpectation::NonNull, Outcome::Value(present)) => *present,
            _ => false,
        }
    }
}

// == Invocation ==
/// A command call: which method, and the arguments it was given.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub method: Method,
    pub keys: Vec<&'a str>,
    pub value: Option<&'a Value>,
    pub ttl: Option<Duration>,
}

impl<'a> Invocation<'a> {
    /// A call to `method` with no arguments yet.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            keys: Vec::new(),
            value: None,
            ttl: None,
        }
    }

    pub fn key(mut self, key: &'a str) -> Self {
        self.keys.push(key);
        self
    }

    /// Appends every key of a multi-key call.
    pub fn keys(mut self, keys: &'a [String]) -> Self {
        self.keys.extend(keys.iter().map(String::as_str));
        self
    }

    pub fn value(mut self, value: &'a Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Explicit TTL argument. `None` means the call used the default.
    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }
}

// == Operation Record ==
/// Instruction for one persistence side effect. Built after a call passed
/// its gate, consumed by a solver, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub kind: OperationKind,
    pub keys: Vec<ByteIdentity>,
    pub value: Option<ByteIdentity>,
    pub ttl: Option<Duration>,
}

impl OperationRecord {
    /// Record that erases whatever is durable for `keys`.
    pub fn erase(keys: Vec<ByteIdentity>) -> Self {
        Self {
            kind: OperationKind::RemoveKeys,
            keys,
            value: None,
            ttl: None,
        }
    }

    /// Builds the record for `kind` from the call's arguments and observed result.
    ///
    /// Similarity removals record the keys that were actually removed. Writes
    /// without an explicit TTL record `default_ttl`.
    pub fn build(
        kind: OperationKind,
        invocation: &Invocation<'_>,
        outcome: &Outcome,
        codec: &dyn Codec,
        default_ttl: Duration,
    ) -> Result<Self, CodecError> {
        let keys = match (kind, outcome) {
            (OperationKind::RemoveAll, _) => Vec::new(),
            (OperationKind::RemoveBySimilarity, Outcome::Mapping(removed)) => {
                removed.iter().map(|key| codec.encode_key(key)).collect()
            }
            _ => invocation
                .keys
                .iter()
                .map(|key| codec.encode_key(key))
                .collect(),
        };
        let value = match (kind, invocation.value) {
            (OperationKind::Write | OperationKind::ReplaceValue, Some(value)) => {
                Some(codec.encode_value(value)?)
            }
            _ => None,
        };
        let ttl = match kind {
            OperationKind::Write => Some(invocation.ttl.unwrap_or(default_ttl)),
            OperationKind::ReplaceDuration => invocation.ttl,
            _ => None,
        };

        Ok(Self {
            kind,
            keys,
            value,
            ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::JsonCodec;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_expectation_table() {
        assert_eq!(OperationKind::Write.expectation(), ValueExpectation::Truthy);
        assert_eq!(OperationKind::RemoveKeys.expectation(), ValueExpectation::Positive);
        assert_eq!(
            OperationKind::RemoveBySimilarity.expectation(),
            ValueExpectation::NonEmpty
        );
        assert_eq!(OperationKind::RemoveAll.expectation(), ValueExpectation::Truthy);
        assert_eq!(OperationKind::ReplaceDuration.expectation(), ValueExpectation::Truthy);
        assert_eq!(OperationKind::ResetDuration.expectation(), ValueExpectation::Truthy);
        assert_eq!(OperationKind::ReplaceValue.expectation(), ValueExpectation::NonNull);
    }

    #[test]
    fn test_gates_on_observed_effect() {
        assert!(ValueExpectation::Truthy.expects(&true.observe()));
        assert!(!ValueExpectation::Truthy.expects(&false.observe()));
        assert!(!ValueExpectation::Positive.expects(&0usize.observe()));
        assert!(ValueExpectation::NonNull.expects(&Some(json!(1)).observe()));
        assert!(!ValueExpectation::NonNull.expects(&None::<Value>.observe()));

        let empty: HashMap<String, Value> = HashMap::new();
        assert!(!ValueExpectation::NonEmpty.expects(&empty.observe()));
    }

    #[test]
    fn test_shape_mismatch_never_passes() {
        assert!(!ValueExpectation::Truthy.expects(&Outcome::Count(3)));
        assert!(!ValueExpectation::Positive.expects(&Outcome::Bool(true)));
        assert!(!ValueExpectation::NonNull.expects(&Outcome::Unit));
    }

    #[test]
    fn test_write_record_uses_default_ttl() {
        let value = json!({"a": 1});
        let invocation = Invocation::new(Method::Set).key("k").value(&value);
        let record = OperationRecord::build(
            OperationKind::Write,
            &invocation,
            &Outcome::Bool(true),
            &JsonCodec,
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(record.keys, vec![ByteIdentity::from("k")]);
        assert_eq!(record.value, Some(ByteIdentity::from(br#"{"a":1}"#.to_vec())));
        assert_eq!(record.ttl, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_similarity_record_lists_removed_keys() {
        let invocation = Invocation::new(Method::DeleteSimilar).key("user:");
        let outcome = Outcome::Mapping(vec!["user:1".to_string()]);
        let record = OperationRecord::build(
            OperationKind::RemoveBySimilarity,
            &invocation,
            &outcome,
            &JsonCodec,
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(record.keys, vec![ByteIdentity::from("user:1")]);
        assert!(record.value.is_none());
        assert!(record.ttl.is_none());
    }

    proptest! {
        #[test]
        fn prop_remove_keys_gate_matches_count(count in 0usize..1_000) {
            let expected = count > 0;
            prop_assert_eq!(
                OperationKind::RemoveKeys.expectation().expects(&count.observe()),
                expected
            );
        }

        #[test]
        fn prop_boolean_kinds_follow_result(result in any::<bool>()) {
            for kind in [
                OperationKind::Write,
                OperationKind::RemoveAll,
                OperationKind::ReplaceDuration,
                OperationKind::ResetDuration,
            ] {
                prop_assert_eq!(kind.expectation().expects(&result.observe()), result);
            }
        }
    }
}
