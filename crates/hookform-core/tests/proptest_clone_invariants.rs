//! Property-based invariant tests for structural clone.
//!
//! 1. A clone of a callable-free value is structurally equal to the source.
//! 2. A clone of a callable-free container shares no container with the source.
//! 3. Mutating a clone never changes the source.
//! 4. Opaque handles survive cloning by identity.
//! 5. Containers holding a callable come back as the same container.
//! 6. No panics on arbitrary value trees.

use hookform_core::path::{get, set_path};
use hookform_core::{FieldValue, OpaqueHandle, OpaqueKind, structural_clone};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn scalar_strategy() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Bool),
        (-1.0e6f64..1.0e6).prop_map(FieldValue::Number),
        "[a-z]{0,8}".prop_map(FieldValue::Text),
    ]
}

fn value_strategy() -> impl Strategy<Value = FieldValue> {
    scalar_strategy().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(FieldValue::array),
            proptest::collection::vec(("[a-z]{1,4}", inner), 0..6).prop_map(FieldValue::object_from),
        ]
    })
}

/// Collect every container reachable from `value`, in walk order.
fn containers(value: &FieldValue, out: &mut Vec<FieldValue>) {
    match value {
        FieldValue::Array(items) => {
            out.push(value.clone());
            for item in items.borrow().iter() {
                containers(item, out);
            }
        }
        FieldValue::Object(map) => {
            out.push(value.clone());
            for member in map.borrow().values() {
                containers(member, out);
            }
        }
        FieldValue::Set(_) => out.push(value.clone()),
        _ => {}
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Clone is structurally equal
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clone_is_structurally_equal(value in value_strategy()) {
        let copy = structural_clone(&value);
        prop_assert_eq!(copy, value);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. No shared containers
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clone_shares_no_container(value in value_strategy()) {
        let copy = structural_clone(&value);
        let mut original = Vec::new();
        let mut copied = Vec::new();
        containers(&value, &mut original);
        containers(&copy, &mut copied);
        prop_assert_eq!(original.len(), copied.len());
        for a in &original {
            for b in &copied {
                prop_assert!(!a.is_same(b), "container shared between source and clone");
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Mutating the clone leaves the source alone
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mutating_clone_keeps_source(
        entries in proptest::collection::vec(("[a-z]{1,4}", scalar_strategy()), 1..6),
        key in "[a-z]{1,4}",
    ) {
        let source = FieldValue::object_from([("inner", FieldValue::object_from(entries))]);
        let snapshot = structural_clone(&source);
        let copy = structural_clone(&source);

        let path = format!("inner.{key}");
        prop_assert!(set_path(&copy, &path, FieldValue::from("changed")));

        prop_assert_eq!(&source, &snapshot);
        prop_assert_eq!(get(&copy, &path), Some(FieldValue::from("changed")));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Opaque handles keep identity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn opaque_identity_preserved(id in any::<u64>(), label in "[a-z]{0,8}") {
        let file = FieldValue::opaque(OpaqueHandle::new(OpaqueKind::File, id, label));
        let source = FieldValue::object_from([("upload", file.clone())]);
        let copy = structural_clone(&source);

        prop_assert!(!copy.is_same(&source));
        let copied = copy.child("upload").unwrap_or_default();
        prop_assert!(copied.is_same(&file));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Callable-bearing containers are shared
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn callable_container_is_shared(
        entries in proptest::collection::vec(("[a-z]{1,4}", scalar_strategy()), 0..4),
    ) {
        let inner = FieldValue::object_from(entries);
        inner.put("handler", FieldValue::callable(|_| FieldValue::Null));
        let source = FieldValue::object_from([("inner", inner.clone())]);

        let copy = structural_clone(&source);

        prop_assert!(!copy.is_same(&source));
        let copied_inner = copy.child("inner").unwrap_or_default();
        prop_assert!(copied_inner.is_same(&inner));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. No panics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clone_never_panics(value in value_strategy()) {
        let _ = structural_clone(&structural_clone(&value));
    }
}
