#![no_main]

use arbitrary::Arbitrary;
use hookform_core::{FieldValue, OpaqueHandle, OpaqueKind, structural_clone};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Node {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Opaque(u8),
    Callable,
    Set(Vec<u8>),
    Array(Vec<Node>),
    Object(Vec<(u8, Node)>),
}

fn build(node: &Node, depth: usize) -> FieldValue {
    if depth > 8 {
        return FieldValue::Null;
    }
    match node {
        Node::Null => FieldValue::Null,
        Node::Bool(b) => FieldValue::Bool(*b),
        Node::Number(n) if n.is_finite() => FieldValue::Number(*n),
        Node::Number(_) => FieldValue::Number(0.0),
        Node::Text(s) => FieldValue::text(s.as_str()),
        Node::Opaque(id) => {
            FieldValue::opaque(OpaqueHandle::new(OpaqueKind::Blob, u64::from(*id), "blob"))
        }
        Node::Callable => FieldValue::callable(|_| FieldValue::Null),
        Node::Set(members) => FieldValue::set(members.iter().map(|m| FieldValue::from(u32::from(*m)))),
        Node::Array(items) => FieldValue::array(items.iter().map(|item| build(item, depth + 1))),
        Node::Object(entries) => FieldValue::object_from(
            entries
                .iter()
                .map(|(key, value)| (format!("k{key}"), build(value, depth + 1))),
        ),
    }
}

fuzz_target!(|node: Node| {
    let value = build(&node, 0);
    let copy = structural_clone(&value);
    assert!(copy == value);
    if value.is_callable() {
        assert!(copy.is_callable());
    }
});
