#![no_main]

use arbitrary::Arbitrary;
use hookform_core::clone::structural_clone;
use hookform_core::path::{get, is_index, set_path, split_path, unset_path};
use hookform_core::{FieldMeta, FieldTree, FieldValue, MAX_ARRAY_INDEX};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Segment {
    Key(u8),
    Index(u8),
    Quoted(u8),
}

#[derive(Arbitrary, Debug)]
enum Op {
    Set(Vec<Segment>, bool),
    Unset(Vec<Segment>),
    Register(Vec<Segment>),
    Remove(Vec<Segment>),
    Raw(String),
    SetRaw(String),
}

/// Build a field name. Indices stay small so arrays stay small; `SetRaw`
/// covers indices past `MAX_ARRAY_INDEX`.
fn name(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments.iter().take(6) {
        match segment {
            Segment::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push((b'a' + k % 4) as char);
            }
            Segment::Index(i) => out.push_str(&format!("[{}]", i % 8)),
            Segment::Quoted(k) => out.push_str(&format!("['{}']", (b'a' + k % 4) as char)),
        }
    }
    out
}

fuzz_target!(|ops: Vec<Op>| {
    let values = FieldValue::object();
    let mut tree = FieldTree::new();

    for op in ops.into_iter().take(64) {
        match op {
            Op::Set(segments, flag) => {
                let name = name(&segments);
                if set_path(&values, &name, flag.into()) {
                    assert!(get(&values, &name).is_some());
                }
            }
            Op::Unset(segments) => {
                let name = name(&segments);
                if unset_path(&values, &name) {
                    assert!(get(&values, &name).is_none_or(|v| v.is_null()));
                }
            }
            Op::Register(segments) => {
                let name = name(&segments);
                if !name.is_empty() && tree.insert(FieldMeta::new(name.as_str())).is_ok() {
                    assert!(tree.get_field(&name).is_some());
                }
            }
            Op::Remove(segments) => {
                let name = name(&segments);
                if tree.remove(&name).is_some() {
                    assert!(!tree.contains(&name));
                }
            }
            Op::Raw(raw) => {
                let _ = split_path(&raw);
                let _ = get(&values, &raw);
            }
            Op::SetRaw(raw) => {
                let outsized = split_path(&raw).iter().any(|segment| {
                    is_index(segment)
                        && !matches!(segment.parse::<usize>(), Ok(i) if i <= MAX_ARRAY_INDEX)
                });
                let before = outsized.then(|| structural_clone(&values));
                let ok = set_path(&values, &raw, FieldValue::Null);
                if let Some(before) = before {
                    assert!(!ok);
                    assert_eq!(values, before);
                }
            }
        }
    }
    let _ = tree.field_names();
});
