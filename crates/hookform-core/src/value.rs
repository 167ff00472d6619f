#![forbid(unsafe_code)]

//! Dynamic field values.
//!
//! [`FieldValue`] is the closed set of shapes a form value can take. Scalars
//! are stored inline; containers (`Array`, `Object`, `Set`) live behind
//! `Rc<RefCell<..>>`, so `Clone` copies a *reference*, the same way assigning
//! an object does in the host UI environment. Deep copies go through
//! [`structural_clone`](crate::clone::structural_clone).
//!
//! # Invariants
//!
//! 1. `Clone` never copies container contents; [`FieldValue::is_same`] holds
//!    between a container and its clone.
//! 2. `PartialEq` is structural for scalars and containers, identity-based for
//!    [`Opaque`](FieldValue::Opaque) and [`Callable`](FieldValue::Callable).
//! 3. A `Set` never holds two structurally equal members.
//! 4. `Object` keys keep insertion order.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use web_time::SystemTime;

/// Shared, interior-mutable container storage.
pub type Shared<T> = Rc<RefCell<T>>;

/// Insertion-ordered object body.
pub type Object = IndexMap<String, FieldValue>;

fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

// ─── Opaque handles ──────────────────────────────────────────────────────────

/// What kind of environment-owned binary value an [`OpaqueHandle`] stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpaqueKind {
    Blob,
    File,
    FileList,
}

/// Environment-owned binary/file value. Never copied, only shared.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct OpaqueHandle {
    kind: OpaqueKind,
    id: u64,
    label: String,
}

impl OpaqueHandle {
    #[must_use]
    pub fn new(kind: OpaqueKind, id: u64, label: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            label: label.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> OpaqueKind {
        self.kind
    }

    /// Host-side identifier of the underlying object.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

// ─── Callable ────────────────────────────────────────────────────────────────

type CallableFn = dyn Fn(&[FieldValue]) -> FieldValue;

/// A behavior-bearing value (a function stored inside form data).
#[derive(Clone)]
pub struct Callable(Rc<CallableFn>);

impl Callable {
    pub fn new(f: impl Fn(&[FieldValue]) -> FieldValue + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, args: &[FieldValue]) -> FieldValue {
        (self.0)(args)
    }

    /// Whether both handles point at the same function.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

/// Largest array index [`FieldValue::put`] will pad up to.
pub const MAX_ARRAY_INDEX: usize = 1 << 16;

// ─── FieldValue ──────────────────────────────────────────────────────────────

/// A value stored in a form.
#[derive(Clone, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// A point in time. Copied by value.
    Date(SystemTime),
    /// Uniqueness set; members are kept in insertion order.
    Set(Shared<Vec<FieldValue>>),
    Array(Shared<Vec<FieldValue>>),
    Object(Shared<Object>),
    Opaque(Rc<OpaqueHandle>),
    Callable(Callable),
}

impl FieldValue {
    // ── Constructors ─────────────────────────────────────────────────

    /// A new, empty object.
    #[must_use]
    pub fn object() -> Self {
        Self::Object(shared(Object::new()))
    }

    /// A new object from key/value pairs. Later duplicates overwrite earlier ones.
    pub fn object_from<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        Self::Object(shared(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array(items: impl IntoIterator<Item = FieldValue>) -> Self {
        Self::Array(shared(items.into_iter().collect()))
    }

    /// A new set. Structurally equal members are collapsed to the first one.
    pub fn set(members: impl IntoIterator<Item = FieldValue>) -> Self {
        let mut unique: Vec<FieldValue> = Vec::new();
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        Self::Set(shared(unique))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    #[must_use]
    pub fn opaque(handle: OpaqueHandle) -> Self {
        Self::Opaque(Rc::new(handle))
    }

    pub fn callable(f: impl Fn(&[FieldValue]) -> FieldValue + 'static) -> Self {
        Self::Callable(Callable::new(f))
    }

    // ── Queries ──────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_))
    }

    /// `Array` or `Object`: the shapes paths can descend into.
    #[inline]
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<SystemTime> {
        match self {
            Self::Date(t) => Some(*t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<Ref<'_, Object>> {
        match self {
            Self::Object(map) => Some(map.borrow()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object_mut(&self) -> Option<RefMut<'_, Object>> {
        match self {
            Self::Object(map) => Some(map.borrow_mut()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<Ref<'_, Vec<FieldValue>>> {
        match self {
            Self::Array(items) => Some(items.borrow()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array_mut(&self) -> Option<RefMut<'_, Vec<FieldValue>>> {
        match self {
            Self::Array(items) => Some(items.borrow_mut()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<Ref<'_, Vec<FieldValue>>> {
        match self {
            Self::Set(members) => Some(members.borrow()),
            _ => None,
        }
    }

    /// Insert into a set, keeping members unique. Returns `false` for non-sets
    /// and for members already present.
    pub fn set_insert(&self, member: FieldValue) -> bool {
        match self {
            Self::Set(members) => {
                let mut members = members.borrow_mut();
                if members.contains(&member) {
                    false
                } else {
                    members.push(member);
                    true
                }
            }
            _ => false,
        }
    }

    /// Direct child by key: object property, or array element when `key` is
    /// an index.
    #[must_use]
    pub fn child(&self, key: &str) -> Option<FieldValue> {
        match self {
            Self::Object(map) => map.borrow().get(key).cloned(),
            Self::Array(items) => {
                let index = key.parse::<usize>().ok()?;
                items.borrow().get(index).cloned()
            }
            _ => None,
        }
    }

    /// Store `value` under `key`. Arrays accept index keys up to
    /// [`MAX_ARRAY_INDEX`] only and are padded with `Null` up to the index.
    /// Returns `false` when nothing was stored.
    pub fn put(&self, key: &str, value: FieldValue) -> bool {
        match self {
            Self::Object(map) => {
                map.borrow_mut().insert(key.to_owned(), value);
                true
            }
            Self::Array(items) => {
                let Some(index) = key
                    .parse::<usize>()
                    .ok()
                    .filter(|index| *index <= MAX_ARRAY_INDEX)
                else {
                    return false;
                };
                let mut items = items.borrow_mut();
                if index >= items.len() {
                    items.resize(index + 1, FieldValue::Null);
                }
                items[index] = value;
                true
            }
            _ => false,
        }
    }

    /// Truthiness as the host environment defines it.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// An object with no keys, or an array whose slots are all `Null`.
    #[must_use]
    pub fn is_empty_container(&self) -> bool {
        match self {
            Self::Object(map) => map.borrow().is_empty(),
            Self::Array(items) => items.borrow().iter().all(FieldValue::is_null),
            _ => false,
        }
    }

    /// Identity comparison. Shared values compare by pointer, scalars by value.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Set(a), Self::Set(b)) | (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
            (Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Set(a), Self::Set(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|member| b.contains(member))
            }
            (Self::Object(a), Self::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
            (Self::Callable(a), Self::Callable(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::Date(t) => write!(f, "Date({t:?})"),
            Self::Set(members) => match members.try_borrow() {
                Ok(members) => f.debug_set().entries(members.iter()).finish(),
                Err(_) => f.write_str("Set(<borrowed>)"),
            },
            Self::Array(items) => match items.try_borrow() {
                Ok(items) => f.debug_list().entries(items.iter()).finish(),
                Err(_) => f.write_str("Array(<borrowed>)"),
            },
            Self::Object(map) => match map.try_borrow() {
                Ok(map) => f.debug_map().entries(map.iter()).finish(),
                Err(_) => f.write_str("Object(<borrowed>)"),
            },
            Self::Opaque(handle) => write!(f, "Opaque({:?} #{})", handle.kind, handle.id),
            Self::Callable(c) => c.fmt(f),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<SystemTime> for FieldValue {
    fn from(value: SystemTime) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// ─── JSON conversion ─────────────────────────────────────────────────────────

#[cfg(feature = "serde")]
mod json {
    use super::FieldValue;
    use serde_json::{Map, Number, Value};
    use web_time::{Duration, UNIX_EPOCH};

    impl From<&Value> for FieldValue {
        fn from(value: &Value) -> Self {
            match value {
                Value::Null => Self::Null,
                Value::Bool(b) => Self::Bool(*b),
                Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
                Value::String(s) => Self::Text(s.clone()),
                Value::Array(items) => Self::array(items.iter().map(Self::from)),
                Value::Object(map) => {
                    Self::object_from(map.iter().map(|(k, v)| (k.clone(), Self::from(v))))
                }
            }
        }
    }

    impl FieldValue {
        /// Convert to JSON. Dates become epoch milliseconds, sets become
        /// arrays, and opaque/callable values become `null`.
        #[must_use]
        pub fn to_json(&self) -> Value {
            match self {
                Self::Null | Self::Opaque(_) | Self::Callable(_) => Value::Null,
                Self::Bool(b) => Value::Bool(*b),
                Self::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
                Self::Text(s) => Value::String(s.clone()),
                Self::Date(t) => {
                    let millis = t
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or(Duration::ZERO)
                        .as_millis();
                    Value::Number(Number::from(u64::try_from(millis).unwrap_or(u64::MAX)))
                }
                Self::Set(items) | Self::Array(items) => {
                    Value::Array(items.borrow().iter().map(Self::to_json).collect())
                }
                Self::Object(map) => Value::Object(
                    map.borrow()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect::<Map<_, _>>(),
                ),
            }
        }
    }
}
