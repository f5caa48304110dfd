//! Owned JSON values for query evaluation.
//!
//! The engine works on its own value type rather than `serde_json::Value`:
//! queries need three extra citizens — compiled regexes, slice triples and
//! [`Deferred`] thunks — and object iteration order must be insertion order.

use crate::error::Error;
use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

// ----------------------------------------------------------------- Type tags

/// Bit-flag type tag carried by every [`Value`].
///
/// Tags classify operands before evaluation: binop output inference, bracket
/// entry classification and function argument masks all work on `Ty` rather
/// than on concrete values, so a [`Deferred`] can participate with its
/// declared tag (possibly [`Ty::UNKNOWN`]).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ty(u16);

impl Ty {
    pub const NULL: Ty = Ty(1);
    pub const BOOL: Ty = Ty(1 << 1);
    pub const INT: Ty = Ty(1 << 2);
    pub const FLOAT: Ty = Ty(1 << 3);
    pub const STR: Ty = Ty(1 << 4);
    pub const REGEX: Ty = Ty(1 << 5);
    pub const SLICE: Ty = Ty(1 << 6);
    pub const ARR: Ty = Ty(1 << 7);
    pub const OBJ: Ty = Ty(1 << 8);
    /// The tag of a deferred value whose output type cannot be inferred.
    pub const UNKNOWN: Ty = Ty(1 << 9);

    pub const NUM: Ty = Ty(Ty::INT.0 | Ty::FLOAT.0);
    pub const ITERABLE: Ty = Ty(Ty::ARR.0 | Ty::OBJ.0);
    pub const STR_OR_REGEX: Ty = Ty(Ty::STR.0 | Ty::REGEX.0);
    pub const INT_OR_SLICE: Ty = Ty(Ty::INT.0 | Ty::SLICE.0);
    /// Every tag at once; used as the "anything goes" argument mask.
    pub const ANY: Ty = Ty(u16::MAX);

    /// Const union, usable in static mask tables.
    pub const fn union(self, other: Ty) -> Ty {
        Ty(self.0 | other.0)
    }

    /// True when the two tags share at least one flag.
    pub fn intersects(self, other: Ty) -> bool {
        self.0 & other.0 != 0
    }

    /// True when every flag of `other` is set in `self`.
    pub fn contains(self, other: Ty) -> bool {
        self.0 & other.0 == other.0
    }

    /// True for a tag that could be an array or object.
    pub fn is_iterable(self) -> bool {
        self.intersects(Ty::ITERABLE)
    }

    /// A short human label, used in error messages.
    pub fn label(self) -> String {
        const NAMES: &[(Ty, &str)] = &[
            (Ty::NULL, "null"),
            (Ty::BOOL, "bool"),
            (Ty::INT, "int"),
            (Ty::FLOAT, "float"),
            (Ty::STR, "string"),
            (Ty::REGEX, "regex"),
            (Ty::SLICE, "slice"),
            (Ty::ARR, "array"),
            (Ty::OBJ, "object"),
            (Ty::UNKNOWN, "unknown"),
        ];
        let parts: Vec<&str> = NAMES
            .iter()
            .filter(|(t, _)| self.intersects(*t))
            .map(|(_, n)| *n)
            .collect();
        parts.join("|")
    }
}

impl BitOr for Ty {
    type Output = Ty;
    fn bitor(self, rhs: Ty) -> Ty {
        Ty(self.0 | rhs.0)
    }
}

impl BitOrAssign for Ty {
    fn bitor_assign(&mut self, rhs: Ty) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({})", self.label())
    }
}

// -------------------------------------------------------------------- Slice

/// A `[start:stop:step]` triple with Python slicing semantics.
///
/// Missing parts stay `None`; negative indices count from the end and a
/// negative step walks backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Slice { start, stop, step }
    }

    /// The positions this slice selects in a sequence of length `len`,
    /// in selection order.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as i64;
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Vec::new();
        }
        let norm = |i: i64, lo: i64, hi: i64| -> i64 {
            let i = if i < 0 { i + len } else { i };
            i.clamp(lo, hi)
        };
        let mut out = Vec::new();
        if step > 0 {
            let start = self.start.map_or(0, |i| norm(i, 0, len));
            let stop = self.stop.map_or(len, |i| norm(i, 0, len));
            let mut i = start;
            while i < stop {
                out.push(i as usize);
                i += step;
            }
        } else {
            let start = self.start.map_or(len - 1, |i| norm(i, -1, len - 1));
            let stop = self.stop.map_or(-1, |i| norm(i, -1, len - 1));
            let mut i = start;
            while i > stop {
                out.push(i as usize);
                i += step;
            }
        }
        out
    }
}

// ----------------------------------------------------------------- Deferred

/// The closure type inside a [`Deferred`] value.
pub type DeferredFn = dyn Fn(&Value) -> Result<Value, Error> + Send + Sync;

/// A value that stands for "a function of the current input".
///
/// Carries a declared output tag and a pure body `Input -> Value`. Deferred
/// values propagate through every operator and function: if any operand is
/// deferred, the result is a new `Deferred` closing over the operand bodies.
#[derive(Clone)]
pub struct Deferred {
    ty: Ty,
    body: Arc<DeferredFn>,
}

impl Deferred {
    pub fn new<F>(ty: Ty, body: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Deferred {
            ty,
            body: Arc::new(body),
        }
    }

    /// The deferred identity: resolves to the current input itself.
    pub fn identity() -> Self {
        Deferred::new(Ty::UNKNOWN, |input| Ok(input.clone()))
    }

    /// The declared output tag.
    pub fn ty(&self) -> Ty {
        self.ty
    }

    /// Invokes the body against `input`.
    pub fn call(&self, input: &Value) -> Result<Value, Error> {
        (self.body)(input)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deferred({})", self.ty.label())
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

// -------------------------------------------------------------------- Value

/// Insertion-ordered object representation.
pub type Object = IndexMap<String, Value>;

/// A JSON value extended with the engine-only variants `Regex`, `Slice` and
/// `Deferred`.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Regex(Regex),
    Slice(Slice),
    Array(Vec<Value>),
    Object(Object),
    Deferred(Deferred),
}

impl Value {
    /// The type tag. A deferred value reports its declared output tag.
    pub fn ty(&self) -> Ty {
        match self {
            Value::Null => Ty::NULL,
            Value::Bool(_) => Ty::BOOL,
            Value::Int(_) => Ty::INT,
            Value::Float(_) => Ty::FLOAT,
            Value::Str(_) => Ty::STR,
            Value::Regex(_) => Ty::REGEX,
            Value::Slice(_) => Ty::SLICE,
            Value::Array(_) => Ty::ARR,
            Value::Object(_) => Ty::OBJ,
            Value::Deferred(d) => d.ty(),
        }
    }

    /// A short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Regex(_) => "regex",
            Value::Slice(_) => "slice",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Deferred(_) => "deferred",
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Container length; 0 for everything else.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(a) => a.len(),
            Value::Object(o) => o.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves this value against the current input: invokes a deferred
    /// body, clones anything concrete.
    pub fn resolve(&self, input: &Value) -> Result<Value, Error> {
        match self {
            Value::Deferred(d) => d.call(input),
            other => Ok(other.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    // ------------------------------------------------------ serde interop

    /// Converts back to `serde_json::Value`.
    ///
    /// Engine-only variants have no JSON form: a leftover `Deferred`,
    /// `Regex` or `Slice` in an output tree is a cast error. Non-finite
    /// floats become `null`.
    pub fn into_json(self) -> Result<serde_json::Value, Error> {
        use serde_json::Value as J;
        Ok(match self {
            Value::Null => J::Null,
            Value::Bool(b) => J::Bool(b),
            Value::Int(n) => J::Number(n.into()),
            Value::Float(f) => serde_json::Number::from_f64(f).map_or(J::Null, J::Number),
            Value::Str(s) => J::String(s),
            Value::Array(a) => J::Array(
                a.into_iter()
                    .map(Value::into_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(o) => J::Object(
                o.into_iter()
                    .map(|(k, v)| Ok((k, v.into_json()?)))
                    .collect::<Result<_, Error>>()?,
            ),
            other => {
                return Err(Error::Cast {
                    expected: "a JSON value",
                    found: other.type_name(),
                })
            }
        })
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        use serde_json::Value as J;
        match v {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(*b),
            J::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            J::String(s) => Value::Str(s.clone()),
            J::Array(a) => Value::Array(a.iter().map(Value::from).collect()),
            J::Object(o) => Value::Object(o.iter().map(|(k, v)| (k.clone(), v.into())).collect()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::from(&v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a.as_str() == b.as_str(),
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Deferred(a), Value::Deferred(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_composites() {
        assert!(Ty::NUM.contains(Ty::INT));
        assert!(Ty::NUM.contains(Ty::FLOAT));
        assert!(!Ty::NUM.intersects(Ty::STR));
        assert!(Ty::ITERABLE.intersects(Ty::OBJ));
        assert_eq!(Ty::INT | Ty::FLOAT, Ty::NUM);
    }

    #[test]
    fn test_value_tags() {
        assert_eq!(Value::Int(1).ty(), Ty::INT);
        assert_eq!(Value::Array(vec![]).ty(), Ty::ARR);
        assert_eq!(Value::Deferred(Deferred::identity()).ty(), Ty::UNKNOWN);
    }

    #[test]
    fn test_slice_indices_forward() {
        let s = Slice::new(Some(1), Some(4), None);
        assert_eq!(s.indices(6), vec![1, 2, 3]);
        let s = Slice::new(None, None, Some(2));
        assert_eq!(s.indices(5), vec![0, 2, 4]);
    }

    #[test]
    fn test_slice_indices_negative() {
        let s = Slice::new(Some(-2), None, None);
        assert_eq!(s.indices(5), vec![3, 4]);
        let s = Slice::new(None, None, Some(-1));
        assert_eq!(s.indices(3), vec![2, 1, 0]);
        let s = Slice::new(Some(-1), Some(0), Some(-1));
        assert_eq!(s.indices(4), vec![3, 2, 1]);
    }

    #[test]
    fn test_slice_indices_clamped() {
        let s = Slice::new(Some(-100), Some(100), None);
        assert_eq!(s.indices(3), vec![0, 1, 2]);
        let s = Slice::new(Some(5), Some(10), None);
        assert_eq!(s.indices(3), Vec::<usize>::new());
    }

    #[test]
    fn test_deferred_identity() {
        let d = Deferred::identity();
        let v = Value::Int(7);
        assert_eq!(d.call(&v).unwrap(), v);
    }

    #[test]
    fn test_json_round_trip() {
        let j = serde_json::json!({"b": 1, "a": [true, null, 2.5, "x"]});
        let v = Value::from(&j);
        assert_eq!(v.into_json().unwrap(), j);
    }

    #[test]
    fn test_into_json_rejects_engine_values() {
        let v = Value::Deferred(Deferred::identity());
        assert!(matches!(v.into_json(), Err(Error::Cast { .. })));
    }
}
