//! Container argument functions.

use crate::error::Error;
use crate::functions::FnDef;
use crate::value::{Ty, Value};

pub fn functions() -> Vec<&'static FnDef> {
    DEFS.iter().collect()
}

static DEFS: [FnDef; 6] = [
    FnDef {
        name: "len",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::STR.union(Ty::ITERABLE)],
        ret: Ty::INT,
        vectorized: false,
        deterministic: true,
        body: len_body,
    },
    FnDef {
        name: "keys",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::OBJ],
        ret: Ty::ARR,
        vectorized: false,
        deterministic: true,
        body: keys_body,
    },
    FnDef {
        name: "values",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::OBJ],
        ret: Ty::ARR,
        vectorized: false,
        deterministic: true,
        body: values_body,
    },
    FnDef {
        name: "rev",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::ARR.union(Ty::STR)],
        ret: Ty::ARR.union(Ty::STR),
        vectorized: false,
        deterministic: true,
        body: rev_body,
    },
    FnDef {
        name: "sort",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::ARR],
        ret: Ty::ARR,
        vectorized: false,
        deterministic: true,
        body: sort_body,
    },
    FnDef {
        name: "contains",
        min_args: 2,
        max_args: Some(2),
        arg_types: &[Ty::STR.union(Ty::ITERABLE), Ty::ANY],
        ret: Ty::BOOL,
        vectorized: false,
        deterministic: true,
        body: contains_body,
    },
];

fn len_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(a) => Ok(Value::Int(a.len() as i64)),
        Value::Object(o) => Ok(Value::Int(o.len() as i64)),
        other => Err(Error::Type(format!(
            "len() expects a string or container, got {}",
            other.type_name()
        ))),
    }
}

fn keys_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Object(o) => Ok(Value::Array(
            o.keys().map(|k| Value::Str(k.clone())).collect(),
        )),
        other => Err(Error::Cast {
            expected: "an object",
            found: other.type_name(),
        }),
    }
}

fn values_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Object(o) => Ok(Value::Array(o.values().cloned().collect())),
        other => Err(Error::Cast {
            expected: "an object",
            found: other.type_name(),
        }),
    }
}

fn rev_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Array(a) => Ok(Value::Array(a.iter().rev().cloned().collect())),
        Value::Str(s) => Ok(Value::Str(s.chars().rev().collect())),
        other => Err(Error::Type(format!(
            "rev() expects an array or string, got {}",
            other.type_name()
        ))),
    }
}

fn sort_body(args: &[Value]) -> Result<Value, Error> {
    let arr = match &args[0] {
        Value::Array(a) => a,
        other => {
            return Err(Error::Cast {
                expected: "an array",
                found: other.type_name(),
            })
        }
    };
    let all_numeric = arr.iter().all(|v| v.as_f64().is_some());
    let all_strings = arr.iter().all(|v| matches!(v, Value::Str(_)));
    if !all_numeric && !all_strings {
        return Err(Error::Type(
            "sort() needs all numbers or all strings".into(),
        ));
    }
    let mut out = arr.clone();
    if all_numeric {
        out.sort_by(|a, b| {
            a.as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    } else {
        out.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    }
    Ok(Value::Array(out))
}

/// Loose equality for membership tests: ints and floats compare numerically.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        _ => a == b,
    }
}

fn contains_body(args: &[Value]) -> Result<Value, Error> {
    let found = match (&args[0], &args[1]) {
        (Value::Str(s), Value::Str(needle)) => s.contains(needle.as_str()),
        (Value::Str(_), other) => {
            return Err(Error::Type(format!(
                "contains() on a string needs a string, got {}",
                other.type_name()
            )))
        }
        (Value::Array(a), needle) => a.iter().any(|v| loose_eq(v, needle)),
        (Value::Object(o), Value::Str(key)) => o.contains_key(key.as_str()),
        (Value::Object(_), other) => {
            return Err(Error::Type(format!(
                "contains() on an object needs a string key, got {}",
                other.type_name()
            )))
        }
        (other, _) => {
            return Err(Error::Cast {
                expected: "a string or container",
                found: other.type_name(),
            })
        }
    };
    Ok(Value::Bool(found))
}
