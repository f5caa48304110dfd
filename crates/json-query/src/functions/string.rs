//! String argument functions.

use crate::error::Error;
use crate::functions::FnDef;
use crate::value::{Ty, Value};

pub fn functions() -> Vec<&'static FnDef> {
    DEFS.iter().collect()
}

static DEFS: [FnDef; 6] = [
    FnDef {
        name: "str",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::ANY],
        ret: Ty::STR,
        vectorized: true,
        deterministic: true,
        body: str_body,
    },
    FnDef {
        name: "upper",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::STR],
        ret: Ty::STR,
        vectorized: true,
        deterministic: true,
        body: upper_body,
    },
    FnDef {
        name: "lower",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::STR],
        ret: Ty::STR,
        vectorized: true,
        deterministic: true,
        body: lower_body,
    },
    FnDef {
        name: "s_mul",
        min_args: 2,
        max_args: Some(2),
        arg_types: &[Ty::STR, Ty::INT],
        ret: Ty::STR,
        vectorized: true,
        deterministic: true,
        body: s_mul_body,
    },
    FnDef {
        name: "split",
        min_args: 1,
        max_args: Some(2),
        arg_types: &[Ty::STR, Ty::STR],
        ret: Ty::ARR,
        vectorized: false,
        deterministic: true,
        body: split_body,
    },
    FnDef {
        name: "join",
        min_args: 1,
        max_args: Some(2),
        arg_types: &[Ty::ARR, Ty::STR],
        ret: Ty::STR,
        vectorized: false,
        deterministic: true,
        body: join_body,
    },
];

fn want_str<'a>(v: &'a Value, who: &'static str) -> Result<&'a str, Error> {
    v.as_str()
        .ok_or_else(|| Error::Type(format!("{who}() expects a string, got {}", v.type_name())))
}

fn str_body(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Str(match &args[0] {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Regex(re) => re.as_str().to_string(),
        Value::Array(_) | Value::Object(_) => args[0].clone().into_json()?.to_string(),
        other => {
            return Err(Error::Cast {
                expected: "a printable value",
                found: other.type_name(),
            })
        }
    }))
}

fn upper_body(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Str(want_str(&args[0], "upper")?.to_uppercase()))
}

fn lower_body(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Str(want_str(&args[0], "lower")?.to_lowercase()))
}

fn s_mul_body(args: &[Value]) -> Result<Value, Error> {
    let s = want_str(&args[0], "s_mul")?;
    let n = args[1].as_i64().ok_or_else(|| {
        Error::Type(format!(
            "s_mul() repeat count must be an int, got {}",
            args[1].type_name()
        ))
    })?;
    Ok(Value::Str(s.repeat(n.max(0) as usize)))
}

fn split_body(args: &[Value]) -> Result<Value, Error> {
    let s = want_str(&args[0], "split")?;
    let parts: Vec<Value> = match &args[1] {
        Value::Null => s.split_whitespace().map(Value::from).collect(),
        Value::Str(sep) if !sep.is_empty() => s.split(sep.as_str()).map(Value::from).collect(),
        Value::Str(_) => return Err(Error::Type("split() separator must not be empty".into())),
        other => {
            return Err(Error::Type(format!(
                "split() separator must be a string, got {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Array(parts))
}

fn join_body(args: &[Value]) -> Result<Value, Error> {
    let arr = match &args[0] {
        Value::Array(a) => a,
        other => {
            return Err(Error::Cast {
                expected: "an array",
                found: other.type_name(),
            })
        }
    };
    let sep = match &args[1] {
        Value::Null => "",
        Value::Str(s) => s.as_str(),
        other => {
            return Err(Error::Type(format!(
                "join() separator must be a string, got {}",
                other.type_name()
            )))
        }
    };
    let parts: Vec<&str> = arr
        .iter()
        .map(|v| want_str(v, "join"))
        .collect::<Result<_, _>>()?;
    Ok(Value::Str(parts.join(sep)))
}
