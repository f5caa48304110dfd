//! Numeric argument functions.

use crate::error::Error;
use crate::functions::FnDef;
use crate::value::{Ty, Value};

pub fn functions() -> Vec<&'static FnDef> {
    DEFS.iter().collect()
}

static DEFS: [FnDef; 11] = [
    FnDef {
        name: "sum",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::ITERABLE],
        ret: Ty::NUM,
        vectorized: false,
        deterministic: true,
        body: sum_body,
    },
    FnDef {
        name: "min",
        min_args: 1,
        max_args: None,
        arg_types: &[Ty::NUM.union(Ty::ITERABLE), Ty::NUM],
        ret: Ty::NUM,
        vectorized: false,
        deterministic: true,
        body: min_body,
    },
    FnDef {
        name: "max",
        min_args: 1,
        max_args: None,
        arg_types: &[Ty::NUM.union(Ty::ITERABLE), Ty::NUM],
        ret: Ty::NUM,
        vectorized: false,
        deterministic: true,
        body: max_body,
    },
    FnDef {
        name: "avg",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::ITERABLE],
        ret: Ty::FLOAT,
        vectorized: false,
        deterministic: true,
        body: avg_body,
    },
    FnDef {
        name: "abs",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::NUM],
        ret: Ty::NUM,
        vectorized: true,
        deterministic: true,
        body: abs_body,
    },
    FnDef {
        name: "round",
        min_args: 1,
        max_args: Some(2),
        arg_types: &[Ty::NUM, Ty::INT],
        ret: Ty::NUM,
        vectorized: true,
        deterministic: true,
        body: round_body,
    },
    FnDef {
        name: "floor",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::NUM],
        ret: Ty::INT,
        vectorized: true,
        deterministic: true,
        body: floor_body,
    },
    FnDef {
        name: "ceil",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::NUM],
        ret: Ty::INT,
        vectorized: true,
        deterministic: true,
        body: ceil_body,
    },
    FnDef {
        name: "int",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::NUM.union(Ty::STR).union(Ty::BOOL)],
        ret: Ty::INT,
        vectorized: true,
        deterministic: true,
        body: int_body,
    },
    FnDef {
        name: "float",
        min_args: 1,
        max_args: Some(1),
        arg_types: &[Ty::NUM.union(Ty::STR).union(Ty::BOOL)],
        ret: Ty::FLOAT,
        vectorized: true,
        deterministic: true,
        body: float_body,
    },
    FnDef {
        name: "rand",
        min_args: 0,
        max_args: Some(0),
        arg_types: &[],
        ret: Ty::FLOAT,
        vectorized: false,
        deterministic: false,
        body: rand_body,
    },
];

fn numeric(v: &Value, who: &'static str) -> Result<f64, Error> {
    v.as_f64()
        .ok_or_else(|| Error::Type(format!("{who}() expects numbers, got {}", v.type_name())))
}

/// Folds a numeric sequence, staying integral until a float appears.
fn fold_sum<'a>(vals: impl Iterator<Item = &'a Value>) -> Result<Value, Error> {
    let mut int_acc: i64 = 0;
    let mut float_acc = 0.0;
    let mut integral = true;
    for v in vals {
        match v {
            Value::Int(n) if integral => match int_acc.checked_add(*n) {
                Some(acc) => int_acc = acc,
                None => {
                    integral = false;
                    float_acc = int_acc as f64 + *n as f64;
                }
            },
            other => {
                if integral {
                    integral = false;
                    float_acc = int_acc as f64;
                }
                float_acc += numeric(other, "sum")?;
            }
        }
    }
    Ok(if integral {
        Value::Int(int_acc)
    } else {
        Value::Float(float_acc)
    })
}

fn sum_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Array(a) => fold_sum(a.iter()),
        Value::Object(o) => fold_sum(o.values()),
        other => Err(Error::Cast {
            expected: "a container",
            found: other.type_name(),
        }),
    }
}

/// The candidate sequence for min/max: the elements of a single iterable
/// argument, or the arguments themselves.
fn extrema_candidates(args: &[Value]) -> Result<Vec<Value>, Error> {
    let vals: Vec<Value> = match (&args[0], args.len()) {
        (Value::Array(a), 1) => a.clone(),
        (Value::Object(o), 1) => o.values().cloned().collect(),
        _ => args.to_vec(),
    };
    if vals.is_empty() {
        return Err(Error::Type("min()/max() of an empty container".into()));
    }
    Ok(vals)
}

fn extremum(args: &[Value], who: &'static str, keep_left: fn(f64, f64) -> bool) -> Result<Value, Error> {
    let vals = extrema_candidates(args)?;
    let mut best = vals[0].clone();
    let mut best_n = numeric(&best, who)?;
    for v in &vals[1..] {
        let n = numeric(v, who)?;
        if !keep_left(best_n, n) {
            best = v.clone();
            best_n = n;
        }
    }
    Ok(best)
}

fn min_body(args: &[Value]) -> Result<Value, Error> {
    extremum(args, "min", |best, n| best <= n)
}

fn max_body(args: &[Value]) -> Result<Value, Error> {
    extremum(args, "max", |best, n| best >= n)
}

fn avg_body(args: &[Value]) -> Result<Value, Error> {
    let (total, count) = match &args[0] {
        Value::Array(a) => (fold_sum(a.iter())?, a.len()),
        Value::Object(o) => (fold_sum(o.values())?, o.len()),
        other => {
            return Err(Error::Cast {
                expected: "a container",
                found: other.type_name(),
            })
        }
    };
    if count == 0 {
        return Err(Error::Type("avg() of an empty container".into()));
    }
    Ok(Value::Float(numeric(&total, "avg")? / count as f64))
}

fn abs_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.abs())),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(Error::Type(format!(
            "abs() expects a number, got {}",
            other.type_name()
        ))),
    }
}

fn round_body(args: &[Value]) -> Result<Value, Error> {
    let n = numeric(&args[0], "round")?;
    match &args[1] {
        Value::Null => Ok(Value::Int(n.round() as i64)),
        Value::Int(digits) => {
            let scale = 10f64.powi(*digits as i32);
            Ok(Value::Float((n * scale).round() / scale))
        }
        other => Err(Error::Type(format!(
            "round() digit count must be an int, got {}",
            other.type_name()
        ))),
    }
}

fn floor_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        other => Ok(Value::Int(numeric(other, "floor")?.floor() as i64)),
    }
}

fn ceil_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        other => Ok(Value::Int(numeric(other, "ceil")?.ceil() as i64)),
    }
}

fn int_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) => Ok(Value::Int(f.trunc() as i64)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::Type(format!("int() cannot parse {s:?}"))),
        other => Err(Error::Type(format!(
            "int() expects a number, bool or string, got {}",
            other.type_name()
        ))),
    }
}

fn float_body(args: &[Value]) -> Result<Value, Error> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::Type(format!("float() cannot parse {s:?}"))),
        other => Err(Error::Type(format!(
            "float() expects a number, bool or string, got {}",
            other.type_name()
        ))),
    }
}

fn rand_body(_args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Float(rand::random::<f64>()))
}
