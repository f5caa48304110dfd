//! Output-type inference and vectorized application of binary operators.
//!
//! Scalar ops lift over containers elementwise: container ∘ container pairs
//! up elements (equal lengths, and equal key sets for objects), container ∘
//! scalar maps the scalar over every element, and any deferred operand turns
//! the whole application into a new deferred value.

use crate::binop::{Binop, Kind};
use crate::error::Error;
use crate::value::{Deferred, Object, Ty, Value};

/// Infers the output tag of `op` applied to operands tagged `lt` and `rt`,
/// rejecting combinations the operator cannot accept.
pub fn out_type(op: &Binop, lt: Ty, rt: Ty) -> Result<Ty, Error> {
    if lt == Ty::UNKNOWN || rt == Ty::UNKNOWN {
        return Ok(Ty::UNKNOWN);
    }
    if lt.is_iterable() || rt.is_iterable() {
        if (lt == Ty::OBJ && rt == Ty::ARR) || (lt == Ty::ARR && rt == Ty::OBJ) {
            return Err(Error::Type(
                "cannot combine an object with an array".into(),
            ));
        }
        return Ok(if lt == Ty::OBJ || rt == Ty::OBJ {
            Ty::OBJ
        } else {
            Ty::ARR
        });
    }
    match op.kind {
        Kind::Cmp => Ok(Ty::BOOL),
        Kind::Bit => {
            if lt == Ty::INT && rt == Ty::INT {
                Ok(Ty::INT)
            } else if lt == Ty::BOOL && rt == Ty::BOOL {
                Ok(Ty::BOOL)
            } else {
                Err(Error::Type(format!(
                    "'{}' needs two ints or two bools, got {} and {}",
                    op.name,
                    lt.label(),
                    rt.label()
                )))
            }
        }
        Kind::Add if lt == Ty::STR || rt == Ty::STR => {
            if lt == Ty::STR && rt == Ty::STR {
                Ok(Ty::STR)
            } else {
                Err(Error::Type(format!(
                    "'+' cannot concatenate {} and {}",
                    lt.label(),
                    rt.label()
                )))
            }
        }
        _ => arith_type(op, lt, rt),
    }
}

fn arith_type(op: &Binop, lt: Ty, rt: Ty) -> Result<Ty, Error> {
    if !lt.intersects(Ty::NUM | Ty::BOOL) || !rt.intersects(Ty::NUM | Ty::BOOL) {
        return Err(Error::Type(format!(
            "'{}' is not defined on {} and {}",
            op.name,
            lt.label(),
            rt.label()
        )));
    }
    if lt == Ty::BOOL && rt == Ty::BOOL {
        return Err(Error::Type(format!("'{}' is not defined on bools", op.name)));
    }
    Ok(match op.kind {
        Kind::FloorDiv if lt == Ty::INT && rt == Ty::INT => Ty::INT,
        Kind::Div | Kind::Pow => Ty::FLOAT,
        _ if lt == Ty::INT && rt == Ty::INT => Ty::INT,
        _ => Ty::FLOAT,
    })
}

/// Applies `op` to two values with full deferred and vectorization handling.
pub fn apply(op: &'static Binop, left: &Value, right: &Value) -> Result<Value, Error> {
    if left.is_deferred() || right.is_deferred() {
        let ty = out_type(op, left.ty(), right.ty())?;
        let (l, r) = (left.clone(), right.clone());
        return Ok(Value::Deferred(Deferred::new(ty, move |input| {
            let lv = l.resolve(input)?;
            let rv = r.resolve(input)?;
            apply(op, &lv, &rv)
        })));
    }
    out_type(op, left.ty(), right.ty())?;
    match (left, right) {
        (Value::Object(a), Value::Object(b)) => {
            if a.len() != b.len() {
                return Err(Error::length_mismatch(a.len(), b.len()));
            }
            let mut out = Object::with_capacity(a.len());
            for (k, av) in a {
                let bv = b.get(k).ok_or_else(|| {
                    Error::VectorizedArithmetic(format!("key {k:?} missing from right operand"))
                })?;
                out.insert(k.clone(), apply(op, av, bv)?);
            }
            Ok(Value::Object(out))
        }
        (Value::Array(a), Value::Array(b)) => {
            if a.len() != b.len() {
                return Err(Error::length_mismatch(a.len(), b.len()));
            }
            a.iter()
                .zip(b)
                .map(|(av, bv)| apply(op, av, bv))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        (Value::Object(a), s) => {
            let mut out = Object::with_capacity(a.len());
            for (k, av) in a {
                out.insert(k.clone(), apply(op, av, s)?);
            }
            Ok(Value::Object(out))
        }
        (s, Value::Object(b)) => {
            let mut out = Object::with_capacity(b.len());
            for (k, bv) in b {
                out.insert(k.clone(), apply(op, s, bv)?);
            }
            Ok(Value::Object(out))
        }
        (Value::Array(a), s) => a
            .iter()
            .map(|av| apply(op, av, s))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (s, Value::Array(b)) => b
            .iter()
            .map(|bv| apply(op, s, bv))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        _ => op.call_scalar(left, right),
    }
}

/// Unary minus, with the same deferred and container lifting as [`apply`].
pub fn negate(value: &Value) -> Result<Value, Error> {
    match value {
        Value::Int(n) => Ok(Value::Int(-n)),
        Value::Float(f) => Ok(Value::Float(-f)),
        Value::Array(a) => a
            .iter()
            .map(negate)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(o) => {
            let mut out = Object::with_capacity(o.len());
            for (k, v) in o {
                out.insert(k.clone(), negate(v)?);
            }
            Ok(Value::Object(out))
        }
        Value::Deferred(d) => {
            let d = d.clone();
            Ok(Value::Deferred(Deferred::new(d.ty(), move |input| {
                negate(&d.call(input)?)
            })))
        }
        other => Err(Error::Type(format!(
            "cannot negate {}",
            other.type_name()
        ))),
    }
}
