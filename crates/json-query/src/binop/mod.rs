//! Binary operators: descriptors, scalar bodies and the symbol table.
//!
//! A [`Binop`] is data — name, precedence, category and a scalar callable.
//! Containers and deferred operands never reach the callable; the lifting
//! rules live in [`apply`](crate::binop::apply).

pub mod apply;
pub mod tree;

pub use apply::{apply, negate, out_type};
pub use tree::TreeBuilder;

use crate::error::Error;
use crate::value::Value;

/// Operator category, used by output-type inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Cmp,
    Bit,
}

/// A binary operator descriptor.
pub struct Binop {
    pub name: &'static str,
    pub precedence: f64,
    pub kind: Kind,
    right_assoc: bool,
    scalar: fn(&Value, &Value) -> Result<Value, Error>,
}

impl Binop {
    /// Precedence while competing for operands. Right-associative operators
    /// get a fractional bump so `a ** b ** c` nests to the right.
    pub fn effective_precedence(&self) -> f64 {
        if self.right_assoc {
            self.precedence + 0.1
        } else {
            self.precedence
        }
    }

    /// The scalar body. Callers must have stripped containers and deferred
    /// operands first; see [`apply::apply`].
    pub fn call_scalar(&self, left: &Value, right: &Value) -> Result<Value, Error> {
        (self.scalar)(left, right)
    }
}

impl std::fmt::Debug for Binop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Binop({})", self.name)
    }
}

/// Looks a binop up by its surface symbol.
pub fn lookup(symbol: &str) -> Option<&'static Binop> {
    BINOPS.iter().find(|b| b.name == symbol)
}

/// The fused unary-minus-exponentiation operator: `-x ** y` parses as a
/// single `negpow` so the minus applies to the power, not the base.
pub fn negpow() -> &'static Binop {
    &NEGPOW
}

static NEGPOW: Binop = Binop {
    name: "negpow",
    precedence: 6.0,
    kind: Kind::Pow,
    right_assoc: true,
    scalar: scalar_negpow,
};

static BINOPS: &[Binop] = &[
    Binop { name: "|", precedence: 1.0, kind: Kind::Bit, right_assoc: false, scalar: scalar_or },
    Binop { name: "^", precedence: 1.5, kind: Kind::Bit, right_assoc: false, scalar: scalar_xor },
    Binop { name: "&", precedence: 2.0, kind: Kind::Bit, right_assoc: false, scalar: scalar_and },
    Binop { name: "==", precedence: 3.0, kind: Kind::Cmp, right_assoc: false, scalar: scalar_eq },
    Binop { name: "!=", precedence: 3.0, kind: Kind::Cmp, right_assoc: false, scalar: scalar_ne },
    Binop { name: "<", precedence: 3.0, kind: Kind::Cmp, right_assoc: false, scalar: scalar_lt },
    Binop { name: "<=", precedence: 3.0, kind: Kind::Cmp, right_assoc: false, scalar: scalar_le },
    Binop { name: ">", precedence: 3.0, kind: Kind::Cmp, right_assoc: false, scalar: scalar_gt },
    Binop { name: ">=", precedence: 3.0, kind: Kind::Cmp, right_assoc: false, scalar: scalar_ge },
    Binop { name: "+", precedence: 4.0, kind: Kind::Add, right_assoc: false, scalar: scalar_add },
    Binop { name: "-", precedence: 4.0, kind: Kind::Sub, right_assoc: false, scalar: scalar_sub },
    Binop { name: "*", precedence: 5.0, kind: Kind::Mul, right_assoc: false, scalar: scalar_mul },
    Binop { name: "/", precedence: 5.0, kind: Kind::Div, right_assoc: false, scalar: scalar_div },
    Binop { name: "//", precedence: 5.0, kind: Kind::FloorDiv, right_assoc: false, scalar: scalar_floordiv },
    Binop { name: "%", precedence: 5.0, kind: Kind::Mod, right_assoc: false, scalar: scalar_mod },
    Binop { name: "**", precedence: 6.0, kind: Kind::Pow, right_assoc: true, scalar: scalar_pow },
];

// -------------------------------------------------------------- Scalar bodies

fn num(v: &Value) -> Result<f64, Error> {
    match v {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(Error::Type(format!("{} is not numeric", other.type_name()))),
    }
}

fn scalar_add(l: &Value, r: &Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => {
            let mut s = String::with_capacity(a.len() + b.len());
            s.push_str(a);
            s.push_str(b);
            Ok(Value::Str(s))
        }
        (Value::Int(a), Value::Int(b)) => Ok(a
            .checked_add(*b)
            .map_or(Value::Float(*a as f64 + *b as f64), Value::Int)),
        _ => Ok(Value::Float(num(l)? + num(r)?)),
    }
}

fn scalar_sub(l: &Value, r: &Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(a
            .checked_sub(*b)
            .map_or(Value::Float(*a as f64 - *b as f64), Value::Int)),
        _ => Ok(Value::Float(num(l)? - num(r)?)),
    }
}

fn scalar_mul(l: &Value, r: &Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(a
            .checked_mul(*b)
            .map_or(Value::Float(*a as f64 * *b as f64), Value::Int)),
        _ => Ok(Value::Float(num(l)? * num(r)?)),
    }
}

fn scalar_div(l: &Value, r: &Value) -> Result<Value, Error> {
    let rv = num(r)?;
    if rv == 0.0 {
        return Err(Error::Type("division by zero".into()));
    }
    Ok(Value::Float(num(l)? / rv))
}

fn scalar_floordiv(l: &Value, r: &Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(Error::Type("division by zero".into()));
            }
            // Floor semantics: round toward negative infinity.
            let q = a / b;
            let rem = a % b;
            Ok(Value::Int(if rem != 0 && (rem < 0) != (*b < 0) {
                q - 1
            } else {
                q
            }))
        }
        _ => {
            let rv = num(r)?;
            if rv == 0.0 {
                return Err(Error::Type("division by zero".into()));
            }
            Ok(Value::Float((num(l)? / rv).floor()))
        }
    }
}

fn scalar_mod(l: &Value, r: &Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(Error::Type("modulo by zero".into()));
            }
            // The result takes the sign of the divisor.
            Ok(Value::Int(((a % b) + b) % b))
        }
        _ => {
            let rv = num(r)?;
            if rv == 0.0 {
                return Err(Error::Type("modulo by zero".into()));
            }
            let lv = num(l)?;
            Ok(Value::Float(lv - rv * (lv / rv).floor()))
        }
    }
}

fn scalar_pow(l: &Value, r: &Value) -> Result<Value, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) if *b >= 0 => {
            let exact = u32::try_from(*b).ok().and_then(|e| a.checked_pow(e));
            Ok(exact.map_or(Value::Float((*a as f64).powf(*b as f64)), Value::Int))
        }
        _ => Ok(Value::Float(num(l)?.powf(num(r)?))),
    }
}

fn scalar_negpow(l: &Value, r: &Value) -> Result<Value, Error> {
    match scalar_pow(l, r)? {
        Value::Int(n) => Ok(Value::Int(-n)),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Ok(other),
    }
}

fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => l == r,
    }
}

fn scalar_eq(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(Value::Bool(values_equal(l, r)))
}

fn scalar_ne(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(Value::Bool(!values_equal(l, r)))
}

fn ordering(l: &Value, r: &Value) -> Result<std::cmp::Ordering, Error> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => {
            let (a, b) = (num(l)?, num(r)?);
            a.partial_cmp(&b)
                .ok_or_else(|| Error::Type("cannot order NaN".into()))
        }
    }
}

fn scalar_lt(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(Value::Bool(ordering(l, r)? == std::cmp::Ordering::Less))
}

fn scalar_le(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(Value::Bool(ordering(l, r)? != std::cmp::Ordering::Greater))
}

fn scalar_gt(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(Value::Bool(ordering(l, r)? == std::cmp::Ordering::Greater))
}

fn scalar_ge(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(Value::Bool(ordering(l, r)? != std::cmp::Ordering::Less))
}

fn bits(l: &Value, r: &Value) -> Result<Option<(i64, i64)>, Error> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(Some((*a, *b))),
        (Value::Bool(_), Value::Bool(_)) => Ok(None),
        _ => Err(Error::Type(format!(
            "bitwise operator needs two ints or two bools, got {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn scalar_and(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(match bits(l, r)? {
        Some((a, b)) => Value::Int(a & b),
        None => Value::Bool(l.as_bool().unwrap_or(false) && r.as_bool().unwrap_or(false)),
    })
}

fn scalar_or(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(match bits(l, r)? {
        Some((a, b)) => Value::Int(a | b),
        None => Value::Bool(l.as_bool().unwrap_or(false) || r.as_bool().unwrap_or(false)),
    })
}

fn scalar_xor(l: &Value, r: &Value) -> Result<Value, Error> {
    Ok(match bits(l, r)? {
        Some((a, b)) => Value::Int(a ^ b),
        None => Value::Bool(l.as_bool().unwrap_or(false) != r.as_bool().unwrap_or(false)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("+").unwrap().name, "+");
        assert_eq!(lookup("**").unwrap().kind, Kind::Pow);
        assert!(lookup("<<").is_none());
    }

    #[test]
    fn test_exponent_binds_right() {
        let pow = lookup("**").unwrap();
        assert!(pow.effective_precedence() > pow.precedence);
        let mul = lookup("*").unwrap();
        assert_eq!(mul.effective_precedence(), mul.precedence);
    }

    #[test]
    fn test_floor_division_rounds_down() {
        let v = scalar_floordiv(&Value::Int(-7), &Value::Int(2)).unwrap();
        assert_eq!(v, Value::Int(-4));
        let v = scalar_floordiv(&Value::Int(7), &Value::Int(-2)).unwrap();
        assert_eq!(v, Value::Int(-4));
    }

    #[test]
    fn test_modulo_sign_follows_divisor() {
        assert_eq!(
            scalar_mod(&Value::Int(-7), &Value::Int(3)).unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            scalar_mod(&Value::Int(7), &Value::Int(-3)).unwrap(),
            Value::Int(-2)
        );
    }

    #[test]
    fn test_pow_stays_integral_when_exact() {
        assert_eq!(
            scalar_pow(&Value::Int(2), &Value::Int(10)).unwrap(),
            Value::Int(1024)
        );
        assert_eq!(
            scalar_pow(&Value::Int(2), &Value::Int(-1)).unwrap(),
            Value::Float(0.5)
        );
    }

    #[test]
    fn test_mixed_numeric_equality() {
        assert_eq!(
            scalar_eq(&Value::Int(1), &Value::Float(1.0)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            scalar_eq(&Value::Str("a".into()), &Value::Int(1)).unwrap(),
            Value::Bool(false)
        );
    }
}
