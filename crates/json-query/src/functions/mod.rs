//! Argument functions: the library callable from queries as `name(arg, …)`.
//!
//! Function signatures are data: per-position type masks, arity bounds, a
//! return tag and the two behavior flags (`vectorized`, `deterministic`)
//! that drive the applier. Bodies are plain `fn`s over evaluated values.

pub mod container;
pub mod math;
pub mod string;

use crate::error::Error;
use crate::value::{Deferred, Ty, Value};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A library function declaration.
pub struct FnDef {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` means unbounded (variadic tail).
    pub max_args: Option<usize>,
    /// Accepted tag masks per position; the last mask repeats for the tail.
    pub arg_types: &'static [Ty],
    pub ret: Ty,
    /// Lifts the call over the first argument's elements when it is a
    /// container.
    pub vectorized: bool,
    /// When false, every evaluation re-invokes the body (e.g. `rand()`).
    pub deterministic: bool,
    pub(crate) body: fn(&[Value]) -> Result<Value, Error>,
}

impl std::fmt::Debug for FnDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FnDef({})", self.name)
    }
}

/// Map of function name -> declaration.
pub type FnMap = HashMap<&'static str, &'static FnDef>;

/// All registered functions.
pub fn all_functions() -> Vec<&'static FnDef> {
    let mut defs = Vec::new();
    defs.extend(math::functions());
    defs.extend(container::functions());
    defs.extend(string::functions());
    defs
}

/// The shared registry, built once.
pub fn registry() -> &'static FnMap {
    static REGISTRY: OnceLock<FnMap> = OnceLock::new();
    REGISTRY.get_or_init(|| all_functions().into_iter().map(|d| (d.name, d)).collect())
}

// -------------------------------------------------------------- Validation

/// Renders the accepted arity for error messages.
fn arity_label(def: &FnDef) -> String {
    match (def.min_args, def.max_args) {
        (min, Some(max)) if min == max => format!("{min}"),
        (min, Some(max)) => format!("{min} to {max}"),
        (min, None) => format!("at least {min}"),
    }
}

/// Checks argument count and per-position tags against the declaration.
///
/// A trailing `null` is accepted for any optional position, and a deferred
/// argument with an unknown tag passes every mask.
pub fn validate(def: &FnDef, args: &[Value]) -> Result<(), Error> {
    let count_ok =
        args.len() >= def.min_args && def.max_args.map_or(true, |max| args.len() <= max);
    if !count_ok {
        return Err(Error::Arity {
            name: def.name,
            expected: arity_label(def),
            got: args.len(),
        });
    }
    for (i, arg) in args.iter().enumerate() {
        let mask = def
            .arg_types
            .get(i)
            .or(def.arg_types.last())
            .copied()
            .unwrap_or(Ty::ANY);
        let ty = arg.ty();
        let optional_null = i >= def.min_args && ty == Ty::NULL;
        if ty == Ty::UNKNOWN || optional_null || ty.intersects(mask) {
            continue;
        }
        return Err(Error::ArgType {
            name: def.name,
            index: i,
            expected: mask.label(),
            got: arg.type_name(),
        });
    }
    Ok(())
}

/// Pads missing optional arguments with the null sentinel so bodies see a
/// fixed arity. Only meaningful for finite `max_args`.
pub fn pad(def: &FnDef, args: &mut Vec<Value>) {
    if let Some(max) = def.max_args {
        while args.len() < max {
            args.push(Value::Null);
        }
    }
}

// -------------------------------------------------------------- Application

/// Applies a function to evaluated arguments.
///
/// Deferred arguments — or a non-deterministic declaration — defer the whole
/// call: the resulting thunk re-resolves the arguments against the current
/// input and re-invokes the synchronous path on every evaluation.
pub fn call(def: &'static FnDef, args: Vec<Value>) -> Result<Value, Error> {
    if args.iter().any(Value::is_deferred) || !def.deterministic {
        let ty = effective_ret(def, &args);
        return Ok(Value::Deferred(Deferred::new(ty, move |input| {
            let resolved: Vec<Value> = args
                .iter()
                .map(|a| a.resolve(input))
                .collect::<Result<_, _>>()?;
            call_now(def, &resolved)
        })));
    }
    call_now(def, &args)
}

/// The effective return tag: a vectorized call over an iterable first
/// argument returns that argument's container tag.
fn effective_ret(def: &FnDef, args: &[Value]) -> Ty {
    if def.vectorized {
        match args.first().map(Value::ty) {
            Some(t) if t == Ty::UNKNOWN => Ty::UNKNOWN,
            Some(t) if t.is_iterable() => t,
            _ => def.ret,
        }
    } else {
        def.ret
    }
}

fn call_now(def: &FnDef, args: &[Value]) -> Result<Value, Error> {
    if def.vectorized {
        match args.first() {
            Some(Value::Object(obj)) => {
                let mut out = crate::value::Object::with_capacity(obj.len());
                for (k, v) in obj {
                    let mut argv = Vec::with_capacity(args.len());
                    argv.push(v.clone());
                    argv.extend_from_slice(&args[1..]);
                    out.insert(k.clone(), (def.body)(&argv)?);
                }
                return Ok(Value::Object(out));
            }
            Some(Value::Array(arr)) => {
                let mut out = Vec::with_capacity(arr.len());
                for v in arr {
                    let mut argv = Vec::with_capacity(args.len());
                    argv.push(v.clone());
                    argv.extend_from_slice(&args[1..]);
                    out.push((def.body)(&argv)?);
                }
                return Ok(Value::Array(out));
            }
            _ => {}
        }
    }
    (def.body)(args)
}
