//! Composition of indexer steps into a single `Value -> Value` function.
//!
//! The pipeline preserves container shape: each step's matches are projected
//! through the remaining steps and re-materialized into an object (for
//! dict-shaped steps) or array, except that a step known to select at most
//! one element unwraps its result to the bare value. This is why `@.a[0]` on
//! `{"a":[1]}` returns `1` rather than `{"a":[1]}`.

use crate::error::Error;
use crate::indexer::{Element, PathSeg, Step};
use crate::value::{Deferred, Object, Ty, Value};

/// Applies a compiled step sequence to a concrete value.
pub fn apply(steps: &[Step], value: &Value) -> Result<Value, Error> {
    if steps.is_empty() {
        return Ok(value.clone());
    }
    apply_at(steps, 0, value)
}

/// Wraps `atom` in the pipeline: a concrete atom is piped immediately, a
/// deferred atom becomes a new deferred that resolves the atom and then runs
/// the steps against the current input.
pub fn attach(atom: Value, steps: Vec<Step>) -> Result<Value, Error> {
    if steps.is_empty() {
        return Ok(atom);
    }
    match atom {
        Value::Deferred(d) => {
            let ty = output_ty(&steps);
            Ok(Value::Deferred(Deferred::new(ty, move |input| {
                let base = d.call(input)?;
                apply(&steps, &base)
            })))
        }
        concrete => apply(&steps, &concrete),
    }
}

/// Static output tag of a pipeline, from its final step.
fn output_ty(steps: &[Step]) -> Ty {
    match steps.last() {
        Some(step) if step.single => Ty::UNKNOWN,
        Some(step) if step.dict && !step.recursive => Ty::OBJ,
        Some(_) => Ty::ARR,
        None => Ty::UNKNOWN,
    }
}

fn empty(step: &Step) -> Value {
    if step.dict {
        Value::Object(Object::new())
    } else {
        Value::Array(Vec::new())
    }
}

fn apply_at(steps: &[Step], i: usize, value: &Value) -> Result<Value, Error> {
    let step = &steps[i];
    let last = i + 1 == steps.len();

    let mut seq = step.eval(value)?;
    if last && step.single {
        // At most one match: unwrap it without draining the sequence.
        return match seq.next() {
            Some(elem) => Ok(elem?.into_value()),
            None => Ok(empty(step)),
        };
    }
    let elems: Vec<Element> = seq.collect::<Result<_, _>>()?;
    let Some(first) = elems.first() else {
        return Ok(empty(step));
    };
    let dict_shaped = first.is_pair();

    if last {
        return Ok(materialize(elems, dict_shaped));
    }

    if step.projection {
        let container = materialize(elems, dict_shaped);
        return apply_at(steps, i + 1, &container);
    }

    // Interior step: project every match through the remaining steps. Empty
    // container subresults are dropped; scalar subresults always survive.
    let mut pairs = Vec::new();
    let mut items = Vec::new();
    for elem in elems {
        let sub = apply_at(steps, i + 1, elem.value())?;
        if sub.is_container() && sub.is_empty() {
            continue;
        }
        match elem {
            Element::Pair(k, _) if dict_shaped => pairs.push((k, sub)),
            _ => items.push(sub),
        }
    }
    if step.single {
        // One match at most; hand its subresult through unwrapped.
        if let Some((_, sub)) = pairs.pop() {
            return Ok(sub);
        }
        if let Some(sub) = items.pop() {
            return Ok(sub);
        }
        return Ok(empty(step));
    }
    Ok(if dict_shaped {
        Value::Object(pairs.into_iter().collect())
    } else {
        Value::Array(items)
    })
}

fn materialize(elems: Vec<Element>, dict_shaped: bool) -> Value {
    if dict_shaped {
        Value::Object(
            elems
                .into_iter()
                .filter_map(|e| match e {
                    Element::Pair(k, v) => Some((k, v)),
                    _ => None,
                })
                .collect(),
        )
    } else {
        Value::Array(elems.into_iter().map(Element::into_value).collect())
    }
}

// ---------------------------------------------------------------- Locating

/// The addressing twin of [`apply`]: collects the path of every node the
/// final step selects. Projections synthesize fresh values and are not
/// addressable.
pub fn locate(steps: &[Step], value: &Value) -> Result<Vec<Vec<PathSeg>>, Error> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    locate_at(steps, 0, value, &mut prefix, &mut out)?;
    Ok(out)
}

fn locate_at(
    steps: &[Step],
    i: usize,
    value: &Value,
    prefix: &mut Vec<PathSeg>,
    out: &mut Vec<Vec<PathSeg>>,
) -> Result<(), Error> {
    if i == steps.len() {
        out.push(prefix.clone());
        return Ok(());
    }
    let step = &steps[i];
    if step.projection {
        return Err(Error::InvalidMutation(
            "projections are not addressable".into(),
        ));
    }
    let elems: Vec<Element> = step.eval(value)?.collect::<Result<_, _>>()?;
    for elem in elems {
        let depth = prefix.len();
        match &elem {
            Element::Pair(k, _) => prefix.push(PathSeg::Key(k.clone())),
            Element::Item(ix, _) => prefix.push(PathSeg::Index(*ix)),
            Element::Deep(path, _) => prefix.extend(path.iter().cloned()),
            Element::Fresh(_) => {
                return Err(Error::InvalidMutation(
                    "selected value has no position in the input".into(),
                ))
            }
        }
        locate_at(steps, i + 1, elem.value(), prefix, out)?;
        prefix.truncate(depth);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{Indexer, NameEntry, SliceEntry};

    fn val(j: serde_json::Value) -> Value {
        Value::from(&j)
    }

    fn name_step(name: &str) -> Step {
        Step::new(Indexer::Names(vec![NameEntry::Literal(name.into())]), false).unwrap()
    }

    fn index_step(i: i64) -> Step {
        Step::new(Indexer::Slices(vec![SliceEntry::Index(i)]), false).unwrap()
    }

    #[test]
    fn test_single_steps_unwrap() {
        let v = val(serde_json::json!({"a": [1, 2, 3]}));
        let steps = vec![name_step("a"), index_step(0)];
        assert_eq!(apply(&steps, &v).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_multi_name_step_keeps_object_shape() {
        let v = val(serde_json::json!({"a": 1, "b": 2, "c": 3}));
        let steps = vec![Step::new(
            Indexer::Names(vec![
                NameEntry::Literal("a".into()),
                NameEntry::Literal("c".into()),
            ]),
            false,
        )
        .unwrap()];
        assert_eq!(apply(&steps, &v).unwrap(), val(serde_json::json!({"a": 1, "c": 3})));
    }

    #[test]
    fn test_missing_key_yields_empty_object() {
        let v = val(serde_json::json!({"a": 1}));
        let steps = vec![name_step("b")];
        assert_eq!(apply(&steps, &v).unwrap(), val(serde_json::json!({})));
    }

    #[test]
    fn test_star_over_object_projects_children() {
        let v = val(serde_json::json!({"x": {"n": 1}, "y": {"n": 2}}));
        let steps = vec![Step::new(Indexer::Star, false).unwrap(), name_step("n")];
        assert_eq!(
            apply(&steps, &v).unwrap(),
            val(serde_json::json!({"x": 1, "y": 2}))
        );
    }

    #[test]
    fn test_empty_subresults_are_dropped() {
        let v = val(serde_json::json!({"x": {"n": 1}, "y": {"m": 2}}));
        let steps = vec![Step::new(Indexer::Star, false).unwrap(), name_step("n")];
        assert_eq!(apply(&steps, &v).unwrap(), val(serde_json::json!({"x": 1})));
    }

    #[test]
    fn test_locate_paths() {
        let v = val(serde_json::json!({"a": [10, 20]}));
        let steps = vec![name_step("a"), index_step(1)];
        let paths = locate(&steps, &v).unwrap();
        assert_eq!(
            paths,
            vec![vec![PathSeg::Key("a".into()), PathSeg::Index(1)]]
        );
    }

    #[test]
    fn test_attach_deferred() {
        let steps = vec![name_step("a")];
        let piped = attach(Value::Deferred(Deferred::identity()), steps).unwrap();
        let Value::Deferred(d) = piped else {
            panic!("expected deferred")
        };
        let input = val(serde_json::json!({"a": 5}));
        assert_eq!(d.call(&input).unwrap(), Value::Int(5));
    }
}
