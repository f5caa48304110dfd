//! Indexers: the constructs that select sub-values out of a container.
//!
//! An indexer evaluates against one JSON value and yields a lazy sequence of
//! [`Element`]s. Five variants exist: name lists (object keys, literal or
//! regex), slice lists (array positions and ranges), the star, boolean
//! filters and projections. A [`Step`] pairs an indexer with the shape flags
//! the pipeline needs.

pub mod pipeline;

use crate::error::Error;
use crate::value::{Slice, Value};
use regex::Regex;
use std::collections::HashSet;

/// One entry of a name list.
#[derive(Debug, Clone)]
pub enum NameEntry {
    Literal(String),
    Pattern(Regex),
}

impl NameEntry {
    fn matches(&self, key: &str) -> bool {
        match self {
            NameEntry::Literal(s) => s == key,
            NameEntry::Pattern(re) => re.is_match(key),
        }
    }
}

/// One entry of a slice list.
#[derive(Debug, Clone)]
pub enum SliceEntry {
    Index(i64),
    Range(Slice),
}

/// A projection synthesizes a fresh container from expressions over the
/// current value. Children are usually deferred and resolve against the
/// value the projection is applied to.
#[derive(Debug, Clone)]
pub enum Projection {
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

/// The indexer algebra.
#[derive(Debug, Clone)]
pub enum Indexer {
    Names(Vec<NameEntry>),
    Slices(Vec<SliceEntry>),
    Star,
    Filter(Value),
    Projection(Projection),
}

impl Indexer {
    fn kind_name(&self) -> &'static str {
        match self {
            Indexer::Names(_) => "names",
            Indexer::Slices(_) => "indices",
            Indexer::Star => "star",
            Indexer::Filter(_) => "filters",
            Indexer::Projection(_) => "projections",
        }
    }
}

/// One segment of a path from the evaluation root to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSeg {
    Key(String),
    Index(usize),
}

/// What an indexer yields per match.
///
/// `Pair` elements are dict-shaped; everything else is array-shaped. The
/// source position travels along so the mutator can reconstruct addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// An object member.
    Pair(String, Value),
    /// An array element and its position.
    Item(usize, Value),
    /// A node found by a recursive indexer, with its path from the value
    /// the indexer ran against.
    Deep(Vec<PathSeg>, Value),
    /// A synthesized projection member with no addressable origin.
    Fresh(Value),
}

impl Element {
    pub fn is_pair(&self) -> bool {
        matches!(self, Element::Pair(_, _))
    }

    pub fn into_value(self) -> Value {
        match self {
            Element::Pair(_, v) | Element::Item(_, v) | Element::Deep(_, v) | Element::Fresh(v) => v,
        }
    }

    pub fn value(&self) -> &Value {
        match self {
            Element::Pair(_, v) | Element::Item(_, v) | Element::Deep(_, v) | Element::Fresh(v) => v,
        }
    }
}

/// A compiled indexer plus its shape classification.
#[derive(Debug, Clone)]
pub struct Step {
    pub indexer: Indexer,
    /// The indexer selects at most one element, so the pipeline unwraps the
    /// result to a scalar instead of materializing a container.
    pub single: bool,
    pub projection: bool,
    /// Shape of an *empty* result: object when set, array otherwise.
    pub dict: bool,
    pub recursive: bool,
}

impl Step {
    /// Classifies an indexer. Recursive search is defined for name lists and
    /// the star only.
    pub fn new(indexer: Indexer, recursive: bool) -> Result<Step, Error> {
        if recursive
            && !matches!(indexer, Indexer::Names(_) | Indexer::Star)
        {
            return Err(Error::RecursiveKind(indexer.kind_name()));
        }
        let single = match &indexer {
            Indexer::Names(entries) => {
                !recursive && entries.len() == 1 && matches!(entries[0], NameEntry::Literal(_))
            }
            Indexer::Slices(entries) => {
                entries.len() == 1 && matches!(entries[0], SliceEntry::Index(_))
            }
            _ => false,
        };
        let dict = match &indexer {
            Indexer::Names(_) => !recursive,
            Indexer::Projection(p) => matches!(p, Projection::Object(_)),
            _ => false,
        };
        let projection = matches!(indexer, Indexer::Projection(_));
        Ok(Step {
            indexer,
            single,
            projection,
            dict,
            recursive,
        })
    }

    /// Runs the indexer over `value`, yielding its element sequence.
    ///
    /// Name, slice and star sequences are lazy; recursive walks, filters and
    /// projections materialize at this step boundary because their traversal
    /// must complete before the shape of the result is known.
    pub fn eval<'v>(
        &'v self,
        value: &'v Value,
    ) -> Result<Box<dyn Iterator<Item = Result<Element, Error>> + 'v>, Error> {
        match &self.indexer {
            Indexer::Names(entries) if self.recursive => {
                Ok(boxed(eval_names_recursive(entries, value)))
            }
            Indexer::Names(entries) => eval_names(entries, value),
            Indexer::Slices(entries) => eval_slices(entries, value),
            Indexer::Star if self.recursive => Ok(boxed(eval_star_recursive(value))),
            Indexer::Star => eval_star(value),
            Indexer::Filter(mask) => Ok(boxed(eval_filter(mask, value)?)),
            Indexer::Projection(proj) => Ok(boxed(eval_projection(proj, value)?)),
        }
    }
}

fn boxed<'v>(
    elems: Vec<Element>,
) -> Box<dyn Iterator<Item = Result<Element, Error>> + 'v> {
    Box::new(elems.into_iter().map(Ok))
}

// ------------------------------------------------------------------- Names

fn eval_names<'v>(
    entries: &'v [NameEntry],
    value: &'v Value,
) -> Result<Box<dyn Iterator<Item = Result<Element, Error>> + 'v>, Error> {
    let obj = value.as_object().ok_or_else(|| Error::Type(format!(
        "name indexer expects an object, got {}",
        value.type_name()
    )))?;
    Ok(Box::new(entries.iter().flat_map(move |entry| {
        let found: Vec<Element> = match entry {
            NameEntry::Literal(name) => obj
                .get_key_value(name.as_str())
                .map(|(k, v)| Element::Pair(k.clone(), v.clone()))
                .into_iter()
                .collect(),
            NameEntry::Pattern(re) => obj
                .iter()
                .filter(|(k, _)| re.is_match(k))
                .map(|(k, v)| Element::Pair(k.clone(), v.clone()))
                .collect(),
        };
        found.into_iter().map(Ok)
    })))
}

/// Depth-first search for matching keys anywhere below `value`.
///
/// Per list entry, containers are walked in document order. A matching key is
/// emitted (once per physical node, tracked by its path) and not descended
/// into; non-matching members are searched recursively. Arrays are traversed
/// transparently.
fn eval_names_recursive(entries: &[NameEntry], value: &Value) -> Vec<Element> {
    let mut out = Vec::new();
    let mut visited: HashSet<Vec<PathSeg>> = HashSet::new();
    let mut path = Vec::new();
    for entry in entries {
        walk_names(entry, value, &mut path, &mut visited, &mut out);
    }
    out
}

fn walk_names(
    entry: &NameEntry,
    value: &Value,
    path: &mut Vec<PathSeg>,
    visited: &mut HashSet<Vec<PathSeg>>,
    out: &mut Vec<Element>,
) {
    match value {
        Value::Object(obj) => {
            for (k, v) in obj {
                if entry.matches(k) {
                    path.push(PathSeg::Key(k.clone()));
                    if visited.insert(path.clone()) {
                        out.push(Element::Deep(path.clone(), v.clone()));
                    }
                    path.pop();
                } else {
                    path.push(PathSeg::Key(k.clone()));
                    walk_names(entry, v, path, visited, out);
                    path.pop();
                }
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                path.push(PathSeg::Index(i));
                walk_names(entry, v, path, visited, out);
                path.pop();
            }
        }
        _ => {}
    }
}

// ------------------------------------------------------------------ Slices

fn eval_slices<'v>(
    entries: &'v [SliceEntry],
    value: &'v Value,
) -> Result<Box<dyn Iterator<Item = Result<Element, Error>> + 'v>, Error> {
    let arr = value.as_array().ok_or_else(|| Error::Type(format!(
        "index indexer expects an array, got {}",
        value.type_name()
    )))?;
    Ok(Box::new(entries.iter().flat_map(move |entry| {
        let picked: Vec<usize> = match entry {
            // Out-of-range integer entries are skipped, not errors.
            SliceEntry::Index(i) => normalize_index(*i, arr.len()).into_iter().collect(),
            SliceEntry::Range(slice) => slice.indices(arr.len()),
        };
        picked
            .into_iter()
            .map(move |i| Ok(Element::Item(i, arr[i].clone())))
    })))
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if i < 0 { i + len } else { i };
    (0..len).contains(&i).then_some(i as usize)
}

// -------------------------------------------------------------------- Star

fn eval_star<'v>(
    value: &'v Value,
) -> Result<Box<dyn Iterator<Item = Result<Element, Error>> + 'v>, Error> {
    match value {
        Value::Object(obj) => Ok(Box::new(
            obj.iter()
                .map(|(k, v)| Ok(Element::Pair(k.clone(), v.clone()))),
        )),
        Value::Array(arr) => Ok(Box::new(
            arr.iter()
                .enumerate()
                .map(|(i, v)| Ok(Element::Item(i, v.clone()))),
        )),
        other => Err(Error::Cast {
            expected: "a container",
            found: other.type_name(),
        }),
    }
}

/// All scalar leaves below `value` in document order. Interior containers
/// are traversed but not emitted.
fn eval_star_recursive(value: &Value) -> Vec<Element> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    walk_leaves(value, &mut path, &mut out);
    out
}

fn walk_leaves(value: &Value, path: &mut Vec<PathSeg>, out: &mut Vec<Element>) {
    match value {
        Value::Object(obj) => {
            for (k, v) in obj {
                path.push(PathSeg::Key(k.clone()));
                walk_leaves(v, path, out);
                path.pop();
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                path.push(PathSeg::Index(i));
                walk_leaves(v, path, out);
                path.pop();
            }
        }
        leaf => out.push(Element::Deep(path.clone(), leaf.clone())),
    }
}

// ------------------------------------------------------------------ Filter

/// Boolean indexing. The mask is resolved against the container first; a
/// scalar bool keeps everything or nothing, a container mask must match the
/// data's shape exactly and selects aligned elements.
fn eval_filter(mask: &Value, value: &Value) -> Result<Vec<Element>, Error> {
    let mask = mask.resolve(value)?;
    match (&mask, value) {
        (Value::Bool(keep), Value::Object(obj)) => Ok(if *keep {
            obj.iter()
                .map(|(k, v)| Element::Pair(k.clone(), v.clone()))
                .collect()
        } else {
            Vec::new()
        }),
        (Value::Bool(keep), Value::Array(arr)) => Ok(if *keep {
            arr.iter()
                .enumerate()
                .map(|(i, v)| Element::Item(i, v.clone()))
                .collect()
        } else {
            Vec::new()
        }),
        (Value::Bool(_), other) => Err(Error::Cast {
            expected: "a container",
            found: other.type_name(),
        }),
        (Value::Object(m), Value::Object(obj)) => {
            if m.len() != obj.len() {
                return Err(Error::length_mismatch(m.len(), obj.len()));
            }
            let mut out = Vec::new();
            for (k, v) in obj {
                let keep = m.get(k).ok_or_else(|| {
                    Error::VectorizedArithmetic(format!("boolean index is missing key {k:?}"))
                })?;
                if mask_bool(keep)? {
                    out.push(Element::Pair(k.clone(), v.clone()));
                }
            }
            Ok(out)
        }
        (Value::Array(m), Value::Array(arr)) => {
            if m.len() != arr.len() {
                return Err(Error::length_mismatch(m.len(), arr.len()));
            }
            let mut out = Vec::new();
            for (i, (keep, v)) in m.iter().zip(arr).enumerate() {
                if mask_bool(keep)? {
                    out.push(Element::Item(i, v.clone()));
                }
            }
            Ok(out)
        }
        (Value::Object(_) | Value::Array(_), _) => Err(Error::VectorizedArithmetic(
            "boolean index shape does not match its target".into(),
        )),
        (other, _) => Err(Error::VectorizedArithmetic(format!(
            "boolean index must contain bools, got {}",
            other.type_name()
        ))),
    }
}

fn mask_bool(v: &Value) -> Result<bool, Error> {
    v.as_bool().ok_or_else(|| {
        Error::VectorizedArithmetic(format!(
            "boolean index must contain bools, got {}",
            v.type_name()
        ))
    })
}

// -------------------------------------------------------------- Projection

fn eval_projection(proj: &Projection, value: &Value) -> Result<Vec<Element>, Error> {
    match proj {
        Projection::Array(exprs) => exprs
            .iter()
            .map(|e| Ok(Element::Fresh(e.resolve(value)?)))
            .collect(),
        Projection::Object(pairs) => pairs
            .iter()
            .map(|(k, e)| Ok(Element::Pair(k.clone(), e.resolve(value)?)))
            .collect(),
    }
}
