//! Compiled queries: selection and mutation against `serde_json` inputs.

use crate::error::Error;
use crate::indexer::{pipeline, PathSeg, Step};
use crate::lexer;
use crate::parser;
use crate::value::Value;

/// A compiled query: a selector, and optionally a mutator that overwrites
/// the selected nodes.
///
/// Compiled queries are pure and re-entrant; the same `Query` may be
/// evaluated against many inputs, from several threads.
#[derive(Debug)]
pub struct Query {
    selector: Value,
    /// The selector as raw indexer steps, kept when a mutator needs to
    /// address the selected nodes inside the input.
    address: Option<Vec<Step>>,
    mutator: Option<Value>,
}

/// Compiles a query string.
pub fn compile(source: &str) -> Result<Query, Error> {
    let stream = lexer::lex(source)?;
    let selector = parser::parse_tokens(&stream.selector)?;
    let mutator = stream
        .mutator
        .as_deref()
        .map(parser::parse_tokens)
        .transpose()?;
    let address = if mutator.is_some() {
        let steps = parser::parse_address(&stream.selector).ok_or_else(|| {
            Error::InvalidMutation(
                "selector must be the current-input sigil followed by indexers".into(),
            )
        })?;
        Some(steps)
    } else {
        None
    };
    Ok(Query {
        selector,
        address,
        mutator,
    })
}

impl Query {
    /// Evaluates the query: the selection result, or — when the query has a
    /// mutator — a mutated copy of the input.
    pub fn eval(&self, input: &serde_json::Value) -> Result<serde_json::Value, Error> {
        if self.mutator.is_some() {
            self.mutate(input)
        } else {
            self.select(input)
        }
    }

    /// Evaluates the selector only.
    pub fn select(&self, input: &serde_json::Value) -> Result<serde_json::Value, Error> {
        let root = Value::from(input);
        self.selector.resolve(&root)?.into_json()
    }

    /// Applies the mutator: every node the selector addresses is replaced
    /// with the mutator evaluated against that node.
    fn mutate(&self, input: &serde_json::Value) -> Result<serde_json::Value, Error> {
        let steps = self.address.as_deref().unwrap_or_default();
        let mutator = match &self.mutator {
            Some(m) => m,
            None => return self.select(input),
        };
        let mut root = Value::from(input);
        let paths = pipeline::locate(steps, &root)?;
        for path in &paths {
            let target = follow_path(&mut root, path).ok_or_else(|| {
                Error::InvalidMutation("selected node is not addressable".into())
            })?;
            let current = target.clone();
            *target = mutator.resolve(&current)?;
        }
        root.into_json()
    }
}

/// Walks a located path down an owned tree.
fn follow_path<'v>(root: &'v mut Value, path: &[PathSeg]) -> Option<&'v mut Value> {
    let mut node = root;
    for seg in path {
        node = match (seg, node) {
            (PathSeg::Key(k), Value::Object(obj)) => obj.get_mut(k.as_str())?,
            (PathSeg::Index(i), Value::Array(arr)) => arr.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(node)
}
