//! Query engine for JSON trees.
//!
//! A query is compiled to an executable form and evaluated against a JSON
//! input, producing either a derived value (projection / filter result) or a
//! mutated copy of the input. The language combines indexers (`.key`,
//! `[0]`, `[a:b:c]`, `[*]`, `..key`, boolean masks), projections
//! (`{expr, …}` / `{k: expr, …}`), vectorized binary operators and a library
//! of argument functions; `@` denotes the value currently being queried.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//!
//! let store = json!({
//!     "books": [
//!         {"title": "Sayings of the Century", "price": 9},
//!         {"title": "Sword of Honour", "price": 13}
//!     ]
//! });
//!
//! // Titles of books under 10: the mask vectorizes `< 10` over the prices.
//! let q = json_query::compile("@.books[@[*].price < 10].title").unwrap();
//! assert_eq!(q.eval(&store).unwrap(), json!(["Sayings of the Century"]));
//!
//! // Vectorized arithmetic over a whole column.
//! let total = json_query::eval("sum(@.books[*].price)", &store).unwrap();
//! assert_eq!(total, json!(22));
//! ```

pub mod binop;
pub mod error;
pub mod functions;
pub mod indexer;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod value;

pub use error::Error;
pub use lexer::{lex, Token, TokenStream};
pub use query::{compile, Query};
pub use value::{Deferred, Slice, Ty, Value};

/// One-shot helper: compile and evaluate in a single call.
pub fn eval(
    source: &str,
    input: &serde_json::Value,
) -> Result<serde_json::Value, Error> {
    compile(source)?.eval(input)
}
