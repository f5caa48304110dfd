//! Recursive descent over the token stream.
//!
//! The entry points are free functions over a shared [`Cursor`], mutually
//! recursive the way the grammar is: an expression may contain a function
//! call, the call's arguments are expressions, an indexer may contain an
//! expression and an expression atom may carry an indexer chain. Parsing
//! compiles directly to a [`Value`]: concrete where possible, deferred
//! whenever the current-input sigil is involved.

use crate::binop::{self, negate, TreeBuilder};
use crate::error::Error;
use crate::functions::{self, FnDef};
use crate::indexer::{
    pipeline, Indexer, NameEntry, Projection, SliceEntry, Step,
};
use crate::lexer::Token;
use crate::value::{Slice, Ty, Value};

/// Shared parse position over a token slice.
pub struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_delim(&self, d: char) -> bool {
        matches!(self.peek(), Some(Token::Delim(c)) if *c == d)
    }

    fn eat_delim(&mut self, d: char) -> bool {
        if self.at_delim(d) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_delim(&mut self, d: char) -> Result<(), Error> {
        if self.eat_delim(d) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> Error {
        match self.peek() {
            Some(tok) => Error::UnexpectedToken(tok.to_string()),
            None => Error::UnexpectedEnd,
        }
    }
}

/// Compiles a full token stream to a single value; all tokens must be
/// consumed.
pub fn parse_tokens(tokens: &[Token]) -> Result<Value, Error> {
    let mut cursor = Cursor::new(tokens);
    let value = parse_expr_or_scalar_func(&mut cursor)?;
    if !cursor.done() {
        return Err(cursor.unexpected());
    }
    Ok(value)
}

/// Re-reads a token stream as a pure address: the current-input sigil
/// followed only by indexers. Returns `None` for anything else.
pub fn parse_address(tokens: &[Token]) -> Option<Vec<Step>> {
    let mut cursor = Cursor::new(tokens);
    match cursor.bump() {
        Some(Token::Lit(Value::Deferred(_))) => {}
        _ => return None,
    }
    let mut steps = Vec::new();
    while !cursor.done() {
        steps.push(parse_indexer(&mut cursor).ok()?);
    }
    Some(steps)
}

/// True when `tok` ends an expression: a closing/separator delimiter or the
/// end of the stream.
fn is_terminator(tok: Option<&Token>) -> bool {
    matches!(
        tok,
        None | Some(Token::Delim(']' | ':' | '}' | ',' | ')'))
    )
}

// ------------------------------------------------------------- Expressions

/// Parses a full expression: atoms and binary operators up to the next
/// terminator, resolved through the precedence tree.
pub fn parse_expr_or_scalar_func(cursor: &mut Cursor<'_>) -> Result<Value, Error> {
    // Fast path: a single token directly before a terminator.
    if is_terminator(cursor.peek_at(1)) {
        match cursor.peek() {
            Some(Token::Lit(v)) => {
                let v = v.clone();
                cursor.bump();
                return Ok(v);
            }
            Some(Token::Name(n)) => {
                let v = Value::Str(n.clone());
                cursor.bump();
                return Ok(v);
            }
            _ => {}
        }
    }

    let mut tree = TreeBuilder::new();
    let mut negated = false;
    loop {
        // A minus where an atom is expected is unary; it toggles.
        while let Some(Token::Op(op)) = cursor.peek() {
            if op.name != "-" {
                break;
            }
            cursor.bump();
            negated = !negated;
        }
        let mut atom = parse_expr_or_scalar(cursor)?;
        let before_pow =
            matches!(cursor.peek(), Some(Token::Op(op)) if op.name == "**");
        if negated && !before_pow {
            atom = negate(&atom)?;
            negated = false;
        }
        if is_terminator(cursor.peek()) {
            return tree.finish(atom);
        }
        match cursor.bump() {
            Some(Token::Op(op)) => {
                if negated && op.name == "**" {
                    // `-x ** y` fuses into a single operator so the minus
                    // applies to the power, not the base.
                    negated = false;
                    tree.push(binop::negpow(), atom)?;
                } else {
                    tree.push(*op, atom)?;
                }
            }
            Some(tok) => return Err(Error::UnexpectedToken(tok.to_string())),
            None => return Err(Error::UnexpectedEnd),
        }
    }
}

/// Parses one atom — parenthesized expression, function call, literal or
/// unquoted name — plus its indexer chain.
pub fn parse_expr_or_scalar(cursor: &mut Cursor<'_>) -> Result<Value, Error> {
    let atom = match cursor.bump() {
        Some(Token::Delim('(')) => {
            let inner = parse_expr_or_scalar_func(cursor)?;
            cursor.expect_delim(')')?;
            inner
        }
        Some(Token::Name(name)) => {
            if cursor.at_delim('(') {
                let def = functions::registry()
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| Error::UnknownFunction(name.clone()))?;
                parse_arg_function(cursor, def)?
            } else {
                Value::Str(name.clone())
            }
        }
        Some(Token::Lit(v)) => v.clone(),
        Some(tok) => return Err(Error::UnexpectedToken(tok.to_string())),
        None => return Err(Error::UnexpectedEnd),
    };

    // Indexer chain: only containers (or values of unknown shape) can be
    // indexed, so anything else leaves the starter for the caller.
    if !(atom.ty().is_iterable() || atom.ty() == Ty::UNKNOWN) {
        return Ok(atom);
    }
    let mut steps = Vec::new();
    while matches!(cursor.peek(), Some(Token::Delim('.' | '[' | '{'))) {
        steps.push(parse_indexer(cursor)?);
    }
    pipeline::attach(atom, steps)
}

// ---------------------------------------------------------------- Indexers

/// Parses one indexer, dispatching on the opening delimiter. A doubled dot
/// marks the indexer recursive and may swallow the `[` that follows.
pub fn parse_indexer(cursor: &mut Cursor<'_>) -> Result<Step, Error> {
    match cursor.bump() {
        Some(Token::Delim('.')) => {
            let mut recursive = false;
            if cursor.eat_delim('.') {
                recursive = true;
                if cursor.eat_delim('[') {
                    return parse_bracket(cursor, recursive);
                }
            }
            let indexer = match cursor.bump() {
                Some(Token::Name(n)) => {
                    Indexer::Names(vec![NameEntry::Literal(n.clone())])
                }
                Some(Token::Lit(Value::Str(s))) => {
                    Indexer::Names(vec![NameEntry::Literal(s.clone())])
                }
                Some(Token::Lit(Value::Regex(re))) => {
                    Indexer::Names(vec![NameEntry::Pattern(re.clone())])
                }
                Some(Token::Op(op)) if op.name == "*" => Indexer::Star,
                Some(tok) => return Err(Error::BadDotIndexer(tok.to_string())),
                None => return Err(Error::UnexpectedEnd),
            };
            Step::new(indexer, recursive)
        }
        Some(Token::Delim('[')) => parse_bracket(cursor, false),
        Some(Token::Delim('{')) => parse_projection(cursor),
        Some(tok) => Err(Error::UnexpectedToken(tok.to_string())),
        None => Err(Error::UnexpectedEnd),
    }
}

/// What a bracket entry turned out to be.
enum Entry {
    Name(NameEntry),
    Index(SliceEntry),
    Mask(Value),
}

/// Parses the body of a `[…]` indexer. The first entry decides between a
/// name list, a slice list and a boolean filter; later entries of another
/// kind are rejected.
fn parse_bracket(cursor: &mut Cursor<'_>, recursive: bool) -> Result<Step, Error> {
    // `[*]` selects all children.
    if matches!(cursor.peek(), Some(Token::Op(op)) if op.name == "*")
        && matches!(cursor.peek_at(1), Some(Token::Delim(']')))
    {
        cursor.bump();
        cursor.bump();
        return Step::new(Indexer::Star, recursive);
    }

    let mut names: Vec<NameEntry> = Vec::new();
    let mut indices: Vec<SliceEntry> = Vec::new();
    let mut mask: Option<Value> = None;
    loop {
        let entry = parse_bracket_entry(cursor)?;
        match entry {
            Entry::Name(n) if indices.is_empty() && mask.is_none() => names.push(n),
            Entry::Index(s) if names.is_empty() && mask.is_none() => indices.push(s),
            Entry::Mask(m)
                if names.is_empty() && indices.is_empty() && mask.is_none() =>
            {
                mask = Some(m)
            }
            _ => return Err(Error::MixedBracket),
        }
        match cursor.bump() {
            Some(Token::Delim(',')) => continue,
            Some(Token::Delim(']')) => break,
            Some(tok) => return Err(Error::UnexpectedToken(tok.to_string())),
            None => return Err(Error::Unterminated('[')),
        }
    }
    let indexer = if let Some(m) = mask {
        Indexer::Filter(m)
    } else if !names.is_empty() {
        Indexer::Names(names)
    } else {
        Indexer::Slices(indices)
    };
    Step::new(indexer, recursive)
}

fn parse_bracket_entry(cursor: &mut Cursor<'_>) -> Result<Entry, Error> {
    // A leading colon is a slice with an omitted start.
    if cursor.at_delim(':') {
        return Ok(Entry::Index(parse_slicer(cursor, None)?));
    }
    let value = parse_expr_or_scalar_func(cursor)?;
    if cursor.at_delim(':') {
        let start = value.as_i64().ok_or_else(|| {
            Error::Type(format!(
                "slice bounds must be ints, got {}",
                value.type_name()
            ))
        })?;
        return Ok(Entry::Index(parse_slicer(cursor, Some(start))?));
    }
    Ok(match value {
        Value::Str(s) => Entry::Name(NameEntry::Literal(s)),
        Value::Regex(re) => Entry::Name(NameEntry::Pattern(re)),
        Value::Int(i) => Entry::Index(SliceEntry::Index(i)),
        Value::Slice(s) => Entry::Index(SliceEntry::Range(s)),
        other => Entry::Mask(other),
    })
}

/// Consumes up to two `:` separators, completing a slice whose start (if
/// any) the caller already parsed.
pub fn parse_slicer(
    cursor: &mut Cursor<'_>,
    start: Option<i64>,
) -> Result<SliceEntry, Error> {
    let mut parts = [start, None, None];
    let mut at = 0;
    while cursor.at_delim(':') && at < 2 {
        cursor.bump();
        at += 1;
        parts[at] = parse_slice_bound(cursor)?;
    }
    Ok(SliceEntry::Range(Slice::new(parts[0], parts[1], parts[2])))
}

/// An optional signed integer bound; anything else means "omitted".
fn parse_slice_bound(cursor: &mut Cursor<'_>) -> Result<Option<i64>, Error> {
    let negative = matches!(cursor.peek(), Some(Token::Op(op)) if op.name == "-")
        && matches!(cursor.peek_at(1), Some(Token::Lit(Value::Int(_))));
    if negative {
        cursor.bump();
    }
    match cursor.peek() {
        Some(Token::Lit(Value::Int(n))) => {
            let n = *n;
            cursor.bump();
            Ok(Some(if negative { -n } else { n }))
        }
        _ if negative => Err(cursor.unexpected()),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------- Calls

/// Parses `(arg, …)` for a known function: arity and per-argument masks are
/// checked, optional tail arguments are padded, and the call is applied
/// (deferring itself when any argument is deferred).
pub fn parse_arg_function(
    cursor: &mut Cursor<'_>,
    def: &'static FnDef,
) -> Result<Value, Error> {
    cursor.expect_delim('(')?;
    let mut args = Vec::new();
    if !cursor.eat_delim(')') {
        loop {
            args.push(parse_expr_or_scalar_func(cursor)?);
            match cursor.bump() {
                Some(Token::Delim(',')) => continue,
                Some(Token::Delim(')')) => break,
                Some(tok) => return Err(Error::UnexpectedToken(tok.to_string())),
                None => return Err(Error::Unterminated('(')),
            }
        }
    }
    functions::validate(def, &args)?;
    functions::pad(def, &mut args);
    functions::call(def, args)
}

// -------------------------------------------------------------- Projection

/// Parses `{expr, …}` (array projection) or `{"k": expr, …}` (object
/// projection). The two forms cannot mix. Deferred children stay deferred
/// and resolve against the value the projection runs on.
pub fn parse_projection(cursor: &mut Cursor<'_>) -> Result<Step, Error> {
    let mut keyed: Vec<(String, Value)> = Vec::new();
    let mut bare: Vec<Value> = Vec::new();
    if !cursor.eat_delim('}') {
        loop {
            let key = projection_key(cursor);
            match key {
                Some(k) => {
                    if !bare.is_empty() {
                        return Err(Error::MixedProjection);
                    }
                    let value = parse_expr_or_scalar_func(cursor)?;
                    keyed.push((k, value));
                }
                None => {
                    if !keyed.is_empty() {
                        return Err(Error::MixedProjection);
                    }
                    bare.push(parse_expr_or_scalar_func(cursor)?);
                }
            }
            match cursor.bump() {
                Some(Token::Delim(',')) => continue,
                Some(Token::Delim('}')) => break,
                Some(tok) => return Err(Error::UnexpectedToken(tok.to_string())),
                None => return Err(Error::Unterminated('{')),
            }
        }
    }
    let projection = if keyed.is_empty() {
        Projection::Array(bare)
    } else {
        Projection::Object(keyed)
    };
    Step::new(Indexer::Projection(projection), false)
}

/// Consumes `name:` / `"key":` if present and returns the key.
fn projection_key(cursor: &mut Cursor<'_>) -> Option<String> {
    let key = match cursor.peek() {
        Some(Token::Name(n)) => n.clone(),
        Some(Token::Lit(Value::Str(s))) => s.clone(),
        _ => return None,
    };
    if matches!(cursor.peek_at(1), Some(Token::Delim(':'))) {
        cursor.bump();
        cursor.bump();
        Some(key)
    } else {
        None
    }
}
