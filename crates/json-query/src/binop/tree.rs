//! Precedence climbing over explicit `(op, left, right)` nodes.
//!
//! The parser feeds the builder one `(operator, preceding operand)` pair at a
//! time. The tree keeps a single open slot on its right spine; a new operator
//! either nests into that slot (it binds tighter than the previous operator)
//! or closes the slot and wraps the tighter-binding suffix of the right spine
//! as its left subtree. Right-associative operators compete with a +0.1
//! precedence bump, so `a ** b ** c` nests to the right.

use crate::binop::{apply, Binop};
use crate::error::Error;
use crate::value::Value;

enum Tree {
    Val(Value),
    Node(Box<Node>),
}

struct Node {
    op: &'static Binop,
    left: Tree,
    right: Option<Tree>,
}

/// Incremental builder for a binop tree.
pub struct TreeBuilder {
    root: Option<Node>,
    prev_prec: f64,
}

impl TreeBuilder {
    pub fn new() -> Self {
        TreeBuilder {
            root: None,
            prev_prec: 0.0,
        }
    }

    /// True when no operator has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Registers `op`, whose left-hand operand is `operand`.
    pub fn push(&mut self, op: &'static Binop, operand: Value) -> Result<(), Error> {
        let eff = op.effective_precedence();
        match self.root.take() {
            None => {
                self.root = Some(Node {
                    op,
                    left: Tree::Val(operand),
                    right: None,
                });
            }
            Some(mut root) => {
                if self.prev_prec >= eff {
                    // The previous operator binds at least as tightly: close
                    // the open slot, then wrap the tighter-binding suffix of
                    // the right spine under the new node.
                    open_slot(&mut root)?.right = Some(Tree::Val(operand));
                    if root.op.precedence >= eff {
                        root = Node {
                            op,
                            left: Tree::Node(Box::new(root)),
                            right: None,
                        };
                    } else {
                        insert_on_spine(&mut root, op, eff)?;
                    }
                } else {
                    // The new operator binds tighter: it competes only for
                    // the pending operand and nests into the open slot.
                    open_slot(&mut root)?.right = Some(Tree::Node(Box::new(Node {
                        op,
                        left: Tree::Val(operand),
                        right: None,
                    })));
                }
                self.root = Some(root);
            }
        }
        self.prev_prec = op.precedence;
        Ok(())
    }

    /// Supplies the final operand, resolves the tree bottom-up with the
    /// vectorization rules and returns the combined value.
    pub fn finish(self, last: Value) -> Result<Value, Error> {
        match self.root {
            None => Ok(last),
            Some(mut root) => {
                open_slot(&mut root)?.right = Some(Tree::Val(last));
                resolve_node(&root)
            }
        }
    }
}

/// Walks the right spine down to the unique node whose right slot is open.
fn open_slot(node: &mut Node) -> Result<&mut Node, Error> {
    if node.right.is_none() {
        return Ok(node);
    }
    match node.right.as_mut() {
        Some(Tree::Node(child)) => open_slot(child),
        _ => Err(Error::UnexpectedToken("operator expected".into())),
    }
}

/// Inserts `op` on the right spine of a closed tree so that every suffix
/// binding at least as tightly as `eff` becomes its left subtree. The caller
/// has already ruled out wrapping at `node` itself.
fn insert_on_spine(node: &mut Node, op: &'static Binop, eff: f64) -> Result<(), Error> {
    let descend = matches!(&node.right, Some(Tree::Node(child)) if child.op.precedence < eff);
    if descend {
        if let Some(Tree::Node(child)) = node.right.as_mut() {
            return insert_on_spine(child, op, eff);
        }
    }
    let taken = node
        .right
        .take()
        .ok_or_else(|| Error::UnexpectedToken("operand expected".into()))?;
    node.right = Some(Tree::Node(Box::new(Node {
        op,
        left: taken,
        right: None,
    })));
    Ok(())
}

fn resolve_tree(tree: &Tree) -> Result<Value, Error> {
    match tree {
        Tree::Val(v) => Ok(v.clone()),
        Tree::Node(node) => resolve_node(node),
    }
}

fn resolve_node(node: &Node) -> Result<Value, Error> {
    let left = resolve_tree(&node.left)?;
    let right = match &node.right {
        Some(t) => resolve_tree(t)?,
        None => return Err(Error::UnexpectedEnd),
    };
    apply(node.op, &left, &right)
}
