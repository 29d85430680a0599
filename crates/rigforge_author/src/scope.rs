// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scope frames: the authoring state for one in-progress function.

use crate::comments::CommentBoxTracker;
use crate::error::{AuthorError, Result};
use crate::layout::LayoutState;
use crate::variables::Variable;
use indexmap::IndexMap;
use rigforge_graph::{NodeId, PinPath, PinType, Point};
use serde::{Deserialize, Serialize};

/// One declared function input or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinDecl {
    /// Pin name
    pub name: String,
    /// Element type
    pub pin_type: PinType,
    /// Whether the pin is an array of `pin_type`
    pub is_array: bool,
}

/// Declared shape of a function under construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Whether the function bears control flow
    pub mutable: bool,
    /// Ordered inputs
    pub inputs: Vec<PinDecl>,
    /// Ordered outputs
    pub outputs: Vec<PinDecl>,
}

impl FunctionSignature {
    /// A new immutable (pure) signature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mutable: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Mark the function as control-flow-bearing.
    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    /// Append an input pin.
    pub fn input(mut self, name: impl Into<String>, pin_type: PinType) -> Self {
        self.inputs.push(PinDecl {
            name: name.into(),
            pin_type,
            is_array: false,
        });
        self
    }

    /// Append an array input pin.
    pub fn input_array(mut self, name: impl Into<String>, pin_type: PinType) -> Self {
        self.inputs.push(PinDecl {
            name: name.into(),
            pin_type,
            is_array: true,
        });
        self
    }

    /// Append an output pin.
    pub fn output(mut self, name: impl Into<String>, pin_type: PinType) -> Self {
        self.outputs.push(PinDecl {
            name: name.into(),
            pin_type,
            is_array: false,
        });
        self
    }

    /// Append an array output pin.
    pub fn output_array(mut self, name: impl Into<String>, pin_type: PinType) -> Self {
        self.outputs.push(PinDecl {
            name: name.into(),
            pin_type,
            is_array: true,
        });
        self
    }

    /// Look up a declared input by name.
    pub fn find_input(&self, name: &str) -> Option<&PinDecl> {
        self.inputs.iter().find(|decl| decl.name == name)
    }
}

/// What kind of construct pushed an execution cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// The function's own entry chain
    Root,
    /// One case of a branch
    BranchCase,
    /// The body of a loop (a child execute pin, not a sibling)
    LoopBody,
    /// One plug of a fan-out node
    SequencePlug,
}

/// One entry on the execution-cursor stack: where the next control-flow
/// node attaches.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionCursor {
    /// The pin the next mutable node links from
    pub pin: PinPath,
    /// The construct that created this cursor
    pub kind: CursorKind,
}

/// Fan-out bookkeeping for an open sequence node.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutState {
    /// The sequence node
    pub node: NodeId,
    /// How many plugs have been requested
    pub plug_index: usize,
    /// Name of the most recent plug, if any
    pub last_plug: Option<String>,
    /// Column origin X that every branch starts from
    pub column_x: f32,
    /// Cursor-stack depth when the fan-out opened; plugs may only be
    /// requested at this depth
    pub depth: usize,
}

/// Authoring state for one function definition in progress.
#[derive(Debug)]
pub struct ScopeFrame {
    /// Backend handle for the function
    pub function: NodeId,
    /// Declared signature
    pub signature: FunctionSignature,
    /// Open fan-out construct, if any
    pub fan_out: Option<FanOutState>,
    /// Layout state for this frame
    pub layout: LayoutState,
    /// Comment boxes open in this frame
    pub comments: CommentBoxTracker,
    cursors: Vec<ExecutionCursor>,
    locals: IndexMap<String, Variable>,
}

impl ScopeFrame {
    /// New frame for `function`. Mutable frames are seeded with the root
    /// cursor at the function's entry execute pin.
    pub fn new(function: NodeId, signature: FunctionSignature) -> Self {
        let mut cursors = Vec::new();
        if signature.mutable {
            cursors.push(ExecutionCursor {
                pin: PinPath::root(function, "Entry").child("ExecuteContext"),
                kind: CursorKind::Root,
            });
        }
        Self {
            function,
            signature,
            fan_out: None,
            layout: LayoutState::new(Point::ZERO),
            comments: CommentBoxTracker::new(),
            cursors,
            locals: IndexMap::new(),
        }
    }

    /// The cursor the next mutable node attaches to.
    pub fn active_cursor(&self) -> Result<&ExecutionCursor> {
        self.cursors.last().ok_or_else(|| {
            AuthorError::ScopeViolation(format!(
                "function '{}' has no active execution cursor",
                self.signature.name
            ))
        })
    }

    /// Replace the active cursor's pin, keeping its kind. This is how a
    /// linear node advances the chain.
    pub fn advance_cursor(&mut self, pin: PinPath) -> Result<()> {
        let name = self.signature.name.clone();
        let cursor = self.cursors.last_mut().ok_or_else(|| {
            AuthorError::ScopeViolation(format!(
                "function '{name}' has no active execution cursor"
            ))
        })?;
        cursor.pin = pin;
        Ok(())
    }

    /// Push a cursor for a branch case or loop body.
    pub fn push_cursor(&mut self, pin: PinPath, kind: CursorKind) {
        self.cursors.push(ExecutionCursor { pin, kind });
    }

    /// Replace the active cursor entirely. Fan-out plugs re-point the
    /// slot their sequence node consumed.
    pub fn replace_cursor(&mut self, pin: PinPath, kind: CursorKind) -> Result<()> {
        let name = self.signature.name.clone();
        let cursor = self.cursors.last_mut().ok_or_else(|| {
            AuthorError::ScopeViolation(format!(
                "function '{name}' has no active execution cursor"
            ))
        })?;
        *cursor = ExecutionCursor { pin, kind };
        Ok(())
    }

    /// Pop the active cursor. The root cursor never pops; trying to is a
    /// construct imbalance.
    pub fn pop_cursor(&mut self) -> Result<ExecutionCursor> {
        let cursor = self.cursors.pop().ok_or_else(|| {
            AuthorError::ScopeViolation(format!(
                "function '{}' has no cursor to pop",
                self.signature.name
            ))
        })?;
        if cursor.kind == CursorKind::Root {
            self.cursors.push(cursor);
            return Err(AuthorError::ScopeViolation(format!(
                "unbalanced construct in function '{}': cannot pop the root cursor",
                self.signature.name
            )));
        }
        Ok(cursor)
    }

    /// Current cursor-stack depth.
    pub fn cursor_depth(&self) -> usize {
        self.cursors.len()
    }

    /// Record a local variable declaration; rejects collisions with the
    /// frame's declared inputs and existing locals.
    pub fn declare_local(&mut self, variable: Variable) -> Result<()> {
        if self.signature.find_input(&variable.name).is_some() {
            return Err(AuthorError::DuplicateDeclaration(format!(
                "'{}' collides with a declared input of function '{}'",
                variable.name, self.signature.name
            )));
        }
        if self.locals.contains_key(&variable.name) {
            return Err(AuthorError::DuplicateDeclaration(format!(
                "local variable '{}' already declared in function '{}'",
                variable.name, self.signature.name
            )));
        }
        self.locals.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Look up a local variable.
    pub fn local(&self, name: &str) -> Option<&Variable> {
        self.locals.get(name)
    }
}
