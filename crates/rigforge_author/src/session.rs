// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph session: scope stacks and node constructors.
//!
//! A [`RigSession`] owns one backend and one scope-frame stack per
//! solver phase. Every node constructor follows the same template:
//! check the scope, take a layout position, materialize the node, track
//! it for open comment boxes, bind its inputs, and, when the archetype
//! bears control flow, splice it into the active execution cursor.

use crate::binder::{BindValue, PinBinder};
use crate::comments::COMMENT_BORDER;
use crate::error::{AuthorError, Result};
use crate::layout::PLUG_PADDING;
use crate::scope::{CursorKind, FanOutState, FunctionSignature, ScopeFrame};
use crate::variables::{TypeNameTable, Variable, VariableScope};
use indexmap::IndexMap;
use rigforge_graph::{GraphBackend, ItemKey, NodeId, PinDirection, PinPath, PinType, Size};

/// Default extent of control-flow-bearing nodes.
pub const EXECUTE_NODE_SIZE: Size = Size { x: 250.0, y: 160.0 };

/// Default extent of pure data nodes.
pub const DATA_NODE_SIZE: Size = Size { x: 200.0, y: 130.0 };

/// The solver a fresh session authors into.
pub const DEFAULT_SOLVER: &str = "Forward";

/// Archetype paths for the built-in node catalog.
pub mod archetypes {
    /// Read a local or member variable
    pub const GET_VARIABLE: &str = "Variable.Get";
    /// Write a local or member variable
    pub const SET_VARIABLE: &str = "Variable.Set";
    /// If/else branch
    pub const BRANCH: &str = "Core.Branch";
    /// Iterate an array
    pub const FOR_EACH: &str = "Core.ForEach";
    /// N-ary execution fan-out
    pub const SEQUENCE: &str = "Core.Sequence";
    /// Read element metadata
    pub const GET_METADATA: &str = "Metadata.Get";
    /// Write element metadata
    pub const SET_METADATA: &str = "Metadata.Set";
    /// Build a spline through rig elements
    pub const SPLINE_FROM_ITEMS: &str = "Spline.FromItems";
    /// Sample a spline at a parameter
    pub const POSITION_FROM_SPLINE: &str = "Spline.PositionFromU";
    /// Read one array element
    pub const ARRAY_AT: &str = "Array.At";
    /// Append one array element
    pub const ARRAY_ADD: &str = "Array.Add";
    /// Constrain a child element to weighted parents
    pub const PARENT_CONSTRAINT: &str = "Constraint.Parent";

    /// Archetype of a binary math node.
    pub fn math(op: &str) -> String {
        format!("Math.{op}")
    }

    /// Archetype of a call to a library function.
    pub fn function_call(name: &str) -> String {
        format!("Function.{name}")
    }
}

/// Binary arithmetic operators exposed as math nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `A + B`
    Add,
    /// `A - B`
    Subtract,
    /// `A * B`
    Multiply,
    /// `A / B`
    Divide,
}

impl BinaryOp {
    fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Subtract => "Subtract",
            Self::Multiply => "Multiply",
            Self::Divide => "Divide",
        }
    }
}

/// Pins handed back by [`RigSession::for_each`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachPins {
    /// The current element (resolved to the element type)
    pub element: PinPath,
    /// The current iteration index
    pub index: PinPath,
}

/// One graph-authoring session against a backend.
///
/// Sessions are fully independent: each owns its backend handle, its
/// scope stacks and its wildcard resolutions, so several can coexist.
pub struct RigSession<B: GraphBackend> {
    backend: B,
    solvers: IndexMap<String, Vec<ScopeFrame>>,
    active_solver: String,
    binder: PinBinder,
    type_names: TypeNameTable,
    members: IndexMap<String, Variable>,
    next_node_size: Option<Size>,
}

impl<B: GraphBackend> RigSession<B> {
    /// New session authoring into the default solver.
    pub fn new(backend: B) -> Self {
        Self::with_type_table(backend, TypeNameTable::new())
    }

    /// New session with a host-extended type-name table.
    pub fn with_type_table(backend: B, type_names: TypeNameTable) -> Self {
        let mut solvers = IndexMap::new();
        solvers.insert(DEFAULT_SOLVER.to_string(), Vec::new());
        Self {
            backend,
            solvers,
            active_solver: DEFAULT_SOLVER.to_string(),
            binder: PinBinder::new(),
            type_names,
            members: IndexMap::new(),
            next_node_size: None,
        }
    }

    /// The backend, for inspection.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consume the session and hand the backend back.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// The type-name table, for host extensions.
    pub fn type_names_mut(&mut self) -> &mut TypeNameTable {
        &mut self.type_names
    }

    /// Switch solver phases, creating the stack on first use.
    pub fn select_solver(&mut self, name: &str) {
        self.solvers.entry(name.to_string()).or_default();
        self.active_solver = name.to_string();
    }

    /// The solver currently authored into.
    pub fn active_solver(&self) -> &str {
        &self.active_solver
    }

    /// Execution-cursor depth of the active frame, for balance checks.
    pub fn cursor_depth(&self) -> Result<usize> {
        Ok(self.frame()?.cursor_depth())
    }

    // ---- scope lifecycle -------------------------------------------------

    /// Open a function definition and push its scope frame.
    ///
    /// Registers the function in the library, exposes its declared pins
    /// and, for mutable functions, seeds the root execution cursor.
    pub fn start_function(&mut self, signature: FunctionSignature) -> Result<NodeId> {
        let function = self
            .backend
            .create_function(&signature.name, signature.mutable)?;
        for decl in &signature.inputs {
            self.backend.add_exposed_pin(
                function,
                &decl.name,
                PinDirection::Input,
                &self.type_names.name_of(&decl.pin_type)?,
                decl.is_array,
            )?;
        }
        for decl in &signature.outputs {
            self.backend.add_exposed_pin(
                function,
                &decl.name,
                PinDirection::Output,
                &self.type_names.name_of(&decl.pin_type)?,
                decl.is_array,
            )?;
        }
        tracing::debug!(
            function = %signature.name,
            solver = %self.active_solver,
            mutable = signature.mutable,
            "opened function scope"
        );
        self.solvers
            .entry(self.active_solver.clone())
            .or_default()
            .push(ScopeFrame::new(function, signature));
        Ok(function)
    }

    /// Close the innermost function definition.
    ///
    /// Mutable frames must be back to the root cursor; the final cursor
    /// is linked to the function's return execute pin and the return
    /// node takes the frame's next layout position. With
    /// `add_call_site`, a call node for the finished function is emitted
    /// in the parent frame.
    pub fn end_function(&mut self, add_call_site: bool) -> Result<()> {
        let frames = self.frames_mut();
        let mut frame = frames.pop().ok_or_else(|| {
            AuthorError::ScopeViolation("end_function with no open function scope".to_string())
        })?;

        if !frame.comments.is_empty() {
            let open: Vec<&str> = frame.comments.open_names().collect();
            return Err(AuthorError::ScopeViolation(format!(
                "function '{}' closed with open comment boxes: {}",
                frame.signature.name,
                open.join(", ")
            )));
        }
        if frame.fan_out.is_some() {
            return Err(AuthorError::ScopeViolation(format!(
                "function '{}' closed with an open fan-out",
                frame.signature.name
            )));
        }
        if frame.signature.mutable {
            if frame.cursor_depth() != 1 {
                return Err(AuthorError::ScopeViolation(format!(
                    "cursor-stack imbalance on closing function '{}': depth {}",
                    frame.signature.name,
                    frame.cursor_depth()
                )));
            }
            let cursor = frame.active_cursor()?.pin.clone();
            let return_exec = PinPath::root(frame.function, "Return").child("ExecuteContext");
            self.backend.add_link(&cursor, &return_exec)?;

            let position = frame.layout.next_position(EXECUTE_NODE_SIZE, true);
            self.backend.set_node_position(frame.function, position)?;
        }
        tracing::debug!(function = %frame.signature.name, "closed function scope");

        if add_call_site {
            let name = frame.signature.name.clone();
            let mutable = frame.signature.mutable;
            let archetype = archetypes::function_call(&name);
            let parent = active_frame_mut(&mut self.solvers, &self.active_solver)
                .map_err(|_| {
                    AuthorError::ScopeViolation(format!(
                        "no parent scope to place a call site for '{name}'"
                    ))
                })?;
            if mutable {
                ensure_spliceable(parent)?;
            }
            let size = EXECUTE_NODE_SIZE;
            let (node, _) = place_node(&mut self.backend, parent, &archetype, size, mutable)?;
            if mutable {
                splice(&mut self.backend, parent, node)?;
            }
        }
        Ok(())
    }

    /// Pop the active cursor, returning control flow to the construct
    /// that pushed it. Balanced branch/loop authoring calls this once
    /// per pushed cursor.
    pub fn go_to_parent_execute(&mut self) -> Result<()> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        frame.pop_cursor()?;
        Ok(())
    }

    // ---- layout & comment boxes ------------------------------------------

    /// Start a new layout column with the next node.
    pub fn set_new_column(&mut self, gap_factor: f32) -> Result<()> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        frame.layout.set_new_column(gap_factor);
        Ok(())
    }

    /// Override the size used for the next node only.
    pub fn override_next_node_size(&mut self, size: Size) {
        self.next_node_size = Some(size);
    }

    /// Open a comment box; nodes created until it closes are enclosed.
    pub fn open_comment_box(&mut self, name: &str) -> Result<()> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        frame.comments.open(name)
    }

    /// Close a comment box and emit the enclosing annotation node.
    pub fn close_comment_box(&mut self, name: &str, color: [u8; 3]) -> Result<()> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let bounds = frame.comments.close(name)?.padded(COMMENT_BORDER);
        self.backend
            .add_comment_node(name, bounds.top_left, bounds.size, color)?;
        Ok(())
    }

    // ---- variables & wildcards -------------------------------------------

    /// Declare a variable local to the open function scope.
    pub fn declare_local_variable(
        &mut self,
        name: &str,
        pin_type: PinType,
        is_array: bool,
    ) -> Result<()> {
        let type_name = self.type_names.name_of(&pin_type)?;
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        frame.declare_local(Variable {
            name: name.to_string(),
            pin_type,
            is_array,
            scope: VariableScope::Local,
        })?;
        let function = frame.function;
        self.backend
            .declare_local_variable(function, name, &type_name, is_array)?;
        Ok(())
    }

    /// Declare a variable that lives for the whole session.
    pub fn declare_member_variable(
        &mut self,
        name: &str,
        pin_type: PinType,
        is_array: bool,
    ) -> Result<()> {
        if self.members.contains_key(name) {
            return Err(AuthorError::DuplicateDeclaration(format!(
                "member variable '{name}' already declared"
            )));
        }
        let type_name = self.type_names.name_of(&pin_type)?;
        self.backend
            .declare_member_variable(name, &type_name, is_array)?;
        self.members.insert(
            name.to_string(),
            Variable {
                name: name.to_string(),
                pin_type,
                is_array,
                scope: VariableScope::Member,
            },
        );
        Ok(())
    }

    /// Resolve a wildcard pin ahead of binding it.
    pub fn resolve_wildcard(&mut self, pin: &PinPath, pin_type: &PinType) -> Result<()> {
        self.binder
            .resolve(&mut self.backend, &self.type_names, pin, pin_type)
    }

    /// Address a declared input of the open function.
    pub fn input_pin(&self, name: &str) -> Result<PinPath> {
        let frame = self.frame()?;
        frame
            .signature
            .find_input(name)
            .ok_or_else(|| AuthorError::UnknownVariable(name.to_string()))?;
        Ok(PinPath::root(frame.function, "Entry").child(name))
    }

    /// Bind a value onto a declared output of the open function.
    pub fn bind_output(&mut self, name: &str, value: BindValue) -> Result<()> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let decl = frame
            .signature
            .outputs
            .iter()
            .find(|decl| decl.name == name)
            .ok_or_else(|| AuthorError::UnknownVariable(name.to_string()))?;
        let declared = declared_type(&decl.pin_type, decl.is_array);
        let pin = PinPath::root(frame.function, "Return").child(name);
        self.binder.bind(&mut self.backend, &value, &pin, &declared)
    }

    // ---- node constructors -----------------------------------------------

    /// Read a variable; returns the node's resolved `Value` output.
    pub fn get_variable(&mut self, name: &str) -> Result<PinPath> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let variable = lookup_variable(frame, &self.members, name)?;
        let size = self.next_node_size.take().unwrap_or(DATA_NODE_SIZE);
        let (node, _) =
            place_node(&mut self.backend, frame, archetypes::GET_VARIABLE, size, false)?;

        let value = PinPath::root(node, "Value");
        let var_type = declared_type(&variable.pin_type, variable.is_array);
        self.binder
            .resolve(&mut self.backend, &self.type_names, &value, &var_type)?;
        self.backend
            .set_pin_default(&PinPath::root(node, "Variable"), name)?;
        Ok(value)
    }

    /// Write a variable. Mutable: consumes and advances the cursor.
    pub fn set_variable(&mut self, name: &str, value: BindValue) -> Result<NodeId> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let variable = lookup_variable(frame, &self.members, name)?;
        ensure_spliceable(frame)?;
        let size = self.next_node_size.take().unwrap_or(EXECUTE_NODE_SIZE);
        let (node, _) =
            place_node(&mut self.backend, frame, archetypes::SET_VARIABLE, size, true)?;

        self.backend
            .set_pin_default(&PinPath::root(node, "Variable"), name)?;
        let value_pin = PinPath::root(node, "Value");
        let var_type = declared_type(&variable.pin_type, variable.is_array);
        self.binder
            .resolve(&mut self.backend, &self.type_names, &value_pin, &var_type)?;
        self.binder
            .bind(&mut self.backend, &value, &value_pin, &PinType::Wildcard)?;
        splice(&mut self.backend, frame, node)?;
        Ok(node)
    }

    /// Open an if/else branch.
    ///
    /// The active cursor becomes the branch's `Completed` pin and two
    /// case cursors are pushed, `False` below `True`; the true case
    /// authors first. Each case ends with [`Self::go_to_parent_execute`].
    pub fn branch(&mut self, condition: BindValue) -> Result<NodeId> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        ensure_spliceable(frame)?;
        let size = self.next_node_size.take().unwrap_or(EXECUTE_NODE_SIZE);
        let (node, _) = place_node(&mut self.backend, frame, archetypes::BRANCH, size, true)?;

        self.binder.bind(
            &mut self.backend,
            &condition,
            &PinPath::root(node, "Condition"),
            &PinType::Bool,
        )?;

        let cursor = frame.active_cursor()?.pin.clone();
        self.backend
            .add_link(&cursor, &PinPath::root(node, "ExecuteContext"))?;
        frame.advance_cursor(PinPath::root(node, "Completed"))?;
        frame.push_cursor(PinPath::root(node, "False"), CursorKind::BranchCase);
        frame.push_cursor(PinPath::root(node, "True"), CursorKind::BranchCase);
        Ok(node)
    }

    /// Open a for-each loop over an array value.
    ///
    /// The active cursor becomes the loop's `Completed` pin and one
    /// body cursor is pushed on the loop's own execute pin (a child of
    /// the node, not a sibling cursor). Exit the body with
    /// [`Self::go_to_parent_execute`].
    pub fn for_each(&mut self, array: BindValue, element_type: PinType) -> Result<ForEachPins> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        ensure_spliceable(frame)?;
        let size = self.next_node_size.take().unwrap_or(EXECUTE_NODE_SIZE);
        let (node, _) = place_node(&mut self.backend, frame, archetypes::FOR_EACH, size, true)?;

        let array_pin = PinPath::root(node, "Array");
        let element_pin = PinPath::root(node, "Element");
        let array_type = PinType::array(element_type.clone());
        self.binder
            .resolve(&mut self.backend, &self.type_names, &array_pin, &array_type)?;
        self.binder
            .resolve(&mut self.backend, &self.type_names, &element_pin, &element_type)?;
        self.binder
            .bind(&mut self.backend, &array, &array_pin, &PinType::Wildcard)?;

        let cursor = frame.active_cursor()?.pin.clone();
        self.backend
            .add_link(&cursor, &PinPath::root(node, "ExecuteContext"))?;
        frame.advance_cursor(PinPath::root(node, "Completed"))?;
        frame.push_cursor(PinPath::root(node, "ExecuteContext"), CursorKind::LoopBody);

        Ok(ForEachPins {
            element: element_pin,
            index: PinPath::root(node, "Index"),
        })
    }

    /// Open an execution fan-out. Branches are allocated one at a time
    /// with [`Self::sequence_plug`] and the construct ends with
    /// [`Self::end_sequence`].
    pub fn sequence(&mut self) -> Result<NodeId> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        ensure_spliceable(frame)?;
        if frame.fan_out.is_some() {
            return Err(AuthorError::ScopeViolation(format!(
                "function '{}' already has an open fan-out",
                frame.signature.name
            )));
        }
        let size = self.next_node_size.take().unwrap_or(EXECUTE_NODE_SIZE);
        let (node, position) =
            place_node(&mut self.backend, frame, archetypes::SEQUENCE, size, true)?;

        let cursor = frame.active_cursor()?.pin.clone();
        self.backend
            .add_link(&cursor, &PinPath::root(node, "ExecuteContext"))?;
        frame.fan_out = Some(FanOutState {
            node,
            plug_index: 0,
            last_plug: None,
            column_x: position.x,
            depth: frame.cursor_depth(),
        });
        Ok(node)
    }

    /// Start the next fan-out branch, returning its plug name.
    ///
    /// The first two plugs are the archetype's fixed `A` and `B`; later
    /// ones are aggregate pins named by the backend. Every plug rebases
    /// the layout below everything placed so far, so parallel branches
    /// never overlap.
    pub fn sequence_plug(&mut self) -> Result<String> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let (node, plug_index, column_x, depth) = match &frame.fan_out {
            Some(fan_out) => (
                fan_out.node,
                fan_out.plug_index,
                fan_out.column_x,
                fan_out.depth,
            ),
            None => {
                return Err(AuthorError::ScopeViolation(format!(
                    "function '{}' has no open fan-out",
                    frame.signature.name
                )))
            }
        };
        if frame.cursor_depth() != depth {
            return Err(AuthorError::ScopeViolation(format!(
                "unbalanced construct inside fan-out branch of '{}'",
                frame.signature.name
            )));
        }

        let plug = match plug_index {
            0 => "A".to_string(),
            1 => "B".to_string(),
            _ => self.backend.add_array_aggregate_pin(node)?,
        };

        // The plug re-points the slot its sequence node consumed; a root
        // slot keeps its kind so the frame can never pop itself empty.
        let kind = match frame.active_cursor()?.kind {
            CursorKind::Root => CursorKind::Root,
            _ => CursorKind::SequencePlug,
        };
        frame.replace_cursor(PinPath::root(node, plug.as_str()), kind)?;
        frame.layout.start_branch_column(column_x, PLUG_PADDING);
        if let Some(fan_out) = frame.fan_out.as_mut() {
            fan_out.plug_index += 1;
            fan_out.last_plug = Some(plug.clone());
        }
        Ok(plug)
    }

    /// Close the open fan-out. At least one plug must have been
    /// requested; the last plug's cursor stays active.
    pub fn end_sequence(&mut self) -> Result<()> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let fan_out = frame.fan_out.take().ok_or_else(|| {
            AuthorError::ScopeViolation(format!(
                "function '{}' has no open fan-out",
                frame.signature.name
            ))
        })?;
        if fan_out.last_plug.is_none() {
            return Err(AuthorError::ScopeViolation(
                "fan-out closed without requesting any plug".to_string(),
            ));
        }
        if frame.cursor_depth() != fan_out.depth {
            return Err(AuthorError::ScopeViolation(format!(
                "unbalanced construct inside fan-out branch of '{}'",
                frame.signature.name
            )));
        }
        Ok(())
    }

    /// Binary arithmetic data node; returns the `Result` pin.
    pub fn binary_op(
        &mut self,
        op: BinaryOp,
        pin_type: PinType,
        a: BindValue,
        b: BindValue,
    ) -> Result<PinPath> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let size = self.next_node_size.take().unwrap_or(DATA_NODE_SIZE);
        let archetype = archetypes::math(op.name());
        let (node, _) = place_node(&mut self.backend, frame, &archetype, size, false)?;

        for pin_name in ["A", "B", "Result"] {
            self.binder.resolve(
                &mut self.backend,
                &self.type_names,
                &PinPath::root(node, pin_name),
                &pin_type,
            )?;
        }
        self.binder
            .bind(&mut self.backend, &a, &PinPath::root(node, "A"), &PinType::Wildcard)?;
        self.binder
            .bind(&mut self.backend, &b, &PinPath::root(node, "B"), &PinType::Wildcard)?;
        Ok(PinPath::root(node, "Result"))
    }

    /// Read metadata from a rig element; returns the resolved `Value`
    /// output.
    pub fn get_metadata(
        &mut self,
        item: BindValue,
        name: &str,
        pin_type: PinType,
    ) -> Result<PinPath> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let size = self.next_node_size.take().unwrap_or(DATA_NODE_SIZE);
        let (node, _) =
            place_node(&mut self.backend, frame, archetypes::GET_METADATA, size, false)?;

        self.binder
            .bind(&mut self.backend, &item, &PinPath::root(node, "Item"), &PinType::ItemKey)?;
        self.backend
            .set_pin_default(&PinPath::root(node, "Name"), name)?;
        let value = PinPath::root(node, "Value");
        self.binder
            .resolve(&mut self.backend, &self.type_names, &value, &pin_type)?;
        Ok(value)
    }

    /// Write metadata on a rig element. Mutable.
    pub fn set_metadata(
        &mut self,
        item: BindValue,
        name: &str,
        pin_type: PinType,
        value: BindValue,
    ) -> Result<NodeId> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        ensure_spliceable(frame)?;
        let size = self.next_node_size.take().unwrap_or(EXECUTE_NODE_SIZE);
        let (node, _) =
            place_node(&mut self.backend, frame, archetypes::SET_METADATA, size, true)?;

        self.binder
            .bind(&mut self.backend, &item, &PinPath::root(node, "Item"), &PinType::ItemKey)?;
        self.backend
            .set_pin_default(&PinPath::root(node, "Name"), name)?;
        let value_pin = PinPath::root(node, "Value");
        self.binder
            .resolve(&mut self.backend, &self.type_names, &value_pin, &pin_type)?;
        self.binder
            .bind(&mut self.backend, &value, &value_pin, &PinType::Wildcard)?;
        splice(&mut self.backend, frame, node)?;
        Ok(node)
    }

    /// Build a spline through rig elements; returns the spline handle
    /// pin (a host aggregate type).
    pub fn spline_from_items(&mut self, items: Vec<ItemKey>) -> Result<PinPath> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let size = self.next_node_size.take().unwrap_or(DATA_NODE_SIZE);
        let (node, _) = place_node(
            &mut self.backend,
            frame,
            archetypes::SPLINE_FROM_ITEMS,
            size,
            false,
        )?;

        let elements: Vec<BindValue> = items.into_iter().map(BindValue::Item).collect();
        self.binder.bind_array(
            &mut self.backend,
            &elements,
            &PinPath::root(node, "Items"),
            &PinType::ItemKey,
        )?;
        Ok(PinPath::root(node, "Spline"))
    }

    /// Sample a spline at parameter `u`; returns the `Position` pin.
    pub fn position_from_spline(&mut self, spline: BindValue, u: BindValue) -> Result<PinPath> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let size = self.next_node_size.take().unwrap_or(DATA_NODE_SIZE);
        let (node, _) = place_node(
            &mut self.backend,
            frame,
            archetypes::POSITION_FROM_SPLINE,
            size,
            false,
        )?;

        self.binder.bind(
            &mut self.backend,
            &spline,
            &PinPath::root(node, "Spline"),
            &PinType::Custom("Spline".to_string()),
        )?;
        self.binder
            .bind(&mut self.backend, &u, &PinPath::root(node, "U"), &PinType::Double)?;
        Ok(PinPath::root(node, "Position"))
    }

    /// Read one element of an array value; returns the resolved
    /// `Element` pin.
    pub fn array_at(
        &mut self,
        array: BindValue,
        index: BindValue,
        element_type: PinType,
    ) -> Result<PinPath> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        let size = self.next_node_size.take().unwrap_or(DATA_NODE_SIZE);
        let (node, _) = place_node(&mut self.backend, frame, archetypes::ARRAY_AT, size, false)?;

        let array_pin = PinPath::root(node, "Array");
        let element_pin = PinPath::root(node, "Element");
        let array_type = PinType::array(element_type.clone());
        self.binder
            .resolve(&mut self.backend, &self.type_names, &array_pin, &array_type)?;
        self.binder
            .resolve(&mut self.backend, &self.type_names, &element_pin, &element_type)?;
        self.binder
            .bind(&mut self.backend, &array, &array_pin, &PinType::Wildcard)?;
        self.binder
            .bind(&mut self.backend, &index, &PinPath::root(node, "Index"), &PinType::Int)?;
        Ok(element_pin)
    }

    /// Append an element to an array value. Mutable; returns the
    /// post-append array pin.
    pub fn array_add(
        &mut self,
        array: BindValue,
        element: BindValue,
        element_type: PinType,
    ) -> Result<PinPath> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        ensure_spliceable(frame)?;
        let size = self.next_node_size.take().unwrap_or(EXECUTE_NODE_SIZE);
        let (node, _) = place_node(&mut self.backend, frame, archetypes::ARRAY_ADD, size, true)?;

        let array_pin = PinPath::root(node, "Array");
        let element_pin = PinPath::root(node, "Element");
        let array_type = PinType::array(element_type.clone());
        self.binder
            .resolve(&mut self.backend, &self.type_names, &array_pin, &array_type)?;
        self.binder
            .resolve(&mut self.backend, &self.type_names, &element_pin, &element_type)?;
        self.binder
            .bind(&mut self.backend, &array, &array_pin, &PinType::Wildcard)?;
        self.binder
            .bind(&mut self.backend, &element, &element_pin, &PinType::Wildcard)?;
        splice(&mut self.backend, frame, node)?;
        Ok(array_pin)
    }

    /// Constrain a child element to one or more parents. Mutable.
    pub fn parent_constraint(
        &mut self,
        child: ItemKey,
        parents: Vec<ItemKey>,
        maintain_offset: bool,
    ) -> Result<NodeId> {
        let frame = active_frame_mut(&mut self.solvers, &self.active_solver)?;
        ensure_spliceable(frame)?;
        let size = self.next_node_size.take().unwrap_or(EXECUTE_NODE_SIZE);
        let (node, _) = place_node(
            &mut self.backend,
            frame,
            archetypes::PARENT_CONSTRAINT,
            size,
            true,
        )?;

        self.binder.bind(
            &mut self.backend,
            &BindValue::Item(child),
            &PinPath::root(node, "Child"),
            &PinType::ItemKey,
        )?;
        let parent_values: Vec<BindValue> = parents.into_iter().map(BindValue::Item).collect();
        self.binder.bind_array(
            &mut self.backend,
            &parent_values,
            &PinPath::root(node, "Parents"),
            &PinType::ItemKey,
        )?;
        self.binder.bind(
            &mut self.backend,
            &BindValue::Bool(maintain_offset),
            &PinPath::root(node, "MaintainOffset"),
            &PinType::Bool,
        )?;
        splice(&mut self.backend, frame, node)?;
        Ok(node)
    }

    // ---- internals ---------------------------------------------------

    fn frame(&self) -> Result<&ScopeFrame> {
        self.solvers
            .get(&self.active_solver)
            .and_then(|frames| frames.last())
            .ok_or_else(|| no_open_scope(&self.active_solver))
    }

    fn frames_mut(&mut self) -> &mut Vec<ScopeFrame> {
        self.solvers
            .entry(self.active_solver.clone())
            .or_default()
    }
}

/// Bearing `is_array` in mind, the full declared type of a variable or
/// exposed pin.
fn declared_type(pin_type: &PinType, is_array: bool) -> PinType {
    if is_array {
        PinType::array(pin_type.clone())
    } else {
        pin_type.clone()
    }
}

fn lookup_variable(
    frame: &ScopeFrame,
    members: &IndexMap<String, Variable>,
    name: &str,
) -> Result<Variable> {
    if let Some(variable) = frame.local(name) {
        return Ok(variable.clone());
    }
    if let Some(variable) = members.get(name) {
        return Ok(variable.clone());
    }
    Err(AuthorError::UnknownVariable(name.to_string()))
}

fn no_open_scope(solver: &str) -> AuthorError {
    AuthorError::ScopeViolation(format!("no open function scope in solver '{solver}'"))
}

fn active_frame_mut<'a>(
    solvers: &'a mut IndexMap<String, Vec<ScopeFrame>>,
    solver: &str,
) -> Result<&'a mut ScopeFrame> {
    solvers
        .get_mut(solver)
        .and_then(|frames| frames.last_mut())
        .ok_or_else(|| no_open_scope(solver))
}

/// Mutable archetypes need an attachable cursor before any backend call
/// happens; a fan-out that has not allocated its first plug is not
/// attachable.
fn ensure_spliceable(frame: &ScopeFrame) -> Result<()> {
    frame.active_cursor()?;
    if let Some(fan_out) = &frame.fan_out {
        if fan_out.last_plug.is_none() {
            return Err(AuthorError::ScopeViolation(format!(
                "fan-out in function '{}' has no plug yet",
                frame.signature.name
            )));
        }
    }
    Ok(())
}

/// Common creation path: layout position, backend node, comment-box
/// tracking.
fn place_node<B: GraphBackend>(
    backend: &mut B,
    frame: &mut ScopeFrame,
    archetype: &str,
    size: Size,
    is_execute_node: bool,
) -> Result<(NodeId, rigforge_graph::Point)> {
    let position = frame.layout.next_position(size, is_execute_node);
    let node = backend.create_node(archetype, position)?;
    frame.comments.track(position, size);
    tracing::trace!(archetype, x = position.x, y = position.y, "created node");
    Ok((node, position))
}

/// Splice a mutable node into the control-flow chain: link the active
/// cursor to the node's execute input and advance the cursor to the
/// node's execute output.
fn splice<B: GraphBackend>(backend: &mut B, frame: &mut ScopeFrame, node: NodeId) -> Result<()> {
    let cursor = frame.active_cursor()?.pin.clone();
    let exec = PinPath::root(node, "ExecuteContext");
    backend.add_link(&cursor, &exec)?;
    frame.advance_cursor(exec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigforge_graph::RecordingBackend;

    fn session() -> RigSession<RecordingBackend> {
        RigSession::new(RecordingBackend::new())
    }

    fn open_solve(session: &mut RigSession<RecordingBackend>) -> NodeId {
        session
            .start_function(FunctionSignature::new("Solve").mutable())
            .unwrap()
    }

    #[test]
    fn constructors_outside_scope_touch_no_backend() {
        let mut s = session();
        let err = s.set_variable("Counter", BindValue::Int(1)).unwrap_err();
        assert!(matches!(err, AuthorError::ScopeViolation(_)));
        assert_eq!(s.backend().call_count(), 0);

        let err = s.binary_op(
            BinaryOp::Add,
            PinType::Double,
            BindValue::Float(1.0),
            BindValue::Float(2.0),
        );
        assert!(err.is_err());
        assert_eq!(s.backend().call_count(), 0);
    }

    #[test]
    fn linear_node_advances_the_cursor() {
        let mut s = session();
        let function = open_solve(&mut s);
        s.declare_local_variable("Counter", PinType::Int, false).unwrap();
        let node = s.set_variable("Counter", BindValue::Int(1)).unwrap();

        let entry = PinPath::root(function, "Entry").child("ExecuteContext");
        let exec = PinPath::root(node, "ExecuteContext");
        assert!(s.backend().has_link(&entry, &exec));

        s.end_function(false).unwrap();
        let return_exec = PinPath::root(function, "Return").child("ExecuteContext");
        assert!(s.backend().has_link(&exec, &return_exec));
    }

    #[test]
    fn branch_balances_the_cursor_stack() {
        let mut s = session();
        open_solve(&mut s);
        s.declare_local_variable("Flag", PinType::Bool, false).unwrap();
        let depth = s.cursor_depth().unwrap();

        let branch = s.branch(BindValue::Bool(true)).unwrap();
        assert_eq!(s.cursor_depth().unwrap(), depth + 2);

        // True case
        s.set_variable("Flag", BindValue::Bool(false)).unwrap();
        s.go_to_parent_execute().unwrap();
        // False case
        s.set_variable("Flag", BindValue::Bool(true)).unwrap();
        s.go_to_parent_execute().unwrap();

        assert_eq!(s.cursor_depth().unwrap(), depth);
        assert_eq!(
            s.backend().default_of(&PinPath::root(branch, "Condition")),
            Some("true")
        );
        s.end_function(false).unwrap();
    }

    #[test]
    fn loop_body_is_entered_and_exited() {
        let mut s = session();
        open_solve(&mut s);
        s.declare_local_variable("Bones", PinType::ItemKey, true).unwrap();
        s.declare_local_variable("Count", PinType::Int, false).unwrap();

        let bones = s.get_variable("Bones").unwrap();
        let depth = s.cursor_depth().unwrap();
        let pins = s
            .for_each(BindValue::Pin(bones), PinType::ItemKey)
            .unwrap();
        assert_eq!(s.cursor_depth().unwrap(), depth + 1);

        s.set_variable("Count", BindValue::Pin(pins.index)).unwrap();
        s.go_to_parent_execute().unwrap();
        assert_eq!(s.cursor_depth().unwrap(), depth);
        s.end_function(false).unwrap();
    }

    #[test]
    fn unbalanced_scope_close_is_rejected() {
        let mut s = session();
        open_solve(&mut s);
        s.branch(BindValue::Bool(true)).unwrap();
        let err = s.end_function(false).unwrap_err();
        assert!(matches!(err, AuthorError::ScopeViolation(_)));
    }

    #[test]
    fn sequence_plugs_are_named_and_rebased() {
        let mut s = session();
        open_solve(&mut s);
        s.declare_local_variable("Step", PinType::Int, false).unwrap();

        s.sequence().unwrap();
        let mut branch_tops = Vec::new();
        let mut names = Vec::new();
        for step in 0..4_i64 {
            names.push(s.sequence_plug().unwrap());
            let node = s.set_variable("Step", BindValue::Int(step)).unwrap();
            branch_tops.push(s.backend().node(node).unwrap().position.y);
        }
        s.end_sequence().unwrap();
        s.end_function(false).unwrap();

        assert_eq!(names, ["A", "B", "C", "D"]);
        for pair in branch_tops.windows(2) {
            assert!(pair[1] > pair[0] + EXECUTE_NODE_SIZE.y);
        }
    }

    #[test]
    fn fan_out_at_root_keeps_the_root_cursor_protected() {
        let mut s = session();
        open_solve(&mut s);
        s.declare_local_variable("Step", PinType::Int, false).unwrap();

        s.sequence().unwrap();
        s.sequence_plug().unwrap();
        s.set_variable("Step", BindValue::Int(0)).unwrap();
        s.end_sequence().unwrap();

        // The fan-out consumed the root slot; it must stay unpoppable.
        let err = s.go_to_parent_execute().unwrap_err();
        assert!(matches!(err, AuthorError::ScopeViolation(_)));
        assert_eq!(s.cursor_depth().unwrap(), 1);
        s.end_function(false).unwrap();
    }

    #[test]
    fn sequence_without_plug_cannot_close_or_splice() {
        let mut s = session();
        open_solve(&mut s);
        s.declare_local_variable("Step", PinType::Int, false).unwrap();
        s.sequence().unwrap();

        let err = s.set_variable("Step", BindValue::Int(0)).unwrap_err();
        assert!(matches!(err, AuthorError::ScopeViolation(_)));
        let err = s.end_sequence().unwrap_err();
        assert!(matches!(err, AuthorError::ScopeViolation(_)));
    }

    #[test]
    fn nested_function_emits_call_site_in_parent() {
        let mut s = session();
        let outer = open_solve(&mut s);
        s.start_function(FunctionSignature::new("BuildChain").mutable())
            .unwrap();
        s.end_function(true).unwrap();

        let call = s
            .backend()
            .nodes()
            .find(|(_, node)| node.archetype == "Function.BuildChain")
            .map(|(id, _)| id)
            .unwrap();
        let entry = PinPath::root(outer, "Entry").child("ExecuteContext");
        assert!(s
            .backend()
            .has_link(&entry, &PinPath::root(call, "ExecuteContext")));
        s.end_function(false).unwrap();
    }

    #[test]
    fn member_variables_span_functions() {
        let mut s = session();
        s.declare_member_variable("Root", PinType::ItemKey, false)
            .unwrap();
        assert!(matches!(
            s.declare_member_variable("Root", PinType::ItemKey, false),
            Err(AuthorError::DuplicateDeclaration(_))
        ));

        open_solve(&mut s);
        let value = s.get_variable("Root").unwrap();
        assert_eq!(s.backend().resolved_type(&value), Some("ItemKey"));
        s.end_function(false).unwrap();

        open_solve(&mut s);
        assert!(s.get_variable("Root").is_ok());
        assert!(matches!(
            s.get_variable("Missing"),
            Err(AuthorError::UnknownVariable(_))
        ));
        s.end_function(false).unwrap();
    }

    #[test]
    fn solver_stacks_are_independent() {
        let mut s = session();
        open_solve(&mut s);
        s.select_solver("Construction");
        // The construction solver has no open scope of its own.
        assert!(matches!(
            s.set_new_column(1.0),
            Err(AuthorError::ScopeViolation(_))
        ));
        s.select_solver(DEFAULT_SOLVER);
        s.end_function(false).unwrap();
    }

    #[test]
    fn comment_box_encloses_created_nodes() {
        let mut s = session();
        open_solve(&mut s);
        s.declare_local_variable("Count", PinType::Int, false).unwrap();

        s.open_comment_box("counting").unwrap();
        s.set_variable("Count", BindValue::Int(0)).unwrap();
        s.set_variable("Count", BindValue::Int(1)).unwrap();
        s.close_comment_box("counting", [120, 160, 90]).unwrap();
        s.end_function(false).unwrap();

        let comments = s.backend().comments();
        assert_eq!(comments.len(), 1);
        let comment = &comments[0];
        assert_eq!(comment.text, "counting");
        // Two stacked execute nodes plus the border on each side.
        assert_eq!(
            comment.size.y,
            EXECUTE_NODE_SIZE.y * 2.0 + crate::layout::DEFAULT_GAP + COMMENT_BORDER * 2.0
        );
    }

    #[test]
    fn closing_frame_with_open_box_is_rejected() {
        let mut s = session();
        open_solve(&mut s);
        s.open_comment_box("dangling").unwrap();
        assert!(matches!(
            s.end_function(false),
            Err(AuthorError::ScopeViolation(_))
        ));
    }

    #[test]
    fn output_binding_targets_the_return_pin() {
        let mut s = session();
        let function = s
            .start_function(
                FunctionSignature::new("Measure")
                    .mutable()
                    .output("Length", PinType::Double),
            )
            .unwrap();
        s.bind_output("Length", BindValue::Float(12.0)).unwrap();
        s.end_function(false).unwrap();

        let pin = PinPath::root(function, "Return").child("Length");
        assert_eq!(s.backend().default_of(&pin), Some("12.000000"));
    }
}
