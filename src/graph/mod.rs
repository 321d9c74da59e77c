//! The block graph: an arena owning every block, input and connection, plus
//! the operations that mutate the tree they form.
//!
//! Ownership runs strictly parent-owns-child-connection-object; a
//! connection's target is a non-owning handle back into the arena, and a
//! block's parent is always discovered by traversal, never stored. The graph
//! is single-threaded and cooperative: no operation blocks, and every
//! operation validates before mutating, so failures leave the graph
//! untouched.

mod display;
mod reshape;
mod traverse;

pub use display::DisplayBlockTree;

use crate::block::{
    Block, Connection, ConnectionId, ConnectionKind, Field, Input, InputId, InputKind,
};
use crate::error::{GraphError, LoadError};
use crate::event::{BlockObserver, ChangeRecord, ChangeScope, ObserverId, UpdateMask};
use crate::mutation::Mutator;
use ahash::AHashMap;
use tracing::debug;

/// Arena and mutation engine for a tree of blocks.
#[derive(Debug, Default)]
pub struct BlockGraph {
    pub(crate) blocks: AHashMap<String, Block>,
    pub(crate) connections: AHashMap<ConnectionId, Connection>,
    pub(crate) inputs: AHashMap<InputId, Input>,
    next_connection_id: u64,
    next_input_id: u64,
    next_observer_id: u64,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Arena access -----------------------------------------------------

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub(crate) fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn contains_block(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn input(&self, id: InputId) -> Option<&Input> {
        self.inputs.get(&id)
    }

    pub fn input_mut(&mut self, id: InputId) -> Option<&mut Input> {
        self.inputs.get_mut(&id)
    }

    /// Developer description of a block id, safe on unknown ids.
    pub fn describe(&self, id: &str) -> String {
        match self.blocks.get(id) {
            Some(block) => block.describe(),
            None => format!("unknown block (id=\"{}\")", id),
        }
    }

    // ---- Arena allocation -------------------------------------------------

    /// Allocates a fresh, unconnected connection of the given kind. It only
    /// becomes part of a block's shape once a reshape installs it.
    pub fn new_connection(&mut self, kind: ConnectionKind) -> ConnectionId {
        let id = ConnectionId(self.next_connection_id);
        self.next_connection_id += 1;
        self.connections.insert(
            id,
            Connection {
                id,
                kind,
                owner: None,
                target: None,
                shadow_target: None,
            },
        );
        id
    }

    /// Allocates a fresh input with its fields. Value and statement inputs
    /// get a child connection of the matching kind; dummy inputs get none.
    pub fn new_input(
        &mut self,
        kind: InputKind,
        name: Option<&str>,
        fields: Vec<Field>,
    ) -> InputId {
        let connection = match kind {
            InputKind::Value => Some(self.new_connection(ConnectionKind::Input)),
            InputKind::Statement => Some(self.new_connection(ConnectionKind::Next)),
            InputKind::Dummy => None,
        };
        let id = InputId(self.next_input_id);
        self.next_input_id += 1;
        self.inputs.insert(
            id,
            Input {
                id,
                kind,
                name: name.map(str::to_string),
                owner: None,
                connection,
                fields,
            },
        );
        id
    }

    pub(crate) fn insert_block(&mut self, block: Block) {
        self.blocks.insert(block.id.clone(), block);
    }

    /// Removes a block and everything it owns from the arena, clearing any
    /// handle that still points at the removed connections. Used to back out
    /// of failed construction and loading; block destruction is otherwise the
    /// container's concern.
    pub(crate) fn discard_block(&mut self, id: &str) {
        let Some(block) = self.blocks.remove(id) else {
            return;
        };
        let mut removed: Vec<ConnectionId> = Vec::new();
        for input_id in &block.inputs {
            if let Some(input) = self.inputs.remove(input_id)
                && let Some(conn) = input.connection
            {
                removed.push(conn);
            }
        }
        removed.extend([block.output, block.previous, block.next].into_iter().flatten());
        for conn_id in &removed {
            self.connections.remove(conn_id);
        }
        for conn in self.connections.values_mut() {
            if conn.target.is_some_and(|t| removed.contains(&t)) {
                conn.target = None;
            }
            if conn.shadow_target.is_some_and(|t| removed.contains(&t)) {
                conn.shadow_target = None;
            }
        }
    }

    // ---- Connection operations (typed graph edges) ------------------------

    /// Joins two connections of complementary kinds, recording each as the
    /// other's target. Fails if either side is already connected, the kinds
    /// do not pair, or the edge would make a block its own ancestor.
    pub fn connect(&mut self, a: ConnectionId, b: ConnectionId) -> Result<(), GraphError> {
        let (kind_a, owner_a) = self.connection_owner(a)?;
        let (kind_b, owner_b) = self.connection_owner(b)?;

        let conn_a = &self.connections[&a];
        let conn_b = &self.connections[&b];
        if conn_a.target == Some(b) || conn_b.target == Some(a) {
            return Err(GraphError::AlreadyConnected);
        }
        if conn_a.target.is_some() || conn_b.target.is_some() {
            return Err(GraphError::AlreadyConnected);
        }
        if !kind_a.pairs_with(kind_b) {
            return Err(GraphError::KindMismatch(kind_a, kind_b));
        }

        // Reject an edge that would close a cycle: the child block must not
        // already be an ancestor of the parent block.
        let (parent_id, child_id) = if kind_a.is_upward() {
            (owner_b, owner_a)
        } else {
            (owner_a, owner_b)
        };
        if self.is_same_or_ancestor(&child_id, &parent_id) {
            return Err(GraphError::WouldCycle {
                parent: self.describe(&parent_id),
                child: self.describe(&child_id),
            });
        }

        if let Some(conn) = self.connections.get_mut(&a) {
            conn.target = Some(b);
        }
        if let Some(conn) = self.connections.get_mut(&b) {
            conn.target = Some(a);
        }
        debug!(parent = %parent_id, child = %child_id, "connected blocks");
        Ok(())
    }

    /// Clears the reciprocal link, if any. No-op when already unconnected.
    pub fn disconnect(&mut self, id: ConnectionId) -> Result<(), GraphError> {
        let conn = self
            .connections
            .get_mut(&id)
            .ok_or(GraphError::UnknownConnection)?;
        let Some(target) = conn.target.take() else {
            return Ok(());
        };
        if let Some(other) = self.connections.get_mut(&target) {
            other.target = None;
        }
        Ok(())
    }

    /// Records a non-owning default link on `id`. Does not itself connect
    /// anything; the shadow only becomes live through
    /// [`connect_or_throw`](Self::connect_or_throw) or an explicit connect.
    pub fn set_shadow_connection(
        &mut self,
        id: ConnectionId,
        shadow: Option<ConnectionId>,
    ) -> Result<(), GraphError> {
        let kind = self
            .connections
            .get(&id)
            .ok_or(GraphError::UnknownConnection)?
            .kind;
        if let Some(shadow_id) = shadow {
            let shadow_kind = self
                .connections
                .get(&shadow_id)
                .ok_or(GraphError::UnknownConnection)?
                .kind;
            if !kind.pairs_with(shadow_kind) {
                return Err(GraphError::KindMismatch(kind, shadow_kind));
            }
        }
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.shadow_target = shadow;
        }
        Ok(())
    }

    /// True iff the connection has a live target.
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.connections.get(&id).is_some_and(Connection::is_connected)
    }

    /// The block owning the live target of `id`, if any.
    pub fn target_block(&self, id: ConnectionId) -> Option<&Block> {
        let target = self.connections.get(&id)?.target?;
        self.owner_block(target)
    }

    /// The block owning the shadow target of `id`, if any.
    pub fn shadow_block(&self, id: ConnectionId) -> Option<&Block> {
        let shadow = self.connections.get(&id)?.shadow_target?;
        self.owner_block(shadow)
    }

    fn owner_block(&self, id: ConnectionId) -> Option<&Block> {
        let owner = self.connections.get(&id)?.owner.as_ref()?;
        self.blocks.get(owner)
    }

    fn connection_owner(&self, id: ConnectionId) -> Result<(ConnectionKind, String), GraphError> {
        let conn = self
            .connections
            .get(&id)
            .ok_or(GraphError::UnknownConnection)?;
        let owner = conn.owner.clone().ok_or(GraphError::UnknownConnection)?;
        Ok((conn.kind, owner))
    }

    // ---- Loader connection protocol ---------------------------------------

    /// Connects the given child and/or shadow to a connection on this block,
    /// or fails with a descriptive loading error. When only a shadow is
    /// given, the shadow also becomes the live connection.
    pub fn connect_or_throw(
        &mut self,
        tag: &str,
        conn: ConnectionId,
        child: Option<&str>,
        shadow: Option<&str>,
    ) -> Result<(), LoadError> {
        let (_, owner) = self.connection_owner(conn)?;

        if let Some(child_id) = child {
            let child_desc = self.describe(child_id);
            if self.blocks.get(&owner).is_some_and(|b| b.is_shadow) {
                let child_is_shadow = self.blocks.get(child_id).is_some_and(|b| b.is_shadow);
                if !child_is_shadow {
                    return Err(LoadError::ShadowParent {
                        parent: self.describe(&owner),
                        child: child_desc,
                    });
                }
            }
            let child_conn = self
                .blocks
                .get(child_id)
                .and_then(Block::upward_connection)
                .ok_or_else(|| LoadError::InvalidConnection {
                    description: self.describe(&owner),
                    tag: tag.to_string(),
                    child: child_desc.clone(),
                    source: GraphError::NoUpwardConnection(child_desc.clone()),
                })?;
            self.connect(conn, child_conn)
                .map_err(|source| LoadError::InvalidConnection {
                    description: self.describe(&owner),
                    tag: tag.to_string(),
                    child: self.describe(child_id),
                    source,
                })?;
        }

        if let Some(shadow_id) = shadow {
            let shadow_desc = self.describe(shadow_id);
            let shadow_conn = self
                .blocks
                .get(shadow_id)
                .and_then(Block::upward_connection)
                .ok_or_else(|| LoadError::InvalidShadowConnection {
                    description: self.describe(&owner),
                    tag: tag.to_string(),
                    child: shadow_desc.clone(),
                    source: GraphError::NoUpwardConnection(shadow_desc.clone()),
                })?;
            self.set_shadow_connection(conn, Some(shadow_conn))
                .map_err(|e| wrap_shadow_error(self, &owner, tag, shadow_id, e))?;
            if !self.is_connected(conn) {
                // No live child given, so the shadow fills the slot.
                self.connect(conn, shadow_conn)
                    .map_err(|e| wrap_shadow_error(self, &owner, tag, shadow_id, e))?;
            }
        }
        Ok(())
    }

    // ---- Shadow state machine ---------------------------------------------

    /// Flips the shadow flag. Rejected while connected to a parent; becoming
    /// a shadow is additionally rejected when any input holds a variable
    /// field or a non-shadow child. No-op when the state already matches.
    pub fn set_shadow(&mut self, id: &str, is_shadow: bool) -> Result<(), GraphError> {
        let block = self
            .blocks
            .get(id)
            .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;
        if block.is_shadow == is_shadow {
            return Ok(());
        }
        if let Some(up) = block.upward_connection()
            && self.is_connected(up)
        {
            return Err(GraphError::ShadowWhileParented);
        }
        if is_shadow {
            if self.inputs_contain_variable_field(&block.inputs) {
                return Err(GraphError::ShadowVariableField);
            }
            for input_id in &block.inputs {
                let child = self
                    .inputs
                    .get(input_id)
                    .and_then(|input| input.connection)
                    .and_then(|conn| self.target_block(conn));
                if child.is_some_and(|c| !c.is_shadow) {
                    return Err(GraphError::ShadowNonShadowChild);
                }
            }
        }
        if let Some(block) = self.blocks.get_mut(id) {
            block.is_shadow = is_shadow;
        }
        debug!(block = %id, is_shadow, "changed shadow state");
        self.fire_update(id, UpdateMask::IS_SHADOW);
        Ok(())
    }

    /// True if any of the given inputs contains a variable field.
    pub(crate) fn inputs_contain_variable_field(&self, inputs: &[InputId]) -> bool {
        inputs.iter().any(|id| {
            self.inputs
                .get(id)
                .is_some_and(Input::contains_variable_field)
        })
    }

    // ---- Flag mutations ----------------------------------------------------

    /// Sets the disabled flag inside the grouped-change scope. The change is
    /// recorded before observers are notified.
    pub fn set_disabled(
        &mut self,
        id: &str,
        disabled: bool,
        scope: &mut dyn ChangeScope,
    ) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.disabled == disabled {
            return Ok(());
        }
        block.disabled = disabled;
        scope.record(ChangeRecord::Disabled {
            block_id: id.to_string(),
            value: disabled,
        });
        self.fire_update(id, UpdateMask::IS_DISABLED);
        Ok(())
    }

    /// Sets the collapsed flag inside the grouped-change scope.
    pub fn set_collapsed(
        &mut self,
        id: &str,
        collapsed: bool,
        scope: &mut dyn ChangeScope,
    ) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.collapsed == collapsed {
            return Ok(());
        }
        block.collapsed = collapsed;
        scope.record(ChangeRecord::Collapsed {
            block_id: id.to_string(),
            value: collapsed,
        });
        self.fire_update(id, UpdateMask::IS_COLLAPSED);
        Ok(())
    }

    /// Sets the comment inside the grouped-change scope.
    pub fn set_comment(
        &mut self,
        id: &str,
        comment: Option<&str>,
        scope: &mut dyn ChangeScope,
    ) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.comment.as_deref() == comment {
            return Ok(());
        }
        let old = block.comment.take();
        block.comment = comment.map(str::to_string);
        scope.record(ChangeRecord::Comment {
            block_id: id.to_string(),
            old,
            new: comment.map(str::to_string),
        });
        self.fire_update(id, UpdateMask::COMMENT);
        Ok(())
    }

    /// Sets whether value inputs render inline. Always marks the flag as
    /// explicitly set for the next serialization, even when the value is
    /// unchanged.
    pub fn set_inputs_inline(
        &mut self,
        id: &str,
        inline: bool,
        scope: &mut dyn ChangeScope,
    ) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        block.inputs_inline_modified = true;
        if block.inputs_inline == inline {
            return Ok(());
        }
        block.inputs_inline = inline;
        scope.record(ChangeRecord::InputsInline {
            block_id: id.to_string(),
            value: inline,
        });
        self.fire_update(id, UpdateMask::INPUTS_INLINE);
        Ok(())
    }

    // No change-record support for editable/movable/deletable yet; they sit
    // outside the grouped-change scope.

    pub fn set_editable(&mut self, id: &str, editable: bool) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.editable == editable {
            return Ok(());
        }
        block.editable = editable;
        self.fire_update(id, UpdateMask::IS_EDITABLE);
        Ok(())
    }

    /// Note: there is no movable update category, so observers are not
    /// notified of this change.
    pub fn set_movable(&mut self, id: &str, movable: bool) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        block.movable = movable;
        Ok(())
    }

    pub fn set_deletable(&mut self, id: &str, deletable: bool) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.deletable == deletable {
            return Ok(());
        }
        block.deletable = deletable;
        self.fire_update(id, UpdateMask::IS_DELETABLE);
        Ok(())
    }

    pub fn set_color(&mut self, id: &str, color: u32) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.color == color {
            return Ok(());
        }
        block.color = color;
        self.fire_update(id, UpdateMask::COLOR);
        Ok(())
    }

    pub fn set_tooltip(&mut self, id: &str, tooltip: Option<&str>) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.tooltip.as_deref() == tooltip {
            return Ok(());
        }
        block.tooltip = tooltip.map(str::to_string);
        self.fire_update(id, UpdateMask::TOOLTIP);
        Ok(())
    }

    pub fn set_has_context_menu(&mut self, id: &str, enabled: bool) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.has_context_menu == enabled {
            return Ok(());
        }
        block.has_context_menu = enabled;
        self.fire_update(id, UpdateMask::CONTEXT_MENU);
        Ok(())
    }

    /// Sets the workspace position. Only meaningful for a parentless block.
    pub fn set_position(&mut self, id: &str, x: f32, y: f32) -> Result<(), GraphError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GraphError::InvalidPosition);
        }
        let block = self.require_block_mut(id)?;
        block.position.x = x;
        block.position.y = y;
        Ok(())
    }

    fn require_block_mut(&mut self, id: &str) -> Result<&mut Block, GraphError> {
        self.blocks
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))
    }

    // ---- Mutator / extension bookkeeping -----------------------------------

    pub(crate) fn install_mutator(
        &mut self,
        id: &str,
        mutator_id: &str,
        mutator: Box<dyn Mutator>,
    ) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.mutator.is_some() {
            return Err(GraphError::MutatorAlreadySet);
        }
        block.mutator_id = Some(mutator_id.to_string());
        block.mutator = Some(mutator);
        Ok(())
    }

    /// Temporarily removes the mutator so it can be called with `&mut self`.
    /// Pair with [`restore_mutator`](Self::restore_mutator).
    pub(crate) fn take_mutator(&mut self, id: &str) -> Option<Box<dyn Mutator>> {
        self.blocks.get_mut(id).and_then(|b| b.mutator.take())
    }

    pub(crate) fn restore_mutator(&mut self, id: &str, mutator: Box<dyn Mutator>) {
        if let Some(block) = self.blocks.get_mut(id) {
            block.mutator = Some(mutator);
        }
    }

    pub(crate) fn record_extension(&mut self, id: &str, name: &str) -> Result<(), GraphError> {
        let block = self.require_block_mut(id)?;
        if block.extensions.iter().any(|e| e == name) {
            return Err(GraphError::ExtensionAlreadyApplied(name.to_string()));
        }
        block.extensions.push(name.to_string());
        Ok(())
    }

    // ---- Observers ---------------------------------------------------------

    /// Registers an observer on a block. The handle unsubscribes it later.
    pub fn subscribe(
        &mut self,
        id: &str,
        observer: BlockObserver,
    ) -> Result<ObserverId, GraphError> {
        let observer_id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        let block = self.require_block_mut(id)?;
        block.observers.push((observer_id, observer));
        Ok(observer_id)
    }

    /// Removes an observer. Returns whether it was present.
    pub fn unsubscribe(&mut self, id: &str, observer_id: ObserverId) -> Result<bool, GraphError> {
        let block = self.require_block_mut(id)?;
        let before = block.observers.len();
        block.observers.retain(|(oid, _)| *oid != observer_id);
        Ok(block.observers.len() != before)
    }

    /// Notifies every current subscriber of the block with the mask of
    /// changed categories.
    pub(crate) fn fire_update(&mut self, id: &str, mask: UpdateMask) {
        let mut observers = match self.blocks.get_mut(id) {
            Some(block) if !block.observers.is_empty() => std::mem::take(&mut block.observers),
            _ => return,
        };
        if let Some(block) = self.blocks.get(id) {
            for (_, observer) in observers.iter_mut() {
                observer(block, mask);
            }
        }
        if let Some(block) = self.blocks.get_mut(id) {
            // Subscribers added during notification land after the existing
            // list and only hear about later updates.
            observers.append(&mut block.observers);
            block.observers = observers;
        }
    }
}

fn wrap_shadow_error(
    graph: &BlockGraph,
    owner: &str,
    tag: &str,
    shadow_id: &str,
    source: GraphError,
) -> LoadError {
    LoadError::InvalidShadowConnection {
        description: graph.describe(owner),
        tag: tag.to_string(),
        child: graph.describe(shadow_id),
        source,
    }
}
