//! Atomic replacement of a block's shape.

use super::BlockGraph;
use crate::block::{ConnectionId, ConnectionKind, InputId};
use crate::error::GraphError;
use crate::event::UpdateMask;
use itertools::Itertools;
use tracing::debug;

impl BlockGraph {
    /// Replaces a block's inputs and structural connections wholesale.
    ///
    /// This is the sole mutator of a block's shape; call it only from
    /// construction or a mutator's attach/update callback, since structural
    /// listeners assume shape changes arrive as self-consistent single
    /// events. Inputs kept across the old and new lists retain their
    /// connections and connected children; inputs that appear or disappear
    /// must be unconnected. An empty `new_inputs` clears the input list.
    ///
    /// Validation is fully front-loaded: on error the block is untouched.
    pub fn reshape(
        &mut self,
        id: &str,
        new_inputs: Vec<InputId>,
        output: Option<ConnectionId>,
        previous: Option<ConnectionId>,
        next: Option<ConnectionId>,
    ) -> Result<(), GraphError> {
        let block = self
            .blocks
            .get(id)
            .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;

        // The two upward slots are mutually exclusive.
        if output.is_some() && previous.is_some() {
            return Err(GraphError::OutputAndPrevious);
        }
        self.check_slot_kind("output", output, ConnectionKind::Output)?;
        self.check_slot_kind("previous", previous, ConnectionKind::Previous)?;
        self.check_slot_kind("next", next, ConnectionKind::Next)?;

        if let Some(dup) = new_inputs.iter().duplicates().next() {
            return Err(GraphError::DuplicateInput {
                name: self.input_display_name(*dup),
            });
        }
        for input_id in &new_inputs {
            if !self.inputs.contains_key(input_id) {
                return Err(GraphError::UnknownInput);
            }
        }

        let old_inputs = block.inputs.clone();

        // Dropping or swapping a structural slot that still holds a live
        // edge would detach a child behind the caller's back.
        for (slot, old, new) in [
            ("output", block.output, output),
            ("previous", block.previous, previous),
            ("next", block.next, next),
        ] {
            if let Some(old_conn) = old
                && Some(old_conn) != new
                && self.is_connected(old_conn)
            {
                return Err(GraphError::ReplaceConnectedSlot { slot });
            }
        }

        for input_id in &old_inputs {
            if !new_inputs.contains(input_id) && self.input_child_connected(*input_id) {
                return Err(GraphError::RemoveConnectedInput {
                    name: self.input_display_name(*input_id),
                });
            }
        }
        for input_id in &new_inputs {
            if !old_inputs.contains(input_id) && self.input_child_connected(*input_id) {
                return Err(GraphError::AddConnectedInput {
                    name: self.input_display_name(*input_id),
                });
            }
        }

        // Validation passed; commit.
        for input_id in &old_inputs {
            if !new_inputs.contains(input_id) {
                self.set_input_owner(*input_id, None);
            }
        }
        let mut connections = Vec::with_capacity(new_inputs.len() + 2);
        for input_id in &new_inputs {
            if !old_inputs.contains(input_id) {
                self.set_input_owner(*input_id, Some(id));
            }
            if let Some(conn) = self.inputs.get(input_id).and_then(|i| i.connection) {
                connections.push(conn);
            }
        }
        for slot in [output, previous, next].into_iter().flatten() {
            if let Some(conn) = self.connections.get_mut(&slot) {
                conn.owner = Some(id.to_string());
            }
            connections.push(slot);
        }

        if let Some(block) = self.blocks.get_mut(id) {
            block.inputs = new_inputs;
            block.output = output;
            block.previous = previous;
            block.next = next;
            block.connections = connections;
        }
        debug!(block = %id, "reshaped block");
        self.fire_update(id, UpdateMask::INPUTS_FIELDS_CONNECTIONS);
        Ok(())
    }

    fn check_slot_kind(
        &self,
        slot: &'static str,
        conn: Option<ConnectionId>,
        expected: ConnectionKind,
    ) -> Result<(), GraphError> {
        let Some(conn_id) = conn else {
            return Ok(());
        };
        let conn = self
            .connections
            .get(&conn_id)
            .ok_or(GraphError::UnknownConnection)?;
        if conn.kind != expected {
            return Err(GraphError::SlotKindMismatch { slot, expected });
        }
        Ok(())
    }

    fn input_child_connected(&self, id: InputId) -> bool {
        self.inputs
            .get(&id)
            .and_then(|input| input.connection)
            .is_some_and(|conn| self.is_connected(conn))
    }

    fn input_display_name(&self, id: InputId) -> String {
        self.inputs
            .get(&id)
            .and_then(|input| input.name.clone())
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    fn set_input_owner(&mut self, id: InputId, owner: Option<&str>) {
        let mut connection = None;
        if let Some(input) = self.inputs.get_mut(&id) {
            input.owner = owner.map(str::to_string);
            connection = input.connection;
        }
        if let Some(conn) = connection.and_then(|c| self.connections.get_mut(&c)) {
            conn.owner = owner.map(str::to_string);
        }
    }
}
