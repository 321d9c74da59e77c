//! Read-only traversal helpers over the block tree.

use super::BlockGraph;
use crate::block::{Block, ConnectionId, Field, InputId, InputKind};
use itertools::Itertools;

impl BlockGraph {
    /// The block connected to this block's next connection, if any.
    pub fn next_block(&self, id: &str) -> Option<&Block> {
        self.target_block(self.blocks.get(id)?.next?)
    }

    /// The block connected to this block's previous connection, if any.
    pub fn previous_block(&self, id: &str) -> Option<&Block> {
        self.target_block(self.blocks.get(id)?.previous?)
    }

    /// The next-or-input connection this block is connected to, if any.
    pub fn parent_connection(&self, id: &str) -> Option<ConnectionId> {
        let up = self.blocks.get(id)?.upward_connection()?;
        self.connection(up)?.target()
    }

    /// The block connected above, through the previous or output connection.
    pub fn parent_block(&self, id: &str) -> Option<&Block> {
        let parent_conn = self.parent_connection(id)?;
        let owner = self.connection(parent_conn)?.owner()?;
        self.blocks.get(owner)
    }

    /// The highest block this block descends from, following upward
    /// connections until none remain. Returns the block itself when it has
    /// no parent.
    pub fn root_block(&self, id: &str) -> Option<&Block> {
        let mut current = self.blocks.get(id)?;
        while let Some(parent) = self.parent_block(current.id()) {
            current = parent;
        }
        Some(current)
    }

    /// True when `ancestor_id` is `id` itself or one of its ancestors.
    pub(crate) fn is_same_or_ancestor(&self, ancestor_id: &str, id: &str) -> bool {
        if ancestor_id == id {
            return true;
        }
        let mut current = self.parent_block(id);
        while let Some(block) = current {
            if block.id() == ancestor_id {
                return true;
            }
            current = self.parent_block(block.id());
        }
        false
    }

    /// Whether the block is disabled, directly or via any strict ancestor.
    pub fn is_disabled(&self, id: &str) -> bool {
        let Some(block) = self.blocks.get(id) else {
            return false;
        };
        if block.disabled {
            return true;
        }
        let mut ancestor = self.parent_block(id);
        while let Some(block) = ancestor {
            if block.is_disabled_block() {
                return true;
            }
            ancestor = self.parent_block(block.id());
        }
        false
    }

    /// The last non-shadow block in this block's next-chain, possibly the
    /// block itself.
    pub fn last_block_in_sequence(&self, id: &str) -> Option<&Block> {
        let mut last = self.blocks.get(id)?;
        let mut next = self.next_block(id);
        while let Some(block) = next {
            if block.is_shadow() {
                break;
            }
            last = block;
            next = self.next_block(block.id());
        }
        Some(last)
    }

    /// The first input with the given name, compared case-insensitively.
    pub fn input_by_name(&self, id: &str, name: &str) -> Option<InputId> {
        self.blocks.get(id)?.inputs().iter().copied().find(|input_id| {
            self.inputs
                .get(input_id)
                .and_then(|input| input.name())
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    }

    /// The first field with the given name across all inputs, compared
    /// case-insensitively.
    pub fn field_by_name(&self, id: &str, name: &str) -> Option<&Field> {
        self.blocks.get(id)?.inputs().iter().find_map(|input_id| {
            self.inputs
                .get(input_id)
                .and_then(|input| input.field_by_name(name))
        })
    }

    /// Mutable access to the first field with the given name, for editing a
    /// field value in place.
    pub fn field_by_name_mut(&mut self, id: &str, name: &str) -> Option<&mut Field> {
        let input_ids = self.blocks.get(id)?.inputs.clone();
        for input_id in input_ids {
            let found = self
                .inputs
                .get(&input_id)
                .is_some_and(|input| input.field_by_name(name).is_some());
            if found {
                return self
                    .inputs
                    .get_mut(&input_id)
                    .and_then(|input| input.field_by_name_mut(name));
            }
        }
        None
    }

    /// The only value input on the block, or `None` when there are zero or
    /// several.
    pub fn only_value_input(&self, id: &str) -> Option<InputId> {
        self.blocks
            .get(id)?
            .inputs()
            .iter()
            .copied()
            .filter(|input_id| {
                self.inputs
                    .get(input_id)
                    .is_some_and(|input| input.kind() == InputKind::Value)
            })
            .exactly_one()
            .ok()
    }

    /// Walks a chain of blocks that each expose exactly one value input and
    /// returns the first of those connections that is free: unconnected, or
    /// occupied only by a shadow (which a real block may displace). `None` as
    /// soon as a block along the way has zero or several value inputs.
    pub fn last_unconnected_input_connection(&self, id: &str) -> Option<ConnectionId> {
        let mut current = id.to_string();
        loop {
            let only_input = self.only_value_input(&current)?;
            let conn = self.inputs.get(&only_input)?.connection()?;
            let Some(target) = self.target_block(conn) else {
                return Some(conn);
            };
            if target.is_shadow() {
                return Some(conn);
            }
            current = target.id().to_string();
        }
    }

    /// Appends all connections on the block and every descendant reached
    /// through a downward (next or input) edge. Output and previous edges
    /// point upward and are not descended.
    pub fn all_connections_recursive(&self, id: &str, out: &mut Vec<ConnectionId>) {
        let Some(block) = self.blocks.get(id) else {
            return;
        };
        out.extend_from_slice(block.all_connections());
        for conn_id in block.all_connections() {
            let Some(conn) = self.connection(*conn_id) else {
                continue;
            };
            if conn.kind().is_upward() {
                continue;
            }
            if let Some(target) = self.target_block(*conn_id) {
                let target_id = target.id().to_string();
                self.all_connections_recursive(&target_id, out);
            }
        }
    }

    /// Appends the ids of this block and all live descendants, inputs first,
    /// then the next chain. Occluded shadow blocks are not included.
    pub fn all_block_ids(&self, id: &str, out: &mut Vec<String>) {
        let Some(block) = self.blocks.get(id) else {
            return;
        };
        out.push(block.id().to_string());
        for input_id in block.inputs() {
            let child = self
                .inputs
                .get(input_id)
                .and_then(|input| input.connection())
                .and_then(|conn| self.target_block(conn));
            if let Some(child) = child {
                let child_id = child.id().to_string();
                self.all_block_ids(&child_id, out);
            }
        }
        if let Some(next) = self.next_block(id) {
            let next_id = next.id().to_string();
            self.all_block_ids(&next_id, out);
        }
    }
}
