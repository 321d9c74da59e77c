//! Observer notification and the grouped-change scope contract.

use crate::block::Block;
use bitflags::bitflags;

bitflags! {
    /// Update categories reported to block observers. Categories are
    /// independent bits so one notification can cover several at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UpdateMask: u16 {
        const INPUTS_FIELDS_CONNECTIONS = 0x01;
        const COLOR = 0x02;
        const COMMENT = 0x04;
        const IS_SHADOW = 0x08;
        const IS_DISABLED = 0x10;
        const IS_COLLAPSED = 0x20;
        const IS_EDITABLE = 0x40;
        const IS_DELETABLE = 0x80;
        const TOOLTIP = 0x0100;
        const CONTEXT_MENU = 0x0200;
        const INPUTS_INLINE = 0x0400;
    }
}

/// Callback invoked with the updated block and the categories that changed.
pub type BlockObserver = Box<dyn FnMut(&Block, UpdateMask)>;

/// Handle returned by [`BlockGraph::subscribe`](crate::graph::BlockGraph::subscribe),
/// used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// A change to user-visible block state, as recorded into the hosting
/// editor's event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    Disabled { block_id: String, value: bool },
    Collapsed { block_id: String, value: bool },
    InputsInline { block_id: String, value: bool },
    Comment {
        block_id: String,
        old: Option<String>,
        new: Option<String>,
    },
}

/// The grouped-transaction envelope supplied by an external controller.
///
/// State-visible setters call [`record`](ChangeScope::record) before
/// notifying block observers, so an observer that enqueues further changes
/// always sees its own records ordered after the one that triggered it. The
/// core relies on the hosting scope preserving that order; it assumes nothing
/// else about the scope's internals.
pub trait ChangeScope {
    fn record(&mut self, change: ChangeRecord);
}

/// A scope that simply collects records in order. Handy for tests and for
/// hosts without an undo log.
#[derive(Debug, Default)]
pub struct ChangeLog {
    records: Vec<ChangeRecord>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ChangeRecord> {
        self.records
    }
}

impl ChangeScope for ChangeLog {
    fn record(&mut self, change: ChangeRecord) {
        self.records.push(change);
    }
}

/// A scope that drops every record. Used by the document loader, where
/// reconstructing saved state must not pollute the host's change log.
#[derive(Debug, Default)]
pub struct DiscardChanges;

impl ChangeScope for DiscardChanges {
    fn record(&mut self, _change: ChangeRecord) {}
}
