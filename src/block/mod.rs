pub mod connection;
pub mod field;
pub mod input;

pub use connection::*;
pub use field::*;
pub use input::*;

use crate::event::{BlockObserver, ObserverId};
use crate::mutation::Mutator;
use std::fmt;
use std::rc::Rc;

/// Color assigned to blocks whose definition does not specify one.
pub const DEFAULT_BLOCK_COLOR: u32 = 0x66_66_66;

/// A 2-D workspace position. Only meaningful for a block with no parent; a
/// connected block is positioned by whoever renders its parent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// External capability a block's ancestry resolves into: a workspace, a
/// toolbox category, or the trash. Implemented by hosts, only consumed here.
pub trait BlockContainer {
    fn id(&self) -> &str;
    /// True for top-level containers (workspace, toolbox, trash).
    fn is_root_container(&self) -> bool;
    fn parent_container(&self) -> Option<Rc<dyn BlockContainer>>;
}

/// A node in the program tree: one instruction or expression unit, linking to
/// others through typed connections.
///
/// Identity (`id`, `type_name`) is immutable after construction; the shape
/// (inputs and connections) is replaced wholesale by the graph's `reshape`
/// and never patched incrementally. Blocks are built by a
/// [`BlockFactory`](crate::factory::BlockFactory) and owned by a
/// [`BlockGraph`](crate::graph::BlockGraph).
pub struct Block {
    pub(crate) id: String,
    pub(crate) type_name: String,
    pub(crate) is_shadow: bool,

    pub(crate) color: u32,
    pub(crate) inputs: Vec<InputId>,
    pub(crate) output: Option<ConnectionId>,
    pub(crate) previous: Option<ConnectionId>,
    pub(crate) next: Option<ConnectionId>,
    /// Flat view over all connections, rebuilt by reshape.
    pub(crate) connections: Vec<ConnectionId>,

    pub(crate) tooltip: Option<String>,
    pub(crate) comment: Option<String>,
    pub(crate) has_context_menu: bool,
    pub(crate) deletable: bool,
    pub(crate) movable: bool,
    pub(crate) editable: bool,
    pub(crate) collapsed: bool,
    pub(crate) disabled: bool,
    pub(crate) inputs_inline: bool,
    pub(crate) inputs_inline_modified: bool,
    pub(crate) position: Position,

    pub(crate) mutator_id: Option<String>,
    pub(crate) mutator: Option<Box<dyn Mutator>>,
    pub(crate) extensions: Vec<String>,

    pub(crate) observers: Vec<(ObserverId, BlockObserver)>,
    pub(crate) parent_container: Option<Rc<dyn BlockContainer>>,
}

impl Block {
    pub(crate) fn new(id: String, type_name: String, color: u32) -> Self {
        Self {
            id,
            type_name,
            is_shadow: false,
            color,
            inputs: Vec::new(),
            output: None,
            previous: None,
            next: None,
            connections: Vec::new(),
            tooltip: None,
            comment: None,
            has_context_menu: true,
            deletable: true,
            movable: true,
            editable: true,
            collapsed: false,
            disabled: false,
            inputs_inline: false,
            inputs_inline_modified: false,
            position: Position::default(),
            mutator_id: None,
            mutator: None,
            extensions: Vec::new(),
            observers: Vec::new(),
            parent_container: None,
        }
    }

    /// The globally unique identifier of the block. Not for display.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The definition name of the block. Not for display.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_shadow(&self) -> bool {
        self.is_shadow
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    pub fn has_context_menu(&self) -> bool {
        self.has_context_menu
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn is_movable(&self) -> bool {
        self.movable
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    /// The block's own disabled flag. Does not consult ancestors; use
    /// [`BlockGraph::is_disabled`](crate::graph::BlockGraph::is_disabled) for
    /// the propagated form.
    pub fn is_disabled_block(&self) -> bool {
        self.disabled
    }

    /// True iff the user can drag this block: shadows and immovable blocks
    /// cannot be dragged.
    pub fn is_draggable(&self) -> bool {
        !self.is_shadow && self.movable
    }

    pub fn inputs_inline(&self) -> bool {
        self.inputs_inline
    }

    /// Whether the inline flag has ever been explicitly set. Serialization
    /// writes the inline attribute only when this is true.
    pub fn inputs_inline_modified(&self) -> bool {
        self.inputs_inline_modified
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Input handles in display order.
    pub fn inputs(&self) -> &[InputId] {
        &self.inputs
    }

    pub fn has_inputs(&self) -> bool {
        !self.inputs.is_empty()
    }

    pub fn output_connection(&self) -> Option<ConnectionId> {
        self.output
    }

    pub fn previous_connection(&self) -> Option<ConnectionId> {
        self.previous
    }

    pub fn next_connection(&self) -> Option<ConnectionId> {
        self.next
    }

    /// The previous-or-output connection, pointing toward the parent.
    pub fn upward_connection(&self) -> Option<ConnectionId> {
        self.previous.or(self.output)
    }

    /// All connections on this block: input connections in input order, then
    /// output, previous and next. A borrowed view, not a fresh allocation.
    pub fn all_connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    pub fn mutator_id(&self) -> Option<&str> {
        self.mutator_id.as_deref()
    }

    pub fn mutator(&self) -> Option<&dyn Mutator> {
        self.mutator.as_deref()
    }

    /// Names of extensions already applied to this block.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// The container this block was attached to.
    ///
    /// TODO(container-wiring): nothing sets this yet; the workspace, toolbox
    /// and trash attach points still need to call `set_parent_container`.
    pub fn parent_container(&self) -> Option<Rc<dyn BlockContainer>> {
        self.parent_container.clone()
    }

    /// Walks `parent_container` links up to the root container, if attached.
    pub fn root_container(&self) -> Option<Rc<dyn BlockContainer>> {
        let mut container = self.parent_container.clone()?;
        while !container.is_root_container() {
            container = container.parent_container()?;
        }
        Some(container)
    }

    /// Records the container holding this block. Not called by this crate;
    /// see `parent_container`.
    pub fn set_parent_container(&mut self, container: Option<Rc<dyn BlockContainer>>) {
        self.parent_container = container;
    }

    /// Developer-facing description used in logs and loading errors.
    pub fn describe(&self) -> String {
        format!(
            "\"{}\" {} (id=\"{}\")",
            self.type_name,
            if self.is_shadow { "shadow" } else { "block" },
            self.id
        )
    }
}

impl BlockContainer for Block {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_root_container(&self) -> bool {
        false
    }

    fn parent_container(&self) -> Option<Rc<dyn BlockContainer>> {
        self.parent_container.clone()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .field("is_shadow", &self.is_shadow)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("previous", &self.previous)
            .field("next", &self.next)
            .field("mutator_id", &self.mutator_id)
            .finish_non_exhaustive()
    }
}
