use crate::block::ConnectionKind;
use thiserror::Error;

/// Errors raised while building blocks from definitions or wiring a loaded
/// document. These are recoverable: a caller can abort the offending block or
/// document and keep going. Each variant carries enough context (block
/// description, tag name, offending peer) to diagnose a malformed document.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to parse block definition JSON: {0}")]
    DefinitionParse(String),

    #[error("Invalid definition data: {0}")]
    InvalidDefinition(String),

    #[error("Unknown block type '{0}'")]
    UnknownDefinition(String),

    #[error("Block id '{0}' is already in use")]
    DuplicateBlockId(String),

    #[error("Shadow blocks may not contain variable fields: {description}")]
    ShadowVariableField { description: String },

    #[error("{parent} cannot be a parent to non-shadow {child}")]
    ShadowParent { parent: String, child: String },

    #[error("{description}: invalid '{tag}' connection to {child}")]
    InvalidConnection {
        description: String,
        tag: String,
        child: String,
        #[source]
        source: GraphError,
    },

    #[error("{description}: invalid '{tag}' shadow connection to {child}")]
    InvalidShadowConnection {
        description: String,
        tag: String,
        child: String,
        #[source]
        source: GraphError,
    },

    #[error("Input '{input}' not found on {description}")]
    MissingInput { input: String, description: String },

    #[error("Field '{field}' not found on {description}")]
    MissingField { field: String, description: String },

    #[error("Invalid value '{value}' for field '{field}': {message}")]
    FieldValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("Unknown mutator '{0}'")]
    UnknownMutator(String),

    #[error("Unknown extension '{0}'")]
    UnknownExtension(String),

    #[error("Mutator '{mutator_id}' failed on {description}: {message}")]
    MutatorFailed {
        mutator_id: String,
        description: String,
        message: String,
    },

    /// An invariant violation surfaced while loading. The underlying
    /// [`GraphError`] still indicates a caller bug, not bad document data.
    #[error(transparent)]
    Invariant(#[from] GraphError),
}

/// Invariant and argument violations on the block graph.
///
/// Unlike [`LoadError`], these indicate the graph or its caller is already in
/// an invalid state. They are not meant to be caught and continued; every
/// operation validates before mutating, so an `Err` leaves the graph
/// untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown block id '{0}'")]
    UnknownBlock(String),

    #[error("Unknown connection handle")]
    UnknownConnection,

    #[error("Unknown input handle")]
    UnknownInput,

    #[error("{0} has no upward connection")]
    NoUpwardConnection(String),

    #[error("{0:?} and {1:?} connections cannot be paired")]
    KindMismatch(ConnectionKind, ConnectionKind),

    #[error("Connection is already connected; disconnect first")]
    AlreadyConnected,

    #[error("Connecting {child} under {parent} would make it its own ancestor")]
    WouldCycle { parent: String, child: String },

    #[error("A block cannot have both an output connection and a previous connection")]
    OutputAndPrevious,

    #[error("The {slot} connection is not of kind {expected:?}")]
    SlotKindMismatch {
        slot: &'static str,
        expected: ConnectionKind,
    },

    #[error("Cannot remove input '{name}' while connected")]
    RemoveConnectedInput { name: String },

    #[error("Cannot add input '{name}' while connected")]
    AddConnectedInput { name: String },

    #[error("Input '{name}' appears twice in the reshape list")]
    DuplicateInput { name: String },

    #[error("Cannot replace the {slot} connection while connected")]
    ReplaceConnectedSlot { slot: &'static str },

    #[error("Cannot change mutators on a block")]
    MutatorAlreadySet,

    #[error("Extension '{0}' has already been applied to this block")]
    ExtensionAlreadyApplied(String),

    #[error("Cannot change block shadow state while connected to a parent")]
    ShadowWhileParented,

    #[error("Shadow blocks cannot contain variable fields")]
    ShadowVariableField,

    #[error("Cannot change block to shadow while non-shadow children are connected")]
    ShadowNonShadowChild,

    #[error("Position must be a real, finite number")]
    InvalidPosition,

    #[error("Connection types must match and must be a next or input connection")]
    CopyConnectionKind,

    #[error("Failed to copy blocks: {0}")]
    CopyRoundTrip(String),
}

/// Errors around encoding, decoding and storing saved documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Serialization failed: {0}")]
    Encode(String),

    #[error("Deserialization failed: {0}")]
    Decode(String),

    #[error("Document I/O failed for '{path}': {message}")]
    Io { path: String, message: String },
}
