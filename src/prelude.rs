//! Prelude module for convenient imports
//!
//! Re-exports the most commonly used types from the tsumiki crate. Import
//! this module to get access to the core functionality without having to
//! import each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use tsumiki::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let mut graph = BlockGraph::new();
//! let mut factory = BlockFactory::new();
//!
//! // Register block definitions and build a block.
//! let definitions = std::fs::read_to_string("path/to/blocks.json")?;
//! factory.define_from_json(&definitions)?;
//! let block = factory.obtain_block(&mut graph, BlockTemplate::of_type("controls_repeat"))?;
//!
//! // Serialize the tree under it.
//! let saved = save_block(&graph, &block, WriteOptions::ALL)?;
//! println!("{}", saved.to_json()?);
//! # Ok(())
//! # }
//! ```

// Graph and entities
pub use crate::block::{
    Block, BlockContainer, Connection, ConnectionId, ConnectionKind, DropdownOption, Field,
    FieldKind, Input, InputId, InputKind, Position,
};
pub use crate::graph::{BlockGraph, DisplayBlockTree};

// Construction
pub use crate::factory::{ArgumentDefinition, BlockDefinition, BlockFactory, BlockTemplate};
pub use crate::mutation::Mutator;

// Events and observers
pub use crate::event::{
    ChangeLog, ChangeRecord, ChangeScope, DiscardChanges, ObserverId, UpdateMask,
};

// Documents
pub use crate::document::{
    NodeTag, SavedBlock, SavedField, SavedInput, SavedNext, WriteOptions, copy_connection,
    deep_copy, load_block, save_block,
};

// Message templates
pub use crate::message::{MessageToken, tokenize};

// Error types
pub use crate::error::{DocumentError, GraphError, LoadError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
