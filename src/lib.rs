//! # Tsumiki - Block Graph and Shape-Mutation Engine
//!
//! **Tsumiki** is the structural core of a block-based visual program editor:
//! blocks link to each other through typed connections and together form a
//! program expressed as a tree. The crate owns the hard parts of that model:
//! the connection graph, the atomic `reshape` operation that rebuilds a
//! block's inputs when a definition or mutator changes its structure, the
//! shadow (default-value) block rules, and the textual serialization the tree
//! round-trips through. Rendering, gestures and workspace chrome are left to
//! hosts; the core only emits well-defined change notifications.
//!
//! ## Core Workflow
//!
//! 1.  **Define block types**: register JSON [`BlockDefinition`]s with a
//!     [`BlockFactory`]. A definition's message template (`"repeat %1 times"`)
//!     fixes the order of fields and inputs.
//! 2.  **Build blocks**: `obtain_block` constructs a block into a
//!     [`BlockGraph`], installing its shape through one `reshape` and applying
//!     at most one mutator plus any extensions.
//! 3.  **Wire the tree**: connect complementary connection pairs
//!     (output↔input, previous↔next), with shadow blocks filling empty slots.
//! 4.  **Round-trip**: serialize any block tree to a [`SavedBlock`] document
//!     and load it back; `deep_copy` is exactly that round trip.
//!
//! [`BlockDefinition`]: factory::BlockDefinition
//! [`BlockFactory`]: factory::BlockFactory
//! [`BlockGraph`]: graph::BlockGraph
//! [`SavedBlock`]: document::SavedBlock
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsumiki::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut graph = BlockGraph::new();
//!     let mut factory = BlockFactory::new();
//!
//!     factory.define_from_json(
//!         r#"[
//!         {
//!             "type": "math_number",
//!             "message": "%1",
//!             "output": true,
//!             "args": [{ "kind": "field_number", "name": "NUM", "value": 0.0 }]
//!         },
//!         {
//!             "type": "math_sum",
//!             "message": "%1 + %2",
//!             "output": true,
//!             "inputsInline": true,
//!             "args": [
//!                 { "kind": "input_value", "name": "A" },
//!                 { "kind": "input_value", "name": "B" }
//!             ]
//!         }
//!     ]"#,
//!     )?;
//!
//!     let sum = factory.obtain_block(&mut graph, BlockTemplate::of_type("math_sum"))?;
//!     let number = factory.obtain_block(&mut graph, BlockTemplate::of_type("math_number"))?;
//!
//!     // Plug the number into the sum's first operand.
//!     let slot = graph
//!         .input_by_name(&sum, "A")
//!         .and_then(|input| graph.input(input)?.connection())
//!         .expect("value input has a connection");
//!     let output = graph
//!         .block(&number)
//!         .and_then(|block| block.output_connection())
//!         .expect("number block has an output");
//!     graph.connect(slot, output)?;
//!
//!     // Serialize the tree and print it.
//!     let saved = save_block(&graph, &sum, WriteOptions::ALL)?;
//!     println!("{}", saved.to_json()?);
//!
//!     // A deep copy is a serialize-then-reparse round trip.
//!     let copy = deep_copy(&mut graph, &mut factory, &sum)?;
//!     println!("copy root: {}", graph.describe(&copy));
//!     Ok(())
//! }
//! ```

pub mod block;
pub mod document;
pub mod error;
pub mod event;
pub mod factory;
pub mod graph;
pub mod message;
pub mod mutation;
pub mod prelude;
