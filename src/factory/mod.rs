//! Block construction from definitions.

pub mod definition;

pub use definition::*;

use crate::block::{
    Block, ConnectionKind, DEFAULT_BLOCK_COLOR, DropdownOption, Field, InputId, InputKind,
};
use crate::error::{GraphError, LoadError};
use crate::graph::BlockGraph;
use crate::message::{MessageToken, tokenize};
use crate::mutation::Mutator;
use ahash::AHashMap;
use std::fmt;
use tracing::debug;

/// Constructs a fresh mutator instance for each block it is applied to.
pub type MutatorCtor = Box<dyn Fn() -> Box<dyn Mutator>>;

/// An extension: arbitrary one-shot setup applied to a block after
/// construction. May reshape via an attached mutator, set flags, etc.
pub type ExtensionFn = Box<dyn Fn(&mut BlockGraph, &str) -> Result<(), LoadError>>;

/// Request for one block: its definition name, an optional explicit id, and
/// whether it should be built as a shadow.
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    pub(crate) type_name: String,
    pub(crate) id: Option<String>,
    pub(crate) shadow: bool,
}

impl BlockTemplate {
    pub fn of_type(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            id: None,
            shadow: false,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn shadow(mut self, shadow: bool) -> Self {
        self.shadow = shadow;
        self
    }
}

/// Builds blocks from registered definitions, applying mutators and
/// extensions, and generates ids for blocks that arrive without one.
#[derive(Default)]
pub struct BlockFactory {
    definitions: AHashMap<String, BlockDefinition>,
    mutators: AHashMap<String, MutatorCtor>,
    extensions: AHashMap<String, ExtensionFn>,
    next_block_id: u64,
}

impl BlockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition. A type may only be defined once.
    pub fn define(&mut self, definition: BlockDefinition) -> Result<(), LoadError> {
        definition.validate()?;
        if self.definitions.contains_key(&definition.type_name) {
            return Err(LoadError::InvalidDefinition(format!(
                "block type '{}' is already defined",
                definition.type_name
            )));
        }
        self.definitions
            .insert(definition.type_name.clone(), definition);
        Ok(())
    }

    /// Registers definitions from JSON: either a single definition object or
    /// an array of them.
    pub fn define_from_json(&mut self, json: &str) -> Result<(), LoadError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| LoadError::DefinitionParse(e.to_string()))?;
        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            other => vec![other],
        };
        for entry in entries {
            let definition: BlockDefinition = serde_json::from_value(entry)
                .map_err(|e| LoadError::DefinitionParse(e.to_string()))?;
            self.define(definition)?;
        }
        Ok(())
    }

    pub fn definition(&self, type_name: &str) -> Option<&BlockDefinition> {
        self.definitions.get(type_name)
    }

    pub fn register_mutator(&mut self, mutator_id: &str, ctor: MutatorCtor) {
        self.mutators.insert(mutator_id.to_string(), ctor);
    }

    pub fn register_extension(&mut self, name: &str, extension: ExtensionFn) {
        self.extensions.insert(name.to_string(), extension);
    }

    /// Builds one block into the graph and returns its id.
    ///
    /// The definition's inputs and connections are installed through a single
    /// reshape; the mutator (at most one) and extensions are then applied in
    /// order, each free to reshape again. Any failure discards the
    /// partially-built block and surfaces as a loading error.
    pub fn obtain_block(
        &mut self,
        graph: &mut BlockGraph,
        template: BlockTemplate,
    ) -> Result<String, LoadError> {
        let definition = self
            .definitions
            .get(&template.type_name)
            .ok_or_else(|| LoadError::UnknownDefinition(template.type_name.clone()))?
            .clone();

        let id = match &template.id {
            Some(id) => {
                if graph.contains_block(id) {
                    return Err(LoadError::DuplicateBlockId(id.clone()));
                }
                id.clone()
            }
            None => self.generate_block_id(graph),
        };

        let color = definition.color.unwrap_or(DEFAULT_BLOCK_COLOR);
        graph.insert_block(Block::new(id.clone(), definition.type_name.clone(), color));

        let built = self.build_shape(graph, &id, &definition, &template);
        if let Err(error) = built {
            graph.discard_block(&id);
            return Err(error);
        }
        debug!(block = %id, block_type = %definition.type_name, "built block");
        Ok(id)
    }

    fn build_shape(
        &self,
        graph: &mut BlockGraph,
        id: &str,
        definition: &BlockDefinition,
        template: &BlockTemplate,
    ) -> Result<(), LoadError> {
        let inputs = build_input_list(graph, definition)?;
        let output = definition
            .output
            .then(|| graph.new_connection(ConnectionKind::Output));
        let previous = definition
            .previous
            .then(|| graph.new_connection(ConnectionKind::Previous));
        let next = definition
            .next
            .then(|| graph.new_connection(ConnectionKind::Next));
        graph.reshape(id, inputs, output, previous, next)?;

        if let Some(block) = graph.block_mut(id) {
            block.inputs_inline = definition.inputs_inline.unwrap_or(false);
            block.inputs_inline_modified = false;
            block.tooltip = definition.tooltip.clone();
        }

        if template.shadow {
            graph.set_shadow(id, true).map_err(|error| match error {
                GraphError::ShadowVariableField => LoadError::ShadowVariableField {
                    description: graph.describe(id),
                },
                other => LoadError::Invariant(other),
            })?;
        }

        if let Some(mutator_id) = &definition.mutator {
            self.apply_mutator(graph, mutator_id, id)?;
        }
        for name in &definition.extensions {
            self.apply_extension(graph, name, id)?;
        }
        Ok(())
    }

    /// Attaches the registered mutator to a block. A block accepts at most
    /// one mutator, ever; the attach callback may reshape the block.
    pub fn apply_mutator(
        &self,
        graph: &mut BlockGraph,
        mutator_id: &str,
        block_id: &str,
    ) -> Result<(), LoadError> {
        let ctor = self
            .mutators
            .get(mutator_id)
            .ok_or_else(|| LoadError::UnknownMutator(mutator_id.to_string()))?;
        let block = graph
            .block(block_id)
            .ok_or_else(|| GraphError::UnknownBlock(block_id.to_string()))?;
        if block.mutator().is_some() {
            return Err(LoadError::Invariant(GraphError::MutatorAlreadySet));
        }
        let mut mutator = ctor();
        mutator.on_attached(graph, block_id)?;
        graph.install_mutator(block_id, mutator_id, mutator)?;
        Ok(())
    }

    /// Applies the registered extension to a block, at most once per name.
    pub fn apply_extension(
        &self,
        graph: &mut BlockGraph,
        name: &str,
        block_id: &str,
    ) -> Result<(), LoadError> {
        let extension = self
            .extensions
            .get(name)
            .ok_or_else(|| LoadError::UnknownExtension(name.to_string()))?;
        graph.record_extension(block_id, name)?;
        extension(graph, block_id)?;
        Ok(())
    }

    fn generate_block_id(&mut self, graph: &BlockGraph) -> String {
        loop {
            let id = format!("b-{}", self.next_block_id);
            self.next_block_id += 1;
            if !graph.contains_block(&id) {
                return id;
            }
        }
    }
}

impl fmt::Debug for BlockFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockFactory")
            .field("definitions", &self.definitions.len())
            .field("mutators", &self.mutators.len())
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

/// Lays out fields and inputs in the order the tokenized message dictates.
/// Fields accumulate until an input placeholder flushes them into that
/// input; trailing fields land in an unnamed dummy input.
fn build_input_list(
    graph: &mut BlockGraph,
    definition: &BlockDefinition,
) -> Result<Vec<InputId>, LoadError> {
    let message = definition.message.as_deref().unwrap_or("");
    let mut inputs: Vec<InputId> = Vec::new();
    let mut pending: Vec<Field> = Vec::new();

    for token in tokenize(message) {
        match token {
            MessageToken::Text(text) => pending.push(Field::Label { name: None, text }),
            MessageToken::Placeholder(index) => {
                // Indices were bounds-checked when the definition registered.
                let argument = (index as usize)
                    .checked_sub(1)
                    .and_then(|slot| definition.args.get(slot))
                    .ok_or_else(|| {
                        LoadError::InvalidDefinition(format!(
                            "'{}' message references %{} but defines {} args",
                            definition.type_name,
                            index,
                            definition.args.len()
                        ))
                    })?;
                match argument {
                    ArgumentDefinition::InputValue { name } => {
                        let fields = std::mem::take(&mut pending);
                        inputs.push(graph.new_input(InputKind::Value, Some(name.as_str()), fields));
                    }
                    ArgumentDefinition::InputStatement { name } => {
                        let fields = std::mem::take(&mut pending);
                        inputs.push(graph.new_input(
                            InputKind::Statement,
                            Some(name.as_str()),
                            fields,
                        ));
                    }
                    ArgumentDefinition::InputDummy { name } => {
                        let fields = std::mem::take(&mut pending);
                        inputs.push(graph.new_input(InputKind::Dummy, name.as_deref(), fields));
                    }
                    field => pending.push(build_field(field)),
                }
            }
        }
    }
    if !pending.is_empty() {
        inputs.push(graph.new_input(InputKind::Dummy, None, pending));
    }
    Ok(inputs)
}

fn build_field(argument: &ArgumentDefinition) -> Field {
    match argument {
        ArgumentDefinition::FieldLabel { name, text } => Field::Label {
            name: name.clone(),
            text: text.clone(),
        },
        ArgumentDefinition::FieldText { name, text } => Field::Text {
            name: name.clone(),
            value: text.clone(),
        },
        ArgumentDefinition::FieldNumber { name, value } => Field::Number {
            name: name.clone(),
            value: *value,
        },
        ArgumentDefinition::FieldCheckbox { name, checked } => Field::Checkbox {
            name: name.clone(),
            checked: *checked,
        },
        ArgumentDefinition::FieldDropdown { name, options } => Field::Dropdown {
            name: name.clone(),
            options: options
                .iter()
                .map(|(display, value)| DropdownOption {
                    display: display.clone(),
                    value: value.clone(),
                })
                .collect(),
            selected: 0,
        },
        ArgumentDefinition::FieldVariable { name, variable } => Field::Variable {
            name: name.clone(),
            variable: variable.clone().unwrap_or_else(|| "item".to_string()),
        },
        // Input args are flushed by the caller before reaching here.
        ArgumentDefinition::InputValue { .. }
        | ArgumentDefinition::InputStatement { .. }
        | ArgumentDefinition::InputDummy { .. } => unreachable!("input argument handled by caller"),
    }
}
