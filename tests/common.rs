//! Common test utilities for building block definitions and trees.
use tsumiki::prelude::*;

/// Definitions covering the shapes the tests need: statement blocks, value
/// blocks, a single-value-input wrapper, a two-input pair, a variable field
/// holder and a statement container.
pub const TEST_DEFINITIONS: &str = r#"[
    {
        "type": "stmt",
        "message": "step %1",
        "previousStatement": true,
        "nextStatement": true,
        "args": [{ "kind": "field_text", "name": "NAME", "text": "x" }]
    },
    {
        "type": "value_num",
        "message": "%1",
        "output": true,
        "args": [{ "kind": "field_number", "name": "NUM", "value": 0.0 }]
    },
    {
        "type": "wrapper",
        "message": "wrap %1",
        "output": true,
        "args": [{ "kind": "input_value", "name": "CHILD" }]
    },
    {
        "type": "pair",
        "message": "%1 %2",
        "output": true,
        "inputsInline": true,
        "args": [
            { "kind": "input_value", "name": "A" },
            { "kind": "input_value", "name": "B" }
        ]
    },
    {
        "type": "var_value",
        "message": "get %1",
        "output": true,
        "args": [{ "kind": "field_variable", "name": "VAR", "variable": "item" }]
    },
    {
        "type": "repeat",
        "message": "repeat %1 times %2",
        "previousStatement": true,
        "nextStatement": true,
        "args": [
            { "kind": "field_number", "name": "TIMES", "value": 10 },
            { "kind": "input_statement", "name": "DO" }
        ]
    }
]"#;

#[allow(dead_code)]
pub fn test_factory() -> BlockFactory {
    let mut factory = BlockFactory::new();
    factory
        .define_from_json(TEST_DEFINITIONS)
        .expect("test definitions are valid");
    factory
}

/// Builds one block with an explicit id.
#[allow(dead_code)]
pub fn build(
    factory: &mut BlockFactory,
    graph: &mut BlockGraph,
    type_name: &str,
    id: &str,
) -> String {
    factory
        .obtain_block(graph, BlockTemplate::of_type(type_name).with_id(id))
        .expect("block builds")
}

/// Builds one shadow block with an explicit id.
#[allow(dead_code)]
pub fn build_shadow(
    factory: &mut BlockFactory,
    graph: &mut BlockGraph,
    type_name: &str,
    id: &str,
) -> String {
    factory
        .obtain_block(graph, BlockTemplate::of_type(type_name).with_id(id).shadow(true))
        .expect("shadow block builds")
}

/// The child connection of a named input.
#[allow(dead_code)]
pub fn input_conn(graph: &BlockGraph, id: &str, name: &str) -> ConnectionId {
    let input = graph.input_by_name(id, name).expect("input exists");
    graph
        .input(input)
        .and_then(|input| input.connection())
        .expect("input has a connection")
}

#[allow(dead_code)]
pub fn output_conn(graph: &BlockGraph, id: &str) -> ConnectionId {
    graph
        .block(id)
        .and_then(|block| block.output_connection())
        .expect("block has an output connection")
}

#[allow(dead_code)]
pub fn previous_conn(graph: &BlockGraph, id: &str) -> ConnectionId {
    graph
        .block(id)
        .and_then(|block| block.previous_connection())
        .expect("block has a previous connection")
}

#[allow(dead_code)]
pub fn next_conn(graph: &BlockGraph, id: &str) -> ConnectionId {
    graph
        .block(id)
        .and_then(|block| block.next_connection())
        .expect("block has a next connection")
}

/// A mutator that can add an ELSE statement input to a `repeat` block, with
/// its state round-tripping through the `mutation` sub-tree.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct ElseMutator {
    pub has_else: bool,
}

impl ElseMutator {
    fn apply_shape(&self, graph: &mut BlockGraph, block_id: &str) -> std::result::Result<(), GraphError> {
        let block = graph
            .block(block_id)
            .ok_or_else(|| GraphError::UnknownBlock(block_id.to_string()))?;
        let mut inputs = block.inputs().to_vec();
        let output = block.output_connection();
        let previous = block.previous_connection();
        let next = block.next_connection();

        let existing_else = graph.input_by_name(block_id, "ELSE");
        match (self.has_else, existing_else) {
            (true, None) => {
                let else_input = graph.new_input(InputKind::Statement, Some("ELSE"), Vec::new());
                inputs.push(else_input);
                graph.reshape(block_id, inputs, output, previous, next)
            }
            (false, Some(else_input)) => {
                inputs.retain(|input| *input != else_input);
                graph.reshape(block_id, inputs, output, previous, next)
            }
            _ => Ok(()),
        }
    }
}

impl Mutator for ElseMutator {
    fn on_attached(&mut self, graph: &mut BlockGraph, block_id: &str) -> std::result::Result<(), LoadError> {
        self.apply_shape(graph, block_id)?;
        Ok(())
    }

    fn update_from_saved(
        &mut self,
        graph: &mut BlockGraph,
        block_id: &str,
        state: &serde_json::Value,
    ) -> std::result::Result<(), LoadError> {
        self.has_else = state
            .get("hasElse")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        self.apply_shape(graph, block_id)?;
        Ok(())
    }

    fn save(&self) -> Option<serde_json::Value> {
        self.has_else
            .then(|| serde_json::json!({ "hasElse": true }))
    }
}

/// Registers the else mutator and a definition of `repeat_else` that uses it.
#[allow(dead_code)]
pub fn factory_with_mutator() -> BlockFactory {
    let mut factory = test_factory();
    factory.register_mutator("else_mutator", Box::new(|| Box::new(ElseMutator::default())));
    factory
        .define_from_json(
            r#"{
                "type": "repeat_else",
                "message": "repeat %1 times %2",
                "previousStatement": true,
                "nextStatement": true,
                "mutator": "else_mutator",
                "args": [
                    { "kind": "field_number", "name": "TIMES", "value": 10 },
                    { "kind": "input_statement", "name": "DO" }
                ]
            }"#,
        )
        .expect("mutator definition is valid");
    factory
}
