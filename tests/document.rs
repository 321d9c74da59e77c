//! Serialization, loading, deep copy and the binary snapshot.
mod common;
use common::*;
use tsumiki::prelude::*;

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

#[test]
fn test_default_flags_are_not_written() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let id = build(&mut factory, &mut graph, "value_num", "v1");

    let saved = save_block(&graph, &id, WriteOptions::ALL).unwrap();
    assert_eq!(saved.tag, NodeTag::Block);
    assert_eq!(saved.type_name, "value_num");
    assert_eq!(saved.id.as_deref(), Some("v1"));
    // Root block carries its position.
    assert_eq!(saved.x, Some(0.0));
    assert_eq!(saved.y, Some(0.0));
    // All flags at their defaults: absent.
    assert_eq!(saved.collapsed, None);
    assert_eq!(saved.deletable, None);
    assert_eq!(saved.disabled, None);
    assert_eq!(saved.editable, None);
    assert_eq!(saved.movable, None);
    assert_eq!(saved.inline, None);
    assert!(saved.next.is_none());
    assert!(saved.mutation.is_none());

    // The number field is saved with its value.
    assert_eq!(saved.inputs.len(), 1);
    assert_eq!(saved.inputs[0].fields.len(), 1);
    assert_eq!(saved.inputs[0].fields[0].name, "NUM");
    assert_eq!(saved.inputs[0].fields[0].value, "0");
}

#[test]
fn test_non_default_flags_are_written() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let id = build(&mut factory, &mut graph, "stmt", "s1");

    let mut log = ChangeLog::new();
    graph.set_collapsed(&id, true, &mut log).unwrap();
    graph.set_disabled(&id, true, &mut log).unwrap();
    graph.set_deletable(&id, false).unwrap();
    graph.set_editable(&id, false).unwrap();
    graph.set_movable(&id, false).unwrap();
    graph.set_position(&id, 12.0, 34.5).unwrap();

    let saved = save_block(&graph, &id, WriteOptions::ALL).unwrap();
    assert_eq!(saved.collapsed, Some(true));
    assert_eq!(saved.disabled, Some(true));
    assert_eq!(saved.deletable, Some(false));
    assert_eq!(saved.editable, Some(false));
    assert_eq!(saved.movable, Some(false));
    assert_eq!(saved.x, Some(12.0));
    assert_eq!(saved.y, Some(34.5));
}

#[test]
fn test_inline_written_only_when_explicitly_set() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();

    // The pair definition defaults inputsInline to true without marking it
    // explicitly set.
    let pair = build(&mut factory, &mut graph, "pair", "p1");
    assert!(graph.block(&pair).unwrap().inputs_inline());
    let saved = save_block(&graph, &pair, WriteOptions::ALL).unwrap();
    assert_eq!(saved.inline, None);

    // Setting it, even to the same value, makes it explicit.
    let mut log = ChangeLog::new();
    graph.set_inputs_inline(&pair, true, &mut log).unwrap();
    let saved = save_block(&graph, &pair, WriteOptions::ALL).unwrap();
    assert_eq!(saved.inline, Some(true));
    assert!(log.records().is_empty()); // value unchanged, nothing recorded
}

#[test]
fn test_shadow_nodes_suppress_deletable_and_movable() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let shadow = build_shadow(&mut factory, &mut graph, "value_num", "sh");
    graph.set_deletable(&shadow, false).unwrap();
    graph.set_movable(&shadow, false).unwrap();

    let saved = save_block(&graph, &shadow, WriteOptions::ALL).unwrap();
    assert_eq!(saved.tag, NodeTag::Shadow);
    assert_eq!(saved.deletable, None);
    assert_eq!(saved.movable, None);
}

#[test]
fn test_write_options_control_ids_and_children() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let wrapper = build(&mut factory, &mut graph, "wrapper", "w1");
    let value = build(&mut factory, &mut graph, "value_num", "v1");
    graph
        .connect(input_conn(&graph, &wrapper, "CHILD"), output_conn(&graph, &value))
        .unwrap();

    let all = save_block(&graph, &wrapper, WriteOptions::ALL).unwrap();
    assert_eq!(all.id.as_deref(), Some("w1"));
    assert_eq!(
        all.inputs[0].block.as_ref().and_then(|b| b.id.as_deref()),
        Some("v1")
    );
    // Nested blocks never carry a position.
    assert_eq!(all.inputs[0].block.as_ref().unwrap().x, None);

    let without_ids = save_block(&graph, &wrapper, WriteOptions::ALL_WITHOUT_IDS).unwrap();
    assert_eq!(without_ids.id, None);
    assert_eq!(without_ids.inputs[0].block.as_ref().unwrap().id, None);

    let root_only = save_block(&graph, &wrapper, WriteOptions::ROOT_ONLY).unwrap();
    assert!(root_only.inputs.is_empty());
}

#[test]
fn test_next_chain_serializes_under_wrapper() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let s1 = build(&mut factory, &mut graph, "stmt", "s1");
    let s2 = build(&mut factory, &mut graph, "stmt", "s2");
    graph
        .connect(next_conn(&graph, &s1), previous_conn(&graph, &s2))
        .unwrap();

    let saved = save_block(&graph, &s1, WriteOptions::ALL).unwrap();
    let next = saved.next.as_ref().expect("next wrapper present");
    assert_eq!(next.block.as_ref().map(|b| b.type_name.as_str()), Some("stmt"));
    assert_eq!(next.block.as_ref().and_then(|b| b.id.as_deref()), Some("s2"));
    assert!(next.shadow.is_none());
}

#[test]
fn test_load_round_trip_preserves_structure() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let repeat = build(&mut factory, &mut graph, "repeat", "r1");
    let s1 = build(&mut factory, &mut graph, "stmt", "s1");
    let s2 = build(&mut factory, &mut graph, "stmt", "s2");
    let shadow = build_shadow(&mut factory, &mut graph, "stmt", "sh");

    graph
        .field_by_name_mut(&repeat, "TIMES")
        .unwrap()
        .set_from_text("3")
        .unwrap();
    graph
        .connect(input_conn(&graph, &repeat, "DO"), previous_conn(&graph, &s1))
        .unwrap();
    graph
        .connect(next_conn(&graph, &s1), previous_conn(&graph, &s2))
        .unwrap();
    graph
        .connect_or_throw("next", next_conn(&graph, &s2), None, Some(shadow.as_str()))
        .unwrap();

    let saved = save_block(&graph, &repeat, WriteOptions::ALL).unwrap();
    let text = saved.to_json().unwrap();

    // Load the text into a fresh graph.
    let mut reloaded_graph = BlockGraph::new();
    let mut reloaded_factory = test_factory();
    let reparsed = SavedBlock::from_json(&text).unwrap();
    let root = load_block(&mut reloaded_graph, &mut reloaded_factory, &reparsed).unwrap();

    assert_eq!(root, "r1");
    assert_eq!(
        reloaded_graph
            .field_by_name(&root, "TIMES")
            .unwrap()
            .value_text(),
        "3"
    );
    let mut ids = Vec::new();
    reloaded_graph.all_block_ids(&root, &mut ids);
    assert_eq!(
        sorted(ids),
        vec!["r1".to_string(), "s1".to_string(), "s2".to_string(), "sh".to_string()]
    );
    // The shadow survived as both default and live occupant of s2's next.
    let s2_next = next_conn(&reloaded_graph, "s2");
    assert_eq!(reloaded_graph.target_block(s2_next).unwrap().id(), "sh");
    assert_eq!(reloaded_graph.shadow_block(s2_next).unwrap().id(), "sh");
    assert!(reloaded_graph.block("sh").unwrap().is_shadow());
}

#[test]
fn test_deep_copy_is_structurally_equal_with_fresh_ids() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let wrapper = build(&mut factory, &mut graph, "wrapper", "w1");
    let pair = build(&mut factory, &mut graph, "pair", "p1");
    let value = build(&mut factory, &mut graph, "value_num", "v1");
    let shadow = build_shadow(&mut factory, &mut graph, "value_num", "sh");

    graph
        .field_by_name_mut(&value, "NUM")
        .unwrap()
        .set_from_text("7")
        .unwrap();
    graph
        .connect(input_conn(&graph, &wrapper, "CHILD"), output_conn(&graph, &pair))
        .unwrap();
    graph
        .connect(input_conn(&graph, &pair, "A"), output_conn(&graph, &value))
        .unwrap();
    graph
        .connect_or_throw("B", input_conn(&graph, &pair, "B"), None, Some(shadow.as_str()))
        .unwrap();
    let mut log = ChangeLog::new();
    graph.set_collapsed(&wrapper, true, &mut log).unwrap();

    let before_count = graph.block_count();
    let copy = deep_copy(&mut graph, &mut factory, &wrapper).unwrap();

    // Fresh identity, same structure.
    assert_ne!(copy, wrapper);
    assert_eq!(graph.block_count(), before_count * 2);
    assert!(graph.block(&copy).unwrap().is_collapsed());

    let original_text = save_block(&graph, &wrapper, WriteOptions::ALL_WITHOUT_IDS)
        .unwrap()
        .to_json()
        .unwrap();
    let copy_text = save_block(&graph, &copy, WriteOptions::ALL_WITHOUT_IDS)
        .unwrap()
        .to_json()
        .unwrap();
    assert_eq!(original_text, copy_text);
}

#[test]
fn test_copy_connection_duplicates_child_and_shadow() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let source_holder = build(&mut factory, &mut graph, "wrapper", "w1");
    let dest_holder = build(&mut factory, &mut graph, "wrapper", "w2");
    let shadow = build_shadow(&mut factory, &mut graph, "value_num", "sh");

    let source = input_conn(&graph, &source_holder, "CHILD");
    let dest = input_conn(&graph, &dest_holder, "CHILD");
    graph
        .connect_or_throw("CHILD", source, None, Some(shadow.as_str()))
        .unwrap();

    // Shadow is live and default at once: one copy serves both roles.
    copy_connection(&mut graph, &mut factory, source, dest).unwrap();
    let dest_target = graph.target_block(dest).expect("copy connected");
    let dest_shadow = graph.shadow_block(dest).expect("shadow copied");
    assert_eq!(dest_target.id(), dest_shadow.id());
    assert_ne!(dest_target.id(), "sh");
    assert!(dest_target.is_shadow());

    // Mismatched kinds are rejected.
    let stmt = build(&mut factory, &mut graph, "stmt", "s1");
    let stmt_next = next_conn(&graph, &stmt);
    let err = copy_connection(&mut graph, &mut factory, source, stmt_next);
    assert_eq!(err, Err(GraphError::CopyConnectionKind));
}

#[test]
fn test_load_failure_discards_created_blocks() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();

    // The nested child references an input the wrapper does not have.
    let text = r#"{
        "kind": "block",
        "type": "wrapper",
        "id": "w1",
        "inputs": [{
            "name": "NO_SUCH_INPUT",
            "block": { "kind": "block", "type": "value_num", "id": "v1" }
        }]
    }"#;
    let saved = SavedBlock::from_json(text).unwrap();
    let err = load_block(&mut graph, &mut factory, &saved).unwrap_err();
    assert!(matches!(err, LoadError::MissingInput { input, .. } if input == "NO_SUCH_INPUT"));
    assert_eq!(graph.block_count(), 0);
}

#[test]
fn test_load_rejects_unknown_field_and_bad_shadow_tag() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();

    let bad_field = r#"{
        "kind": "block",
        "type": "value_num",
        "inputs": [{ "fields": [{ "name": "NOPE", "value": "1" }] }]
    }"#;
    let saved = SavedBlock::from_json(bad_field).unwrap();
    let err = load_block(&mut graph, &mut factory, &saved).unwrap_err();
    assert!(matches!(err, LoadError::MissingField { field, .. } if field == "NOPE"));

    let bad_shadow = r#"{
        "kind": "block",
        "type": "wrapper",
        "inputs": [{
            "name": "CHILD",
            "shadow": { "kind": "block", "type": "value_num" }
        }]
    }"#;
    let saved = SavedBlock::from_json(bad_shadow).unwrap();
    let err = load_block(&mut graph, &mut factory, &saved).unwrap_err();
    assert!(matches!(err, LoadError::InvalidDefinition(_)));
    assert_eq!(graph.block_count(), 0);
}

#[test]
fn test_load_rejects_duplicate_ids() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    build(&mut factory, &mut graph, "value_num", "v1");

    let saved = SavedBlock::from_json(r#"{ "kind": "block", "type": "value_num", "id": "v1" }"#)
        .unwrap();
    let err = load_block(&mut graph, &mut factory, &saved).unwrap_err();
    assert!(matches!(err, LoadError::DuplicateBlockId(id) if id == "v1"));
}

#[test]
fn test_binary_snapshot_round_trip() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let repeat = build(&mut factory, &mut graph, "repeat", "r1");
    let stmt = build(&mut factory, &mut graph, "stmt", "s1");
    graph
        .connect(input_conn(&graph, &repeat, "DO"), previous_conn(&graph, &stmt))
        .unwrap();

    let saved = save_block(&graph, &repeat, WriteOptions::ALL).unwrap();
    let bytes = saved.to_bytes().unwrap();
    let decoded = SavedBlock::from_bytes(&bytes).unwrap();
    assert_eq!(saved, decoded);

    // The binary snapshot parses back into the same tree as the JSON form.
    let mut reloaded_graph = BlockGraph::new();
    let mut reloaded_factory = test_factory();
    let root = load_block(&mut reloaded_graph, &mut reloaded_factory, &decoded).unwrap();
    assert_eq!(root, "r1");
    assert_eq!(reloaded_graph.block_count(), 2);
}
