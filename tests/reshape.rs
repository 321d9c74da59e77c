//! Reshape: atomic shape replacement and its validation rules.
mod common;
use common::*;
use tsumiki::prelude::*;

/// Snapshot of the parts of a block's shape that reshape may touch.
fn shape_of(graph: &BlockGraph, id: &str) -> (Vec<InputId>, Vec<ConnectionId>) {
    let block = graph.block(id).unwrap();
    (block.inputs().to_vec(), block.all_connections().to_vec())
}

#[test]
fn test_reshape_keeps_retained_inputs_connected() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let pair = build(&mut factory, &mut graph, "pair", "p1");
    let value = build(&mut factory, &mut graph, "value_num", "v1");

    let slot_a = input_conn(&graph, &pair, "A");
    graph.connect(slot_a, output_conn(&graph, &value)).unwrap();

    // Append a third input, keeping A and B.
    let block = graph.block(&pair).unwrap();
    let mut inputs = block.inputs().to_vec();
    let output = block.output_connection();
    let extra = graph.new_input(InputKind::Value, Some("C"), Vec::new());
    inputs.push(extra);
    graph.reshape(&pair, inputs.clone(), output, None, None).unwrap();

    // The retained input still holds its connection and child.
    assert_eq!(input_conn(&graph, &pair, "A"), slot_a);
    assert_eq!(graph.target_block(slot_a).unwrap().id(), "v1");
    assert_eq!(graph.parent_block(&value).unwrap().id(), "p1");

    // The flat list is inputs' connections in order, then the output.
    let expected: Vec<ConnectionId> = vec![
        input_conn(&graph, &pair, "A"),
        input_conn(&graph, &pair, "B"),
        input_conn(&graph, &pair, "C"),
        output_conn(&graph, &pair),
    ];
    assert_eq!(graph.block(&pair).unwrap().all_connections(), expected.as_slice());
}

#[test]
fn test_reshape_rejects_removing_connected_input() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let pair = build(&mut factory, &mut graph, "pair", "p1");
    let value = build(&mut factory, &mut graph, "value_num", "v1");

    graph
        .connect(input_conn(&graph, &pair, "A"), output_conn(&graph, &value))
        .unwrap();
    let before = shape_of(&graph, &pair);

    let block = graph.block(&pair).unwrap();
    let input_a = graph.input_by_name(&pair, "A").unwrap();
    let keep: Vec<InputId> = block
        .inputs()
        .iter()
        .copied()
        .filter(|input| *input != input_a)
        .collect();
    let output = block.output_connection();

    let result = graph.reshape(&pair, keep, output, None, None);
    assert!(matches!(result, Err(GraphError::RemoveConnectedInput { name }) if name == "A"));
    // No mutation happened.
    assert_eq!(shape_of(&graph, &pair), before);
    assert_eq!(graph.target_block(input_conn(&graph, &pair, "A")).unwrap().id(), "v1");
}

#[test]
fn test_reshape_rejects_adding_connected_input() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let pair = build(&mut factory, &mut graph, "pair", "p1");
    let value = build(&mut factory, &mut graph, "value_num", "v1");
    let donor = build(&mut factory, &mut graph, "wrapper", "w1");

    // Detach the donor's input while it still holds a child.
    graph
        .connect(input_conn(&graph, &donor, "CHILD"), output_conn(&graph, &value))
        .unwrap();
    let stolen = graph.input_by_name(&donor, "CHILD").unwrap();

    let before = shape_of(&graph, &pair);
    let block = graph.block(&pair).unwrap();
    let mut inputs = block.inputs().to_vec();
    let output = block.output_connection();
    inputs.push(stolen);

    let result = graph.reshape(&pair, inputs, output, None, None);
    assert!(matches!(result, Err(GraphError::AddConnectedInput { name }) if name == "CHILD"));
    assert_eq!(shape_of(&graph, &pair), before);
}

#[test]
fn test_reshape_rejects_mismatched_slot_kinds() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let stmt = build(&mut factory, &mut graph, "stmt", "s1");

    let block = graph.block(&stmt).unwrap();
    let inputs = block.inputs().to_vec();
    let previous = block.previous_connection();
    let next = block.next_connection();

    // A previous-kind connection offered as the next slot.
    let wrong = graph.new_connection(ConnectionKind::Previous);
    let result = graph.reshape(&stmt, inputs.clone(), None, previous, Some(wrong));
    assert!(matches!(
        result,
        Err(GraphError::SlotKindMismatch { slot: "next", .. })
    ));

    // Both upward slots at once.
    let output = graph.new_connection(ConnectionKind::Output);
    let result = graph.reshape(&stmt, inputs, Some(output), previous, next);
    assert_eq!(result, Err(GraphError::OutputAndPrevious));
}

#[test]
fn test_reshape_rejects_duplicate_inputs() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let pair = build(&mut factory, &mut graph, "pair", "p1");

    let block = graph.block(&pair).unwrap();
    let output = block.output_connection();
    let input_a = graph.input_by_name(&pair, "A").unwrap();
    let doubled = vec![input_a, input_a];

    let result = graph.reshape(&pair, doubled, output, None, None);
    assert!(matches!(result, Err(GraphError::DuplicateInput { name }) if name == "A"));
}

#[test]
fn test_reshape_rejects_dropping_connected_slot() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let s1 = build(&mut factory, &mut graph, "stmt", "s1");
    let s2 = build(&mut factory, &mut graph, "stmt", "s2");

    graph
        .connect(next_conn(&graph, &s1), previous_conn(&graph, &s2))
        .unwrap();

    let block = graph.block(&s1).unwrap();
    let inputs = block.inputs().to_vec();
    let previous = block.previous_connection();

    // Dropping the live next connection must fail.
    let result = graph.reshape(&s1, inputs.clone(), None, previous, None);
    assert!(matches!(
        result,
        Err(GraphError::ReplaceConnectedSlot { slot: "next" })
    ));
    // Reusing it is fine.
    let next = graph.block(&s1).unwrap().next_connection();
    graph.reshape(&s1, inputs, None, previous, next).unwrap();
    assert_eq!(graph.next_block(&s1).unwrap().id(), "s2");
}

#[test]
fn test_reshape_clears_input_list() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let pair = build(&mut factory, &mut graph, "pair", "p1");

    let output = graph.block(&pair).unwrap().output_connection();
    graph.reshape(&pair, Vec::new(), output, None, None).unwrap();

    let block = graph.block(&pair).unwrap();
    assert!(!block.has_inputs());
    assert_eq!(block.all_connections(), &[output.unwrap()]);
}

#[test]
fn test_reshape_notifies_structure_observers() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let pair = build(&mut factory, &mut graph, "pair", "p1");

    use std::cell::RefCell;
    use std::rc::Rc;
    let seen: Rc<RefCell<Vec<UpdateMask>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    graph
        .subscribe(&pair, Box::new(move |_, mask| sink.borrow_mut().push(mask)))
        .unwrap();

    let block = graph.block(&pair).unwrap();
    let inputs = block.inputs().to_vec();
    let output = block.output_connection();
    graph.reshape(&pair, inputs, output, None, None).unwrap();

    assert_eq!(*seen.borrow(), vec![UpdateMask::INPUTS_FIELDS_CONNECTIONS]);
}

#[test]
fn test_detached_input_can_be_readded_later() {
    let mut graph = BlockGraph::new();
    let mut factory = test_factory();
    let pair = build(&mut factory, &mut graph, "pair", "p1");

    let block = graph.block(&pair).unwrap();
    let output = block.output_connection();
    let input_b = graph.input_by_name(&pair, "B").unwrap();
    let without_b: Vec<InputId> = graph
        .block(&pair)
        .unwrap()
        .inputs()
        .iter()
        .copied()
        .filter(|input| *input != input_b)
        .collect();

    graph.reshape(&pair, without_b.clone(), output, None, None).unwrap();
    assert!(graph.input_by_name(&pair, "B").is_none());
    assert_eq!(graph.input(input_b).unwrap().owner(), None);

    // A mutator holding the handle may bring the input back.
    let mut restored = without_b;
    restored.push(input_b);
    graph.reshape(&pair, restored, output, None, None).unwrap();
    assert!(graph.input_by_name(&pair, "B").is_some());
    assert_eq!(graph.input(input_b).unwrap().owner(), Some("p1"));
}
