//! Depth-first serialization of a block tree into the saved-document model.

use super::{NodeTag, SavedBlock, SavedField, SavedInput, SavedNext, WriteOptions};
use crate::block::Block;
use crate::error::GraphError;
use crate::graph::BlockGraph;

/// Writes the tree rooted at `id` into a [`SavedBlock`]. The root carries
/// the position; every nested block omits it.
pub fn save_block(
    graph: &BlockGraph,
    id: &str,
    options: WriteOptions,
) -> Result<SavedBlock, GraphError> {
    let block = graph
        .block(id)
        .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;
    Ok(save_node(graph, block, true, options))
}

fn save_node(graph: &BlockGraph, block: &Block, root: bool, options: WriteOptions) -> SavedBlock {
    let shadow = block.is_shadow();
    let mut saved = SavedBlock {
        tag: if shadow { NodeTag::Shadow } else { NodeTag::Block },
        type_name: block.type_name().to_string(),
        id: options.block_ids.then(|| block.id().to_string()),
        x: root.then(|| block.position().x),
        y: root.then(|| block.position().y),
        collapsed: block.is_collapsed().then_some(true),
        // Shadows are never directly deletable or movable, so the flags
        // would be noise on a shadow node.
        deletable: (!block.is_deletable() && !shadow).then_some(false),
        disabled: block.is_disabled_block().then_some(true),
        editable: (!block.is_editable()).then_some(false),
        movable: (!block.is_movable() && !shadow).then_some(false),
        inline: block
            .inputs_inline_modified()
            .then(|| block.inputs_inline()),
        inputs: Vec::new(),
        next: None,
        mutation: block.mutator().and_then(|m| m.save()),
    };

    for input_id in block.inputs() {
        let Some(input) = graph.input(*input_id) else {
            continue;
        };
        let fields: Vec<SavedField> = input
            .fields()
            .iter()
            .filter(|field| field.is_serializable())
            .filter_map(|field| {
                field.name().map(|name| SavedField {
                    name: name.to_string(),
                    value: field.value_text(),
                })
            })
            .collect();

        let mut child = None;
        let mut shadow_child = None;
        if options.child_blocks
            && let Some(conn) = input.connection()
        {
            let target = graph.target_block(conn);
            let shadow_target = graph.shadow_block(conn);
            child = target
                .filter(|b| !b.is_shadow())
                .map(|b| Box::new(save_node(graph, b, false, options)));
            shadow_child = shadow_target
                .or(target.filter(|b| b.is_shadow()))
                .map(|b| Box::new(save_node(graph, b, false, options)));
        }

        if fields.is_empty() && child.is_none() && shadow_child.is_none() {
            continue;
        }
        saved.inputs.push(SavedInput {
            name: input.name().map(str::to_string),
            fields,
            block: child,
            shadow: shadow_child,
        });
    }

    if options.child_blocks
        && let Some(conn) = block.next_connection()
    {
        let target = graph.target_block(conn);
        let shadow_target = graph.shadow_block(conn);
        let next_block = target
            .filter(|b| !b.is_shadow())
            .map(|b| save_node(graph, b, false, options));
        let next_shadow = shadow_target
            .or(target.filter(|b| b.is_shadow()))
            .map(|b| save_node(graph, b, false, options));
        if next_block.is_some() || next_shadow.is_some() {
            saved.next = Some(Box::new(SavedNext {
                block: next_block,
                shadow: next_shadow,
            }));
        }
    }

    saved
}
