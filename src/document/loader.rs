//! Rebuilding block trees from saved documents, and the copy operations
//! defined on top of that round trip.

use super::{NodeTag, SavedBlock, WriteOptions, writer::save_block};
use crate::block::{Block, ConnectionId, ConnectionKind};
use crate::error::{GraphError, LoadError};
use crate::event::DiscardChanges;
use crate::factory::{BlockFactory, BlockTemplate};
use crate::graph::BlockGraph;
use tracing::debug;

/// Loads a saved tree into the graph, returning the root block's id.
///
/// Blocks whose saved node has no id get a factory-generated one. On any
/// failure every block created by this call is discarded, so a bad document
/// cannot leave half a tree behind.
pub fn load_block(
    graph: &mut BlockGraph,
    factory: &mut BlockFactory,
    saved: &SavedBlock,
) -> Result<String, LoadError> {
    let mut created = Vec::new();
    match load_node(graph, factory, saved, &mut created) {
        Ok(id) => Ok(id),
        Err(error) => {
            for id in created.iter().rev() {
                graph.discard_block(id);
            }
            Err(error)
        }
    }
}

fn load_node(
    graph: &mut BlockGraph,
    factory: &mut BlockFactory,
    saved: &SavedBlock,
    created: &mut Vec<String>,
) -> Result<String, LoadError> {
    let mut template =
        BlockTemplate::of_type(&saved.type_name).shadow(saved.tag == NodeTag::Shadow);
    if let Some(id) = &saved.id {
        template = template.with_id(id);
    }
    let id = factory.obtain_block(graph, template)?;
    created.push(id.clone());

    if let (Some(x), Some(y)) = (saved.x, saved.y) {
        graph.set_position(&id, x, y)?;
    }
    let mut scope = DiscardChanges;
    if let Some(collapsed) = saved.collapsed {
        graph.set_collapsed(&id, collapsed, &mut scope)?;
    }
    if let Some(deletable) = saved.deletable {
        graph.set_deletable(&id, deletable)?;
    }
    if let Some(disabled) = saved.disabled {
        graph.set_disabled(&id, disabled, &mut scope)?;
    }
    if let Some(editable) = saved.editable {
        graph.set_editable(&id, editable)?;
    }
    if let Some(movable) = saved.movable {
        graph.set_movable(&id, movable)?;
    }
    if let Some(inline) = saved.inline {
        graph.set_inputs_inline(&id, inline, &mut scope)?;
    }

    for saved_input in &saved.inputs {
        for field in &saved_input.fields {
            match graph.field_by_name_mut(&id, &field.name) {
                Some(target) => {
                    target
                        .set_from_text(&field.value)
                        .map_err(|message| LoadError::FieldValue {
                            field: field.name.clone(),
                            value: field.value.clone(),
                            message,
                        })?;
                }
                None => {
                    return Err(LoadError::MissingField {
                        field: field.name.clone(),
                        description: graph.describe(&id),
                    });
                }
            }
        }

        if saved_input.block.is_none() && saved_input.shadow.is_none() {
            continue;
        }
        let input_name = saved_input.name.clone().unwrap_or_default();
        let conn = saved_input
            .name
            .as_deref()
            .and_then(|name| graph.input_by_name(&id, name))
            .ok_or_else(|| LoadError::MissingInput {
                input: input_name.clone(),
                description: graph.describe(&id),
            })
            .and_then(|input_id| {
                graph
                    .input(input_id)
                    .and_then(|input| input.connection())
                    .ok_or_else(|| {
                        LoadError::InvalidDefinition(format!(
                            "input '{}' on {} cannot hold a child block",
                            input_name,
                            graph.describe(&id)
                        ))
                    })
            })?;

        let child_id = match &saved_input.block {
            Some(child) => Some(load_node(graph, factory, child, created)?),
            None => None,
        };
        let shadow_id = match &saved_input.shadow {
            Some(shadow) => {
                require_shadow_tag(shadow, &input_name)?;
                Some(load_node(graph, factory, shadow, created)?)
            }
            None => None,
        };
        graph.connect_or_throw(&input_name, conn, child_id.as_deref(), shadow_id.as_deref())?;
    }

    if let Some(next) = &saved.next {
        let conn = graph
            .block(&id)
            .and_then(Block::next_connection)
            .ok_or_else(|| {
                LoadError::InvalidDefinition(format!(
                    "{} has a next child but no next connection",
                    graph.describe(&id)
                ))
            })?;
        let child_id = match &next.block {
            Some(child) => Some(load_node(graph, factory, child, created)?),
            None => None,
        };
        let shadow_id = match &next.shadow {
            Some(shadow) => {
                require_shadow_tag(shadow, "next")?;
                Some(load_node(graph, factory, shadow, created)?)
            }
            None => None,
        };
        graph.connect_or_throw("next", conn, child_id.as_deref(), shadow_id.as_deref())?;
    }

    if let Some(state) = &saved.mutation {
        match graph.take_mutator(&id) {
            Some(mut mutator) => {
                let result = mutator.update_from_saved(graph, &id, state);
                graph.restore_mutator(&id, mutator);
                result?;
            }
            None => {
                return Err(LoadError::InvalidDefinition(format!(
                    "{} carries mutation data but has no mutator",
                    graph.describe(&id)
                )));
            }
        }
    }

    Ok(id)
}

fn require_shadow_tag(saved: &SavedBlock, tag: &str) -> Result<(), LoadError> {
    if saved.tag != NodeTag::Shadow {
        return Err(LoadError::InvalidDefinition(format!(
            "the '{}' shadow slot holds a non-shadow node of type '{}'",
            tag, saved.type_name
        )));
    }
    Ok(())
}

/// Copies the tree rooted at `id` by serializing it without ids and loading
/// the reparsed text back through the factory.
///
/// The copy is structurally equal to the original but carries fresh ids. Any
/// failure along the round trip indicates a defect in the serialization
/// pipeline itself and surfaces as [`GraphError::CopyRoundTrip`]; a partial
/// copy is never left behind.
pub fn deep_copy(
    graph: &mut BlockGraph,
    factory: &mut BlockFactory,
    id: &str,
) -> Result<String, GraphError> {
    let saved = save_block(graph, id, WriteOptions::ALL_WITHOUT_IDS)?;
    let text = saved
        .to_json()
        .map_err(|e| GraphError::CopyRoundTrip(e.to_string()))?;
    let reparsed =
        SavedBlock::from_json(&text).map_err(|e| GraphError::CopyRoundTrip(e.to_string()))?;
    let copy = load_block(graph, factory, &reparsed)
        .map_err(|e| GraphError::CopyRoundTrip(e.to_string()))?;
    debug!(source = %id, copy = %copy, "deep-copied block tree");
    Ok(copy)
}

/// Duplicates whatever is attached to `source` (live child and/or shadow)
/// onto `dest`. Both connections must be of the same kind, and that kind
/// must be next or input (the downward, child-holding kinds). When the live
/// child is the shadow itself, one copy serves both roles.
pub fn copy_connection(
    graph: &mut BlockGraph,
    factory: &mut BlockFactory,
    source: ConnectionId,
    dest: ConnectionId,
) -> Result<(), GraphError> {
    let source_kind = graph
        .connection(source)
        .ok_or(GraphError::UnknownConnection)?
        .kind();
    let dest_kind = graph
        .connection(dest)
        .ok_or(GraphError::UnknownConnection)?
        .kind();
    if source_kind != dest_kind
        || !matches!(source_kind, ConnectionKind::Next | ConnectionKind::Input)
    {
        return Err(GraphError::CopyConnectionKind);
    }

    let shadow_id = graph.shadow_block(source).map(|b| b.id().to_string());
    let target_id = graph.target_block(source).map(|b| b.id().to_string());

    let mut copy_id: Option<String> = None;
    if let Some(shadow) = &shadow_id {
        let copy = deep_copy(graph, factory, shadow)?;
        let up = copy_upward_connection(graph, &copy, dest_kind)?;
        graph.set_shadow_connection(dest, Some(up))?;
        copy_id = Some(copy);
    }

    if let Some(target) = &target_id {
        if shadow_id.as_ref() != Some(target) {
            copy_id = Some(deep_copy(graph, factory, target)?);
        }
        if let Some(copy) = &copy_id {
            let up = copy_upward_connection(graph, copy, dest_kind)?;
            graph.connect(dest, up)?;
        }
    }
    Ok(())
}

fn copy_upward_connection(
    graph: &BlockGraph,
    id: &str,
    dest_kind: ConnectionKind,
) -> Result<ConnectionId, GraphError> {
    let block = graph
        .block(id)
        .ok_or_else(|| GraphError::UnknownBlock(id.to_string()))?;
    let up = match dest_kind {
        ConnectionKind::Next => block.previous_connection(),
        _ => block.output_connection(),
    };
    up.ok_or_else(|| GraphError::NoUpwardConnection(block.describe()))
}
