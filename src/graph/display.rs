use super::BlockGraph;
use std::fmt;

/// Renders a block tree as an indented diagram for debugging.
///
/// Inputs appear under their block with their fields, followed by the
/// connected child (live target, or the shadow default when occupied by
/// nothing else), then the next chain.
pub struct DisplayBlockTree<'a> {
    pub graph: &'a BlockGraph,
    pub root: &'a str,
}

impl fmt::Display for DisplayBlockTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_block(self.root, f, "", true)
    }
}

impl DisplayBlockTree<'_> {
    fn fmt_block(
        &self,
        id: &str,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let marker = if is_last { "└── " } else { "├── " };
        let Some(block) = self.graph.block(id) else {
            return writeln!(f, "{}{}<unknown block \"{}\">", prefix, marker, id);
        };
        writeln!(f, "{}{}{}", prefix, marker, block.describe())?;
        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });

        let next = self.graph.next_block(id).map(|b| b.id().to_string());
        let inputs = block.inputs().to_vec();
        for (index, input_id) in inputs.iter().enumerate() {
            let input_is_last = index + 1 == inputs.len() && next.is_none();
            let marker = if input_is_last { "└── " } else { "├── " };
            let Some(input) = self.graph.input(*input_id) else {
                continue;
            };
            let fields = input
                .fields()
                .iter()
                .map(|field| field.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                f,
                "{}{}{:?} input '{}' [{}]",
                child_prefix,
                marker,
                input.kind(),
                input.name().unwrap_or(""),
                fields
            )?;
            if let Some(conn) = input.connection() {
                let grand_prefix = format!(
                    "{}{}",
                    child_prefix,
                    if input_is_last { "    " } else { "│   " }
                );
                if let Some(child) = self.graph.target_block(conn) {
                    let child_id = child.id().to_string();
                    self.fmt_block(&child_id, f, &grand_prefix, true)?;
                }
            }
        }
        if let Some(next_id) = next {
            self.fmt_block(&next_id, f, &child_prefix, true)?;
        }
        Ok(())
    }
}
