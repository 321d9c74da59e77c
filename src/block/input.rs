use super::connection::ConnectionId;
use super::field::Field;

/// Opaque handle to an [`Input`] in a graph's input arena.
///
/// Reshape diffs old and new input lists by handle identity, never by
/// structure: two structurally identical inputs are still distinct slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputId(pub(crate) u64);

/// Closed set of input kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Holds one value block via an `Input`-kind connection.
    Value,
    /// Holds a statement stack via a `Next`-kind connection.
    Statement,
    /// Holds only fields; no child connection.
    Dummy,
}

/// A named slot on a block: zero-or-one child connection plus an ordered run
/// of fields. Owned by the graph arena; blocks reference inputs by handle so
/// a mutator can detach an input during one reshape and re-add it in a later
/// one.
#[derive(Debug)]
pub struct Input {
    pub(crate) id: InputId,
    pub(crate) kind: InputKind,
    pub(crate) name: Option<String>,
    pub(crate) owner: Option<String>,
    pub(crate) connection: Option<ConnectionId>,
    pub(crate) fields: Vec<Field>,
}

impl Input {
    pub fn id(&self) -> InputId {
        self.id
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Id of the block currently holding this input, if any.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// The input's child connection. Present iff the kind is not `Dummy`.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// First field with the given name, compared case-insensitively.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn field_by_name_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields
            .iter_mut()
            .find(|f| f.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn contains_variable_field(&self) -> bool {
        self.fields.iter().any(Field::is_variable)
    }
}
