use std::fmt;

/// Opaque handle to a [`Connection`] in a graph's connection arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

/// Closed set of connection kinds. `Output` and `Previous` point upward
/// toward a parent; `Input` and `Next` point downward toward children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    Output,
    Previous,
    Next,
    Input,
}

impl ConnectionKind {
    /// Whether two connections of these kinds may be joined. Output pairs
    /// only with Input, Previous only with Next.
    pub fn pairs_with(self, other: ConnectionKind) -> bool {
        matches!(
            (self, other),
            (ConnectionKind::Output, ConnectionKind::Input)
                | (ConnectionKind::Input, ConnectionKind::Output)
                | (ConnectionKind::Previous, ConnectionKind::Next)
                | (ConnectionKind::Next, ConnectionKind::Previous)
        )
    }

    /// Whether this side of a pairing points up toward the parent block.
    pub fn is_upward(self) -> bool {
        matches!(self, ConnectionKind::Output | ConnectionKind::Previous)
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionKind::Output => "output",
            ConnectionKind::Previous => "previous",
            ConnectionKind::Next => "next",
            ConnectionKind::Input => "input",
        };
        write!(f, "{}", name)
    }
}

/// A typed attachment point owned by exactly one block.
///
/// The live target and the shadow target are both non-owning handles into the
/// arena. The shadow target records the slot's default block; it takes over
/// as the live connection whenever no real child occupies the slot.
#[derive(Debug)]
pub struct Connection {
    pub(crate) id: ConnectionId,
    pub(crate) kind: ConnectionKind,
    pub(crate) owner: Option<String>,
    pub(crate) target: Option<ConnectionId>,
    pub(crate) shadow_target: Option<ConnectionId>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn kind(&self) -> ConnectionKind {
        self.kind
    }

    /// Id of the block this connection belongs to. Assigned when a reshape
    /// installs the connection on a block.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn target(&self) -> Option<ConnectionId> {
        self.target
    }

    pub fn shadow_target(&self) -> Option<ConnectionId> {
        self.shadow_target
    }

    /// True iff a live target exists.
    pub fn is_connected(&self) -> bool {
        self.target.is_some()
    }
}
