#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Import,
    Load,
    Save,
    Clear,
}

/// Handed out when a gateway request starts and returned with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub kind: RequestKind,
    pub generation: u64,
}

/// Monotonic generation counter. Only the most recently issued request may
/// apply its response; anything older is stale.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    issued: u64,
}

impl RequestTracker {
    pub fn begin(&mut self, kind: RequestKind) -> RequestTicket {
        self.issued += 1;
        RequestTicket {
            kind,
            generation: self.issued,
        }
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.generation == self.issued
    }

    pub fn latest(&self) -> u64 {
        self.issued
    }
}

/// Result of handing a response back to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<T> {
    Current(T),
    /// A newer request was issued meanwhile; the response was dropped.
    Stale,
}

impl<T> Applied<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Applied::Stale)
    }

    pub fn current(self) -> Option<T> {
        match self {
            Applied::Current(value) => Some(value),
            Applied::Stale => None,
        }
    }
}
