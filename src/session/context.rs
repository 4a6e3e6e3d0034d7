/// Explicit sync bookkeeping owned by a session.
///
/// Holds the pending-request flag and the last document revision seen by polling. Requests are
/// only recorded between [`SyncContext::init`] and [`SyncContext::clear`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncContext {
    active: bool,
    pending: bool,
    last_revision: Option<u64>,
}

impl SyncContext {
    /// Start a fresh lifecycle with no pending request and no revision seen.
    pub fn init(&mut self) {
        *self = Self {
            active: true,
            ..Self::default()
        };
    }

    /// End the lifecycle; later requests are ignored until the next `init`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Return `true` between `init` and `clear`.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Ask for a sync on the next tick.
    pub fn request(&mut self) {
        if self.active {
            self.pending = true;
        }
    }

    /// Return `true` when a sync has been requested and not yet taken.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending request.
    pub fn take_request(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Record a polled document revision; a new value requests a sync.
    ///
    /// Returns `true` when the revision differs from the last one seen.
    pub fn observe_revision(&mut self, revision: u64) -> bool {
        if !self.active || self.last_revision == Some(revision) {
            return false;
        }
        self.last_revision = Some(revision);
        self.pending = true;
        true
    }

    /// Last revision recorded by [`SyncContext::observe_revision`].
    pub fn last_revision(&self) -> Option<u64> {
        self.last_revision
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/context.rs"]
mod tests;
