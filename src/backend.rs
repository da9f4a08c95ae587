use crate::error::BackendError;
use crate::types::{ReviewRating, Session, SessionCancellation, SessionSlot, SlotInput};
use tokio_stream::wrappers::WatchStream;
use uuid::Uuid;

pub trait SlotBackend: Clone + Send + Sync + 'static {
    fn slot_stream(&self) -> WatchStream<Vec<SessionSlot>>;
    fn slots(&self) -> Vec<SessionSlot>;
    fn slot(&self, id: Uuid) -> Result<SessionSlot, BackendError>;
    fn add_slot(&self, input: SlotInput) -> Result<SessionSlot, BackendError>;
    fn update_slot(&self, id: Uuid, input: SlotInput) -> Result<SessionSlot, BackendError>;
    fn remove_slot(&self, id: Uuid) -> Result<(), BackendError>;
    fn cancellations(&self, slot_id: Uuid) -> Vec<SessionCancellation>;
    fn reviews(&self, slot_id: Uuid) -> Vec<ReviewRating>;
}

/// Read-only view on the sessions slots can be attached to.
#[cfg_attr(test, mockall::automock)]
pub trait SessionDirectory: Send + Sync {
    fn find(&self, id: Uuid) -> Option<Session>;
    fn active(&self) -> Vec<Session>;
    /// Active sessions whose name contains `term`, ignoring case.
    fn search_active(&self, term: &str, limit: usize) -> Vec<Session>;
}
