use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Event, Rsvp};

pub mod memory;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    /// An atomic read-modify-write observed state that no longer matches
    /// what the caller read. The caller decides whether to retry.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence contract for events. The durable engine behind it is an
/// external collaborator; this trait captures the point lookups, filtered
/// lists, transactional field updates and the atomic guest-count update
/// the core needs.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: Event) -> StoreResult<Event>;

    async fn get_event(&self, id: &str) -> StoreResult<Event>;

    /// Non-cancelled public events, newest first.
    async fn list_public_events(&self) -> StoreResult<Vec<Event>>;

    async fn get_events_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Event>>;

    /// Transactional multi-field update, keyed on `event.id`.
    async fn update_event(&self, event: Event) -> StoreResult<Event>;

    /// Compare-and-set on the guest counter. Fails with
    /// `StoreError::Conflict` when the stored count is not `expected`,
    /// so concurrent RSVP mutations serialize on the counter.
    async fn set_guest_count(&self, event_id: &str, expected: u32, new: u32)
        -> StoreResult<Event>;
}

/// Persistence contract for RSVPs.
#[async_trait]
pub trait RsvpStore: Send + Sync {
    async fn create_rsvp(&self, rsvp: Rsvp) -> StoreResult<Rsvp>;

    async fn get_rsvp(&self, id: &str) -> StoreResult<Rsvp>;

    /// The at-most-one RSVP an authenticated user has for an event.
    async fn find_rsvp_by_user_and_event(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> StoreResult<Option<Rsvp>>;

    async fn get_rsvps_by_event(&self, event_id: &str) -> StoreResult<Vec<Rsvp>>;

    async fn get_rsvps_by_user(&self, user_id: &str) -> StoreResult<Vec<Rsvp>>;

    async fn update_rsvp(&self, rsvp: Rsvp) -> StoreResult<Rsvp>;
}
