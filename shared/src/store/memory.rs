//! In-memory store implementation. Reference implementation of the
//! persistence contract and the store every test suite runs against; a
//! durable engine replaces it in production deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Event, Rsvp};
use crate::store::{EventStore, RsvpStore, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let mut events = self.events.write().await;
        events.insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: &str) -> StoreResult<Event> {
        let events = self.events.read().await;
        events
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Event not found".to_string()))
    }

    async fn list_public_events(&self) -> StoreResult<Vec<Event>> {
        let events = self.events.read().await;
        let mut public: Vec<Event> = events
            .values()
            .filter(|e| !e.cancelled && e.visibility == crate::models::Visibility::Public)
            .cloned()
            .collect();
        public.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(public)
    }

    async fn get_events_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Event>> {
        let events = self.events.read().await;
        let mut owned: Vec<Event> = events
            .values()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(owned)
    }

    async fn update_event(&self, event: Event) -> StoreResult<Event> {
        let mut events = self.events.write().await;
        match events.get_mut(&event.id) {
            Some(stored) => {
                *stored = event.clone();
                Ok(event)
            }
            None => Err(StoreError::NotFound("Event not found".to_string())),
        }
    }

    async fn set_guest_count(
        &self,
        event_id: &str,
        expected: u32,
        new: u32,
    ) -> StoreResult<Event> {
        // Compare-and-set under the write lock: the read of the current
        // counter and the write are indivisible.
        let mut events = self.events.write().await;
        let stored = events
            .get_mut(event_id)
            .ok_or_else(|| StoreError::NotFound("Event not found".to_string()))?;

        if stored.guest_count != expected {
            return Err(StoreError::Conflict(format!(
                "Guest count changed concurrently for event {}",
                event_id
            )));
        }

        stored.guest_count = new;
        Ok(stored.clone())
    }
}

#[derive(Default)]
pub struct MemoryRsvpStore {
    rsvps: RwLock<HashMap<String, Rsvp>>,
}

impl MemoryRsvpStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RsvpStore for MemoryRsvpStore {
    async fn create_rsvp(&self, rsvp: Rsvp) -> StoreResult<Rsvp> {
        let mut rsvps = self.rsvps.write().await;
        rsvps.insert(rsvp.id.clone(), rsvp.clone());
        Ok(rsvp)
    }

    async fn get_rsvp(&self, id: &str) -> StoreResult<Rsvp> {
        let rsvps = self.rsvps.read().await;
        rsvps
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Rsvp not found".to_string()))
    }

    async fn find_rsvp_by_user_and_event(
        &self,
        user_id: &str,
        event_id: &str,
    ) -> StoreResult<Option<Rsvp>> {
        let rsvps = self.rsvps.read().await;
        Ok(rsvps
            .values()
            .find(|r| r.user_id.as_deref() == Some(user_id) && r.event_id == event_id)
            .cloned())
    }

    async fn get_rsvps_by_event(&self, event_id: &str) -> StoreResult<Vec<Rsvp>> {
        let rsvps = self.rsvps.read().await;
        let mut matching: Vec<Rsvp> = rsvps
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn get_rsvps_by_user(&self, user_id: &str) -> StoreResult<Vec<Rsvp>> {
        let rsvps = self.rsvps.read().await;
        let mut matching: Vec<Rsvp> = rsvps
            .values()
            .filter(|r| r.user_id.as_deref() == Some(user_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn update_rsvp(&self, rsvp: Rsvp) -> StoreResult<Rsvp> {
        let mut rsvps = self.rsvps.write().await;
        match rsvps.get_mut(&rsvp.id) {
            Some(stored) => {
                *stored = rsvp.clone();
                Ok(rsvp)
            }
            None => Err(StoreError::NotFound("Rsvp not found".to_string())),
        }
    }
}
