//! Event lifecycle operations: reads, creation, updates and
//! cancellation, including the trigger arming and synchronous notices
//! that accompany each commit.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{error, info};
use uuid::Uuid;

use willbethere_shared::clock::Clock;
use willbethere_shared::error::{AppError, Result};
use willbethere_shared::identity::IdentityService;
use willbethere_shared::mailer::Mailer;
use willbethere_shared::models::Event;
use willbethere_shared::store::{EventStore, RsvpStore};

use crate::models::{CreateEventRequest, OptionalField, UpdateEventRequest};
use crate::notify;
use crate::scheduler::{SchedulerHandle, Trigger, TriggerKind};
use crate::validation;

/// When to remind attendees of an upcoming event: a week ahead when the
/// event is more than a week out, a day ahead when it is more than a day
/// out, not at all otherwise.
pub fn reminder_fire_at(date: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lead = date - now;
    if lead > Duration::days(7) {
        Some(date - Duration::days(7))
    } else if lead > Duration::days(1) {
        Some(date - Duration::days(1))
    } else {
        None
    }
}

pub struct EventsService<ES, RS> {
    events: Arc<ES>,
    rsvps: Arc<RS>,
    mailer: Arc<dyn Mailer>,
    identity: Arc<dyn IdentityService>,
    clock: Arc<dyn Clock>,
    scheduler: SchedulerHandle,
}

impl<ES, RS> EventsService<ES, RS>
where
    ES: EventStore,
    RS: RsvpStore,
{
    pub fn new(
        events: Arc<ES>,
        rsvps: Arc<RS>,
        mailer: Arc<dyn Mailer>,
        identity: Arc<dyn IdentityService>,
        clock: Arc<dyn Clock>,
        scheduler: SchedulerHandle,
    ) -> Self {
        Self {
            events,
            rsvps,
            mailer,
            identity,
            clock,
            scheduler,
        }
    }

    /// Public listing: non-cancelled public events, newest first.
    pub async fn get_events(&self) -> Result<Vec<Event>> {
        Ok(self.events.list_public_events().await?)
    }

    pub async fn get_event_by_id(&self, id: &str) -> Result<Event> {
        Ok(self.events.get_event(id).await?)
    }

    /// Flattens every RSVP into the responder's name followed by each of
    /// their named extra guests.
    pub async fn get_guest_list(&self, event_id: &str) -> Result<Vec<String>> {
        self.events.get_event(event_id).await?;
        let rsvps = self.rsvps.get_rsvps_by_event(event_id).await?;
        Ok(rsvps
            .into_iter()
            .flat_map(|rsvp| {
                let mut names = vec![rsvp.name];
                names.extend(rsvp.guests);
                names
            })
            .collect())
    }

    pub async fn get_events_by_owner(&self, user_id: &str) -> Result<Vec<Event>> {
        if self.identity.get_user_by_id(user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }
        Ok(self.events.get_events_by_owner(user_id).await?)
    }

    pub async fn create_event(&self, owner_id: &str, payload: CreateEventRequest) -> Result<Event> {
        let now = self.clock.now();
        validation::validate_create(&payload, now).map_err(AppError::validation)?;

        let event = Event {
            id: Uuid::new_v4().to_string(),
            name: payload.name,
            description: payload.description,
            category: payload.category,
            items: payload.items,
            visibility: payload.visibility,
            location: payload.location,
            image: payload.image,
            date: payload.date,
            duration: payload.duration,
            location_release_date: payload.location_release_date,
            max_guests: payload.max_guests,
            max_guests_per_attendee: payload.max_guests_per_attendee,
            cancelled: false,
            guest_count: 0,
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        let event = self.events.create_event(event).await?;
        info!("Created event {} for owner {}", event.id, owner_id);

        match event.location_release_date {
            Some(release_at) => {
                self.scheduler
                    .arm(Trigger {
                        event_id: event.id.clone(),
                        kind: TriggerKind::LocationRelease,
                        fire_at: release_at,
                    })
                    .await;
            }
            // No gate: the location is public knowledge from the start
            None => self.release_location(&event).await,
        }

        if let Some(fire_at) = reminder_fire_at(event.date, now) {
            self.scheduler
                .arm(Trigger {
                    event_id: event.id.clone(),
                    kind: TriggerKind::Reminder,
                    fire_at,
                })
                .await;
        }

        Ok(event)
    }

    pub async fn update_event(
        &self,
        owner_id: &str,
        event_id: &str,
        patch: UpdateEventRequest,
    ) -> Result<Event> {
        let event = self.events.get_event(event_id).await?;
        if event.owner_id != owner_id {
            return Err(AppError::unauthorized(
                "You are not authorized to update this event",
            ));
        }
        if event.cancelled {
            return Err(AppError::invalid_state("Event is cancelled"));
        }

        let now = self.clock.now();
        validation::validate_update(&patch, &event, now).map_err(AppError::validation)?;

        let previous_name = event.name.clone();

        let mut updated = event.clone();
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(category) = patch.category {
            updated.category = category;
        }
        if let Some(items) = patch.items {
            updated.items = items;
        }
        if let Some(visibility) = patch.visibility {
            updated.visibility = visibility;
        }
        if let Some(location) = patch.location {
            updated.location = location;
        }
        if let Some(image) = patch.image {
            updated.image = image;
        }
        if let Some(date) = patch.date {
            updated.date = date;
        }
        if let Some(field) = patch.duration {
            updated.duration = match field {
                OptionalField::Value(duration) => Some(duration),
                OptionalField::Null => None,
            };
        }
        if let Some(field) = patch.location_release_date {
            updated.location_release_date = match field {
                OptionalField::Value(release_at) => Some(release_at),
                OptionalField::Null => None,
            };
        }
        if let Some(field) = patch.max_guests {
            updated.max_guests = match field {
                OptionalField::Value(max_guests) => Some(max_guests),
                OptionalField::Null => None,
            };
        }
        if let Some(field) = patch.max_guests_per_attendee {
            updated.max_guests_per_attendee = match field {
                OptionalField::Value(per_attendee) => Some(per_attendee),
                OptionalField::Null => None,
            };
        }
        updated.updated_at = now;

        let detail_changed = updated.name != event.name
            || updated.description != event.description
            || updated.location != event.location
            || updated.date != event.date
            || updated.duration != event.duration;
        let date_changed = updated.date != event.date;
        let gate_changed = updated.location_release_date != event.location_release_date;

        let updated = self.events.update_event(updated).await?;
        info!("Updated event {}", updated.id);

        if date_changed {
            // Supersede-and-rearm: a reminder keyed on the old date is stale
            self.scheduler
                .disarm(&updated.id, TriggerKind::Reminder)
                .await;
            if let Some(fire_at) = reminder_fire_at(updated.date, now) {
                self.scheduler
                    .arm(Trigger {
                        event_id: updated.id.clone(),
                        kind: TriggerKind::Reminder,
                        fire_at,
                    })
                    .await;
            }
        }

        if gate_changed {
            self.scheduler
                .disarm(&updated.id, TriggerKind::LocationRelease)
                .await;
            match updated.location_release_date {
                Some(release_at) if release_at > now => {
                    self.scheduler
                        .arm(Trigger {
                            event_id: updated.id.clone(),
                            kind: TriggerKind::LocationRelease,
                            fire_at: release_at,
                        })
                        .await;
                }
                // A cleared or already-due gate releases right away
                _ => self.release_location(&updated).await,
            }
        }

        if detail_changed {
            let include_location = updated.location_released(now);
            let notice = notify::detail_change_notice(&updated, &previous_name, include_location);
            let recipients = self.attending_emails(&updated.id).await;
            notify::broadcast(self.mailer.as_ref(), &recipients, &notice).await;
        }

        Ok(updated)
    }

    pub async fn cancel_event(&self, owner_id: &str, event_id: &str) -> Result<Event> {
        let event = self.events.get_event(event_id).await?;
        if event.owner_id != owner_id {
            return Err(AppError::unauthorized(
                "You are not authorized to cancel this event",
            ));
        }
        let now = self.clock.now();
        if event.date <= now {
            return Err(AppError::invalid_state("Event has already taken place"));
        }
        if event.cancelled {
            return Err(AppError::invalid_state("Event is already cancelled"));
        }

        let mut cancelled = event;
        cancelled.cancelled = true;
        cancelled.updated_at = now;
        let cancelled = self.events.update_event(cancelled).await?;
        info!("Cancelled event {}", cancelled.id);

        // Anything still armed for this event is dead from here on; fire-time
        // re-checks would discard it anyway
        self.scheduler.disarm_event(&cancelled.id).await;

        let recipients = self.attending_emails(&cancelled.id).await;
        notify::broadcast(
            self.mailer.as_ref(),
            &recipients,
            &notify::cancellation_notice(&cancelled),
        )
        .await;

        Ok(cancelled)
    }

    async fn release_location(&self, event: &Event) {
        let recipients = self.attending_emails(&event.id).await;
        notify::broadcast(
            self.mailer.as_ref(),
            &recipients,
            &notify::location_release_notice(event),
        )
        .await;
    }

    async fn attending_emails(&self, event_id: &str) -> Vec<String> {
        match self.rsvps.get_rsvps_by_event(event_id).await {
            Ok(list) => notify::attending_emails(&list),
            Err(e) => {
                error!("Failed to load RSVPs for event {}: {}", event_id, e);
                Vec::new()
            }
        }
    }
}
