//! RSVP operations: responding to an event, flipping attendance,
//! attaching uploads. Every guest-count mutation commits through the
//! store's compare-and-set; a lost race is retried once against freshly
//! re-read state and then rejected as a capacity failure.

use std::sync::Arc;

use log::{error, info};
use uuid::Uuid;

use willbethere_shared::clock::Clock;
use willbethere_shared::error::{AppError, FieldError, Result};
use willbethere_shared::mailer::Mailer;
use willbethere_shared::models::{Event, Rsvp, User};
use willbethere_shared::store::{EventStore, RsvpStore, StoreError};

use crate::capacity;
use crate::models::{RespondToEventRequest, UpdateRsvpRequest, UploadEventImagesRequest};
use crate::notify;
use crate::validation;

/// One of the three guest-count transitions an RSVP mutation can cause.
#[derive(Debug, Clone, Copy)]
enum CapacityTransition {
    Join { extra: u32 },
    Leave { extra: u32 },
    Change { old_extra: u32, new_extra: u32 },
}

impl CapacityTransition {
    fn apply(&self, event: &Event) -> Result<u32> {
        match *self {
            CapacityTransition::Join { extra } => capacity::apply_new_attendance(event, extra),
            CapacityTransition::Leave { extra } => capacity::apply_withdrawal(event, extra),
            CapacityTransition::Change {
                old_extra,
                new_extra,
            } => capacity::apply_guest_count_change(event, old_extra, new_extra),
        }
    }

    /// Checks the transition against freshly re-read state after a lost
    /// race. Rejections here are `CapacityExceeded`, not validation
    /// failures: they depend on live concurrent state.
    fn ensure_fits(&self, event: &Event) -> Result<()> {
        let max_guests = match event.max_guests {
            Some(max_guests) => max_guests,
            None => return Ok(()),
        };
        let (netted, added) = match *self {
            CapacityTransition::Join { extra } => (event.guest_count, 1 + extra),
            CapacityTransition::Leave { .. } => return Ok(()),
            CapacityTransition::Change {
                old_extra,
                new_extra,
            } => (event.guest_count.saturating_sub(old_extra), new_extra),
        };
        if netted + added > max_guests {
            let slots = max_guests.saturating_sub(netted);
            if slots == 0 {
                return Err(AppError::capacity_exceeded("Event is fully booked"));
            }
            return Err(AppError::capacity_exceeded(format!(
                "{} guest slots left",
                slots
            )));
        }
        Ok(())
    }
}

pub struct RsvpService<ES, RS> {
    events: Arc<ES>,
    rsvps: Arc<RS>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl<ES, RS> RsvpService<ES, RS>
where
    ES: EventStore,
    RS: RsvpStore,
{
    pub fn new(
        events: Arc<ES>,
        rsvps: Arc<RS>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            rsvps,
            mailer,
            clock,
        }
    }

    pub async fn get_rsvp_by_id(&self, id: &str) -> Result<Rsvp> {
        Ok(self.rsvps.get_rsvp(id).await?)
    }

    pub async fn get_rsvps_by_event(&self, event_id: &str) -> Result<Vec<Rsvp>> {
        Ok(self.rsvps.get_rsvps_by_event(event_id).await?)
    }

    pub async fn get_rsvps_by_user(&self, user_id: &str) -> Result<Vec<Rsvp>> {
        Ok(self.rsvps.get_rsvps_by_user(user_id).await?)
    }

    pub async fn respond_to_event(
        &self,
        payload: RespondToEventRequest,
        user: Option<&User>,
    ) -> Result<Rsvp> {
        let now = self.clock.now();
        let event = self.events.get_event(&payload.event_id).await?;

        if event.cancelled {
            return Err(AppError::invalid_state("Event is cancelled"));
        }
        if event.date <= now {
            return Err(AppError::invalid_state("Event has already taken place"));
        }
        if event.is_fully_booked() {
            return Err(AppError::invalid_state("Event is fully booked"));
        }

        if let Some(user) = user {
            let existing = self
                .rsvps
                .find_rsvp_by_user_and_event(&user.id, &event.id)
                .await?;
            if existing.is_some() {
                return Err(AppError::validation(vec![FieldError::new(
                    "eventId",
                    "You have already responded to this event",
                )]));
            }
        }

        validation::validate_respond(&payload, &event, user.is_some())
            .map_err(AppError::validation)?;

        let (name, email) = match user {
            Some(user) => (user.full_name(), user.email.clone()),
            None => (
                format!(
                    "{} {}",
                    payload.first_name.clone().unwrap_or_default(),
                    payload.last_name.clone().unwrap_or_default()
                ),
                payload.email.clone().unwrap_or_default(),
            ),
        };

        // Reserve capacity before the RSVP exists so two racing responders
        // can never both slip under the cap
        let extra = payload.guests.len() as u32;
        let reserved = if payload.attending {
            Some(
                self.commit_capacity(&event, CapacityTransition::Join { extra })
                    .await?,
            )
        } else {
            None
        };

        let rsvp = Rsvp {
            id: Uuid::new_v4().to_string(),
            event_id: event.id.clone(),
            user_id: user.map(|u| u.id.clone()),
            name,
            email,
            attending: payload.attending,
            guests: payload.guests,
            items: payload.items,
            congratulatory_message: payload.congratulatory_message,
            uploads: vec![],
            created_at: now,
        };

        let rsvp = match self.rsvps.create_rsvp(rsvp).await {
            Ok(rsvp) => rsvp,
            Err(e) => {
                if let Some(committed) = &reserved {
                    self.release_reservation(committed, extra).await;
                }
                return Err(e.into());
            }
        };
        info!("Recorded RSVP {} for event {}", rsvp.id, event.id);

        if rsvp.attending && event.location_released(now) {
            notify::send_single(
                self.mailer.as_ref(),
                &rsvp.email,
                &notify::location_release_notice(&event),
            )
            .await;
        }

        Ok(rsvp)
    }

    pub async fn update_rsvp_status(&self, user_id: &str, payload: UpdateRsvpRequest) -> Result<Rsvp> {
        let now = self.clock.now();
        let rsvp = self
            .rsvps
            .find_rsvp_by_user_and_event(user_id, &payload.event_id)
            .await?
            .ok_or_else(|| AppError::not_found("Rsvp not found"))?;
        let event = self.events.get_event(&rsvp.event_id).await?;

        let previous_contribution = if rsvp.attending {
            1 + rsvp.extra_guests()
        } else {
            0
        };
        validation::validate_rsvp_update(&payload, &event, previous_contribution)
            .map_err(AppError::validation)?;

        let old_extra = rsvp.extra_guests();
        let new_extra = payload.guests.len() as u32;
        match (rsvp.attending, payload.attending) {
            (false, true) => {
                self.commit_capacity(&event, CapacityTransition::Join { extra: new_extra })
                    .await?;
            }
            (true, true) if old_extra != new_extra => {
                self.commit_capacity(
                    &event,
                    CapacityTransition::Change {
                        old_extra,
                        new_extra,
                    },
                )
                .await?;
            }
            (true, false) => {
                self.commit_capacity(&event, CapacityTransition::Leave { extra: old_extra })
                    .await?;
            }
            _ => {}
        }

        let became_attending = !rsvp.attending && payload.attending;

        let mut updated = rsvp;
        updated.attending = payload.attending;
        updated.guests = payload.guests;
        updated.items = payload.items;
        updated.congratulatory_message = payload.congratulatory_message;
        let updated = self.rsvps.update_rsvp(updated).await?;
        info!("Updated RSVP {} for event {}", updated.id, updated.event_id);

        if became_attending && event.location_released(now) {
            notify::send_single(
                self.mailer.as_ref(),
                &updated.email,
                &notify::location_release_notice(&event),
            )
            .await;
        }

        Ok(updated)
    }

    pub async fn upload_event_images(
        &self,
        user_id: &str,
        payload: UploadEventImagesRequest,
    ) -> Result<Rsvp> {
        validation::validate_uploads(&payload.uploads).map_err(AppError::validation)?;

        let rsvp = self
            .rsvps
            .find_rsvp_by_user_and_event(user_id, &payload.event_id)
            .await?;
        let mut rsvp = match rsvp {
            Some(rsvp) if rsvp.attending => rsvp,
            _ => return Err(AppError::not_found("You did not attend this event")),
        };

        rsvp.uploads.extend(payload.uploads);
        Ok(self.rsvps.update_rsvp(rsvp).await?)
    }

    /// Applies a capacity transition with a compare-and-set on the guest
    /// counter. A lost race is retried once against freshly re-read
    /// state; a second loss, or a fresh read that no longer fits, is a
    /// capacity rejection.
    async fn commit_capacity(
        &self,
        snapshot: &Event,
        transition: CapacityTransition,
    ) -> Result<Event> {
        let new_count = transition.apply(snapshot)?;
        match self
            .events
            .set_guest_count(&snapshot.id, snapshot.guest_count, new_count)
            .await
        {
            Ok(event) => Ok(event),
            Err(StoreError::Conflict(_)) => {
                let fresh = self.events.get_event(&snapshot.id).await?;
                transition.ensure_fits(&fresh)?;
                let new_count = transition.apply(&fresh)?;
                match self
                    .events
                    .set_guest_count(&fresh.id, fresh.guest_count, new_count)
                    .await
                {
                    Ok(event) => Ok(event),
                    Err(StoreError::Conflict(_)) => {
                        Err(AppError::capacity_exceeded("Event is fully booked"))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort rollback of a reserved slot when persisting the RSVP
    /// itself failed.
    async fn release_reservation(&self, event: &Event, extra: u32) {
        let mut current = event.clone();
        for _ in 0..2 {
            let target = current.guest_count.saturating_sub(1 + extra);
            match self
                .events
                .set_guest_count(&current.id, current.guest_count, target)
                .await
            {
                Ok(_) => return,
                Err(StoreError::Conflict(_)) => match self.events.get_event(&current.id).await {
                    Ok(fresh) => current = fresh,
                    Err(e) => {
                        error!(
                            "Failed to re-read event {} while releasing capacity: {}",
                            current.id, e
                        );
                        return;
                    }
                },
                Err(e) => {
                    error!(
                        "Failed to release reserved capacity for event {}: {}",
                        current.id, e
                    );
                    return;
                }
            }
        }
        error!(
            "Gave up releasing reserved capacity for event {}",
            event.id
        );
    }
}
