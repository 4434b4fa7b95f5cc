use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who can discover an event through the public listing.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    Public,
    Private,
}

/// Optional event duration. Each component is non-negative; a present
/// duration must not be all-zero.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventDuration {
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
}

impl EventDuration {
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }
}

/// A hosted occasion with capacity and timing constraints.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Category tag, e.g. "wedding" or "book_launch".
    #[serde(rename = "type")]
    pub category: String,
    /// Item names attendees may claim to bring.
    pub items: Vec<String>,
    pub visibility: Visibility,
    pub location: String,
    /// URL of the event image.
    pub image: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<EventDuration>,
    /// The location stays hidden from attendees until this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_release_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_guests_per_attendee: Option<u32>,
    #[serde(default)]
    pub cancelled: bool,
    /// Count of every attendee: one per attending RSVP plus their extra guests.
    #[serde(default)]
    pub guest_count: u32,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// True once the location may be disclosed: no release gate was set,
    /// or the gate instant has passed.
    pub fn location_released(&self, now: DateTime<Utc>) -> bool {
        match self.location_release_date {
            Some(release_at) => release_at <= now,
            None => true,
        }
    }

    /// Remaining guest slots, when the event has a cap.
    pub fn slots_left(&self) -> Option<u32> {
        self.max_guests
            .map(|max| max.saturating_sub(self.guest_count))
    }

    pub fn is_fully_booked(&self) -> bool {
        matches!(self.max_guests, Some(max) if self.guest_count >= max)
    }
}

/// One responder's reply to an event.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Rsvp {
    pub id: String,
    pub event_id: String,
    /// Set for authenticated responders; anonymous responders identify
    /// through name and email only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display name, "First Last".
    pub name: String,
    pub email: String,
    pub attending: bool,
    /// Names of extra guests the responder brings along.
    pub guests: Vec<String>,
    /// Claimed item names, a subset of the event's item list.
    pub items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congratulatory_message: Option<String>,
    /// URLs of images the responder uploaded after the event.
    #[serde(default)]
    pub uploads: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Rsvp {
    /// Extra guests this RSVP contributes on top of the responder.
    pub fn extra_guests(&self) -> u32 {
        self.guests.len() as u32
    }
}

/// Profile returned by the identity collaborator.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
