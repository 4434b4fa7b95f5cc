use chrono::{Duration, Utc};

use crate::models::{Event, Rsvp, User, Visibility};

/// A public wedding ten days out, no release gate, no caps.
pub fn test_event(id: &str) -> Event {
    let now = Utc::now();
    Event {
        id: id.to_string(),
        name: "Ada & Ben".to_string(),
        description: "Wedding reception at the gardens".to_string(),
        category: "wedding".to_string(),
        items: vec![],
        visibility: Visibility::Public,
        location: "12 Garden Lane".to_string(),
        image: "https://example.com/invite.png".to_string(),
        date: now + Duration::days(10),
        duration: None,
        location_release_date: None,
        max_guests: None,
        max_guests_per_attendee: None,
        cancelled: false,
        guest_count: 0,
        owner_id: "owner-1".to_string(),
        created_at: now,
        updated_at: now,
    }
}

/// An anonymous attending RSVP with no extras.
pub fn test_rsvp(id: &str, event_id: &str) -> Rsvp {
    Rsvp {
        id: id.to_string(),
        event_id: event_id.to_string(),
        user_id: None,
        name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        attending: true,
        guests: vec![],
        items: vec![],
        congratulatory_message: None,
        uploads: vec![],
        created_at: Utc::now(),
    }
}

pub fn test_user(id: &str) -> User {
    User {
        id: id.to_string(),
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: "grace@example.com".to_string(),
    }
}
