//! Pure validation of event and RSVP payloads. Every check is
//! side-effect-free and reports all failures at once as field-level
//! errors, so a caller can surface the complete list in one response.

use chrono::{DateTime, Utc};
use url::Url;

use willbethere_shared::error::FieldError;
use willbethere_shared::models::{Event, EventDuration};

use crate::models::{
    CreateEventRequest, OptionalField, RespondToEventRequest, UpdateEventRequest,
    UpdateRsvpRequest,
};

pub type ValidationResult = Result<(), Vec<FieldError>>;

fn finish(errors: Vec<FieldError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn validate_create(req: &CreateEventRequest, now: DateTime<Utc>) -> ValidationResult {
    let mut errors = Vec::new();

    check_min_len(&req.name, 3, "name", "Name must be at least 3 characters", &mut errors);
    check_min_len(
        &req.description,
        3,
        "description",
        "Description must be at least 3 characters",
        &mut errors,
    );
    check_min_len(
        &req.category,
        2,
        "type",
        "Type must be at least 2 characters",
        &mut errors,
    );
    check_url(&req.image, "image", "Invalid image URL", &mut errors);

    if let Some(max_guests) = req.max_guests {
        if max_guests < 1 {
            errors.push(FieldError::new("maxGuests", "Max guests must be at least 1"));
        }
    }

    if req.date <= now {
        errors.push(FieldError::new("date", "Event date must be in the future"));
    }

    if let Some(release_at) = req.location_release_date {
        if release_at <= now {
            errors.push(FieldError::new(
                "locationReleaseDate",
                "Location release date must be in the future",
            ));
        }
        if req.date < release_at {
            errors.push(FieldError::new(
                "locationReleaseDate",
                "Location release date must be before event date",
            ));
        }
    }

    if let Some(duration) = &req.duration {
        check_duration(duration, &mut errors);
    }

    finish(errors)
}

pub fn validate_update(
    patch: &UpdateEventRequest,
    event: &Event,
    now: DateTime<Utc>,
) -> ValidationResult {
    let mut errors = Vec::new();

    if let Some(name) = &patch.name {
        check_min_len(name, 3, "name", "Name must be at least 3 characters", &mut errors);
    }
    if let Some(description) = &patch.description {
        check_min_len(
            description,
            3,
            "description",
            "Description must be at least 3 characters",
            &mut errors,
        );
    }
    if let Some(category) = &patch.category {
        check_min_len(
            category,
            2,
            "type",
            "Type must be at least 2 characters",
            &mut errors,
        );
    }
    if let Some(image) = &patch.image {
        check_url(image, "image", "Invalid image URL", &mut errors);
    }

    if let Some(OptionalField::Value(max_guests)) = &patch.max_guests {
        if *max_guests < 1 {
            errors.push(FieldError::new("maxGuests", "Max guests must be at least 1"));
        } else if *max_guests < event.guest_count {
            errors.push(FieldError::new(
                "maxGuests",
                "Max guests cannot be lower than the current guest count",
            ));
        }
    }

    // Temporal cross-checks only run for fields actually being changed,
    // each against the value the patch would leave in place.
    let effective_date = patch.date.unwrap_or(event.date);
    let effective_gate = match &patch.location_release_date {
        Some(OptionalField::Value(release_at)) => Some(*release_at),
        Some(OptionalField::Null) => None,
        None => event.location_release_date,
    };

    if let Some(date) = patch.date {
        if date <= now {
            errors.push(FieldError::new("date", "Event date must be in the future"));
        }
        if let Some(release_at) = effective_gate {
            if date < release_at {
                errors.push(FieldError::new(
                    "date",
                    "Event date must not be before the location release date",
                ));
            }
        }
    }

    if let Some(OptionalField::Value(release_at)) = &patch.location_release_date {
        if *release_at <= now {
            errors.push(FieldError::new(
                "locationReleaseDate",
                "Location release date must be in the future",
            ));
        }
        if effective_date < *release_at {
            errors.push(FieldError::new(
                "locationReleaseDate",
                "Location release date must be before event date",
            ));
        }
    }

    if let Some(OptionalField::Value(duration)) = &patch.duration {
        check_duration(duration, &mut errors);
    }

    finish(errors)
}

/// Validates a fresh response to an event. `authenticated` marks whether
/// an identity-resolved user backs the responder; anonymous responders
/// must carry their own contact details.
pub fn validate_respond(
    req: &RespondToEventRequest,
    event: &Event,
    authenticated: bool,
) -> ValidationResult {
    let mut errors = Vec::new();

    if !authenticated {
        match &req.first_name {
            Some(first_name) if first_name.chars().count() >= 2 => {}
            _ => errors.push(FieldError::new(
                "firstName",
                "First Name must be at least 2 characters",
            )),
        }
        match &req.last_name {
            Some(last_name) if last_name.chars().count() >= 2 => {}
            _ => errors.push(FieldError::new(
                "lastName",
                "Last Name must be at least 2 characters",
            )),
        }
        match &req.email {
            Some(email) if is_valid_email(email) => {}
            _ => errors.push(FieldError::new("email", "Invalid email")),
        }
    }

    check_guests_and_items(req.attending, &req.guests, &req.items, event, 0, &mut errors);

    finish(errors)
}

/// Validates an RSVP status update. `previous_contribution` is what the
/// responder's current RSVP already adds to the event's guest count
/// (1 + extra guests when attending, 0 otherwise), so changing one's own
/// count is not penalized by one's own prior reservation.
pub fn validate_rsvp_update(
    req: &UpdateRsvpRequest,
    event: &Event,
    previous_contribution: u32,
) -> ValidationResult {
    let mut errors = Vec::new();
    check_guests_and_items(
        req.attending,
        &req.guests,
        &req.items,
        event,
        previous_contribution,
        &mut errors,
    );
    finish(errors)
}

pub fn validate_uploads(uploads: &[String]) -> ValidationResult {
    let mut errors = Vec::new();
    for upload in uploads {
        if Url::parse(upload).is_err() {
            errors.push(FieldError::new("uploads", "Invalid upload URL"));
        }
    }
    finish(errors)
}

fn check_guests_and_items(
    attending: bool,
    guests: &[String],
    items: &[String],
    event: &Event,
    previous_contribution: u32,
    errors: &mut Vec<FieldError>,
) {
    if !attending {
        if !guests.is_empty() {
            errors.push(FieldError::new(
                "guests",
                "Cannot specify guests or items if not attending",
            ));
        }
        if !items.is_empty() {
            errors.push(FieldError::new(
                "items",
                "Cannot specify guests or items if not attending",
            ));
        }
        return;
    }

    if !guests.is_empty() {
        let extra = guests.len() as u32;

        if let Some(per_attendee) = event.max_guests_per_attendee {
            if extra > per_attendee {
                errors.push(FieldError::new(
                    "guests",
                    format!(
                        "Maximum number of guests allowed per attendee is {}",
                        per_attendee
                    ),
                ));
            }
        }

        if let Some(max_guests) = event.max_guests {
            let netted = event.guest_count.saturating_sub(previous_contribution);
            if netted + extra + 1 > max_guests {
                errors.push(FieldError::new(
                    "guests",
                    format!("{} guest slots left", max_guests.saturating_sub(netted)),
                ));
            }
        }
    }

    if !items.is_empty() {
        if event.items.is_empty() {
            errors.push(FieldError::new("items", "Event Host specified no items"));
        } else if !items.iter().all(|item| event.items.contains(item)) {
            errors.push(FieldError::new(
                "items",
                "Some items specified are not in event item list",
            ));
        }
    }
}

fn check_duration(duration: &EventDuration, errors: &mut Vec<FieldError>) {
    if duration.is_zero() {
        errors.push(FieldError::new("duration", "Duration must be greater than 0"));
    }
    if duration.hours > 24 {
        errors.push(FieldError::new("duration", "Duration hours must be at most 24"));
    }
    if duration.minutes > 60 {
        errors.push(FieldError::new(
            "duration",
            "Duration minutes must be at most 60",
        ));
    }
}

fn check_min_len(
    value: &str,
    min: usize,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) {
    if value.chars().count() < min {
        errors.push(FieldError::new(field, message));
    }
}

fn check_url(value: &str, field: &str, message: &str, errors: &mut Vec<FieldError>) {
    if Url::parse(value).is_err() {
        errors.push(FieldError::new(field, message));
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use willbethere_shared::test_utils::test_event;

    fn create_request() -> CreateEventRequest {
        CreateEventRequest {
            name: "Ada & Ben".to_string(),
            description: "Wedding reception".to_string(),
            category: "wedding".to_string(),
            items: vec![],
            visibility: willbethere_shared::models::Visibility::Public,
            location: "12 Garden Lane".to_string(),
            image: "https://example.com/invite.png".to_string(),
            date: Utc::now() + Duration::days(10),
            duration: None,
            location_release_date: None,
            max_guests: None,
            max_guests_per_attendee: None,
        }
    }

    fn respond_request(attending: bool) -> RespondToEventRequest {
        RespondToEventRequest {
            event_id: "event-1".to_string(),
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            email: Some("grace@example.com".to_string()),
            attending,
            congratulatory_message: None,
            items: vec![],
            guests: vec![],
        }
    }

    #[test]
    fn create_accepts_valid_payload() {
        assert!(validate_create(&create_request(), Utc::now()).is_ok());
    }

    #[test]
    fn create_rejects_past_date() {
        let mut req = create_request();
        req.date = Utc::now() - Duration::hours(1);
        let errors = validate_create(&req, Utc::now()).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "date"));
    }

    #[test]
    fn create_rejects_gate_after_date() {
        let mut req = create_request();
        req.location_release_date = Some(req.date + Duration::days(1));
        let errors = validate_create(&req, Utc::now()).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "locationReleaseDate"));
    }

    #[test]
    fn create_collects_every_failure() {
        let mut req = create_request();
        req.name = "ab".to_string();
        req.image = "not a url".to_string();
        req.date = Utc::now() - Duration::hours(1);
        req.duration = Some(EventDuration {
            days: 0,
            hours: 30,
            minutes: 0,
        });
        let errors = validate_create(&req, Utc::now()).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"image"));
        assert!(fields.contains(&"date"));
        assert!(fields.contains(&"duration"));
    }

    #[test]
    fn create_rejects_all_zero_duration() {
        let mut req = create_request();
        req.duration = Some(EventDuration::default());
        let errors = validate_create(&req, Utc::now()).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "duration"));
    }

    #[test]
    fn update_checks_only_changed_fields() {
        let mut event = test_event("event-1");
        // A stale gate on the stored event must not fail a patch that
        // does not touch dates
        event.location_release_date = Some(Utc::now() - Duration::days(1));
        let patch = UpdateEventRequest {
            name: Some("New name".to_string()),
            ..Default::default()
        };
        assert!(validate_update(&patch, &event, Utc::now()).is_ok());
    }

    #[test]
    fn update_rejects_date_before_effective_gate() {
        let mut event = test_event("event-1");
        event.location_release_date = Some(Utc::now() + Duration::days(5));
        let patch = UpdateEventRequest {
            date: Some(Utc::now() + Duration::days(2)),
            ..Default::default()
        };
        let errors = validate_update(&patch, &event, Utc::now()).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "date"));
    }

    #[test]
    fn update_rejects_max_guests_below_live_count() {
        let mut event = test_event("event-1");
        event.guest_count = 6;
        let patch = UpdateEventRequest {
            max_guests: Some(OptionalField::Value(4)),
            ..Default::default()
        };
        let errors = validate_update(&patch, &event, Utc::now()).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "maxGuests"));
    }

    #[test]
    fn update_allows_clearing_the_gate() {
        let mut event = test_event("event-1");
        event.location_release_date = Some(Utc::now() + Duration::days(5));
        let patch = UpdateEventRequest {
            location_release_date: Some(OptionalField::Null),
            ..Default::default()
        };
        assert!(validate_update(&patch, &event, Utc::now()).is_ok());
    }

    #[test]
    fn respond_rejects_guests_when_not_attending() {
        let mut req = respond_request(false);
        req.guests = vec!["Plus One".to_string()];
        let errors = validate_respond(&req, &test_event("event-1"), false).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "guests"));
    }

    #[test]
    fn respond_rejects_items_when_not_attending() {
        let mut req = respond_request(false);
        req.items = vec!["Cake".to_string()];
        let errors = validate_respond(&req, &test_event("event-1"), false).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "items"));
    }

    #[test]
    fn respond_requires_anonymous_contact_details() {
        let mut req = respond_request(true);
        req.first_name = None;
        req.email = Some("not-an-email".to_string());
        let errors = validate_respond(&req, &test_event("event-1"), false).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"firstName"));
        assert!(fields.contains(&"email"));
    }

    #[test]
    fn respond_skips_contact_checks_for_authenticated_users() {
        let mut req = respond_request(true);
        req.first_name = None;
        req.last_name = None;
        req.email = None;
        assert!(validate_respond(&req, &test_event("event-1"), true).is_ok());
    }

    #[test]
    fn respond_reports_remaining_slots() {
        let mut event = test_event("event-1");
        event.max_guests = Some(5);
        event.guest_count = 3;
        let mut req = respond_request(true);
        req.guests = vec![
            "One".to_string(),
            "Two".to_string(),
            "Three".to_string(),
        ];
        let errors = validate_respond(&req, &event, false).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "guests" && e.message == "2 guest slots left"));
    }

    #[test]
    fn respond_enforces_per_attendee_cap() {
        let mut event = test_event("event-1");
        event.max_guests_per_attendee = Some(1);
        let mut req = respond_request(true);
        req.guests = vec!["One".to_string(), "Two".to_string()];
        let errors = validate_respond(&req, &event, false).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.message == "Maximum number of guests allowed per attendee is 1"));
    }

    #[test]
    fn respond_rejects_unknown_items() {
        let mut event = test_event("event-1");
        event.items = vec!["Cake".to_string()];
        let mut req = respond_request(true);
        req.items = vec!["Balloons".to_string()];
        let errors = validate_respond(&req, &event, false).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "items"));
    }

    #[test]
    fn rsvp_update_nets_out_previous_contribution() {
        let mut event = test_event("event-1");
        event.max_guests = Some(5);
        event.guest_count = 5; // fully booked, 3 of which are this responder's
        let req = UpdateRsvpRequest {
            event_id: "event-1".to_string(),
            attending: true,
            congratulatory_message: None,
            items: vec![],
            guests: vec!["One".to_string(), "Two".to_string()],
        };
        // Previously 1 + 2 extras: shrinking to 1 + 2 still fits
        assert!(validate_rsvp_update(&req, &event, 3).is_ok());

        // A stranger bringing the same party would not fit
        let errors = validate_rsvp_update(&req, &event, 0).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.field == "guests" && e.message == "0 guest slots left"));
    }

    #[test]
    fn uploads_must_be_urls() {
        let errors =
            validate_uploads(&["https://cdn.example.com/a.png".to_string(), "nope".to_string()])
                .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "uploads");
    }
}
