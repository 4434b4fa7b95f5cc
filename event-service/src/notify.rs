//! Notice composition and dispatch. Notices are templated mails sent
//! through the messaging collaborator; dispatch is fire-and-forget and a
//! failed send is logged, never surfaced to the request that caused it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{error, info};

use willbethere_shared::mailer::{
    Mailer, MAIL_SUBJECT, TEMPLATE_CANCELLATION, TEMPLATE_DETAIL_CHANGE,
    TEMPLATE_LOCATION_RELEASE, TEMPLATE_REMINDER,
};
use willbethere_shared::models::{Event, Rsvp};

/// A composed notice, ready for dispatch.
#[derive(Debug, Clone)]
pub struct Notice {
    pub template_id: u32,
    pub variables: HashMap<String, String>,
}

/// Renders a timestamp the way notices show it, e.g. "Sat Aug 15 2026".
pub fn format_event_date(date: DateTime<Utc>) -> String {
    date.format("%a %b %e %Y").to_string()
}

pub fn location_release_notice(event: &Event) -> Notice {
    let mut variables = HashMap::new();
    variables.insert("name".to_string(), event.name.clone());
    variables.insert("date".to_string(), format_event_date(event.date));
    variables.insert("location".to_string(), event.location.clone());
    Notice {
        template_id: TEMPLATE_LOCATION_RELEASE,
        variables,
    }
}

pub fn reminder_notice(event: &Event) -> Notice {
    let mut variables = HashMap::new();
    variables.insert("name".to_string(), event.name.clone());
    variables.insert("date".to_string(), format_event_date(event.date));
    Notice {
        template_id: TEMPLATE_REMINDER,
        variables,
    }
}

pub fn cancellation_notice(event: &Event) -> Notice {
    let mut variables = HashMap::new();
    variables.insert("name".to_string(), event.name.clone());
    variables.insert("date".to_string(), format_event_date(event.date));
    Notice {
        template_id: TEMPLATE_CANCELLATION,
        variables,
    }
}

/// Detail-change notice. Keyed by the name the event carried before the
/// change so recipients recognize what they RSVP'd to; the location is
/// included only once the release gate is open.
pub fn detail_change_notice(event: &Event, previous_name: &str, include_location: bool) -> Notice {
    let mut variables = HashMap::new();
    variables.insert("name".to_string(), previous_name.to_string());
    variables.insert("newName".to_string(), event.name.clone());
    variables.insert("date".to_string(), format_event_date(event.date));
    variables.insert("description".to_string(), event.description.clone());
    if include_location {
        variables.insert("location".to_string(), event.location.clone());
    }
    Notice {
        template_id: TEMPLATE_DETAIL_CHANGE,
        variables,
    }
}

/// Emails of every attending RSVP.
pub fn attending_emails(rsvps: &[Rsvp]) -> Vec<String> {
    rsvps
        .iter()
        .filter(|r| r.attending)
        .map(|r| r.email.clone())
        .collect()
}

/// Dispatches a notice to a set of recipients, swallowing failures.
pub async fn broadcast(mailer: &dyn Mailer, recipients: &[String], notice: &Notice) {
    if recipients.is_empty() {
        info!(
            "No recipients for template {}, skipping dispatch",
            notice.template_id
        );
        return;
    }
    if let Err(e) = mailer
        .send(MAIL_SUBJECT, recipients, notice.template_id, &notice.variables)
        .await
    {
        error!(
            "Failed to dispatch template {} to {} recipient(s): {}",
            notice.template_id,
            recipients.len(),
            e
        );
    }
}

/// Dispatches a notice to a single recipient, swallowing failures.
pub async fn send_single(mailer: &dyn Mailer, recipient: &str, notice: &Notice) {
    broadcast(mailer, &[recipient.to_string()], notice).await;
}
