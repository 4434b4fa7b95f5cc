use chrono::{DateTime, Utc};
use serde::Deserialize;

use willbethere_shared::models::{EventDuration, Visibility};

/// Distinguishes "set this field to a value" from "clear this field" in a
/// patch. A field that should not change is simply absent
/// (`Option<OptionalField<T>>` is `None`).
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum OptionalField<T> {
    Value(T),
    Null,
}

/// Deserializer hook for `Option<OptionalField<T>>` fields: a present
/// field always lands in `Some`, even when its value is an explicit
/// null, so "clear" and "leave untouched" stay distinguishable.
fn some_optional_field<'de, D, T>(deserializer: D) -> Result<Option<OptionalField<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    OptionalField::deserialize(deserializer).map(Some)
}

// Request DTOs
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub category: String,
    #[serde(default)]
    pub items: Vec<String>,
    pub visibility: Visibility,
    pub location: String,
    pub image: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub duration: Option<EventDuration>,
    #[serde(default)]
    pub location_release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_guests: Option<u32>,
    #[serde(default)]
    pub max_guests_per_attendee: Option<u32>,
}

/// Field patch for an event. Absent fields are left untouched; optional
/// fields can be cleared with an explicit null.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub category: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<String>>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "some_optional_field")]
    pub duration: Option<OptionalField<EventDuration>>,
    #[serde(default, deserialize_with = "some_optional_field")]
    pub location_release_date: Option<OptionalField<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "some_optional_field")]
    pub max_guests: Option<OptionalField<u32>>,
    #[serde(default, deserialize_with = "some_optional_field")]
    pub max_guests_per_attendee: Option<OptionalField<u32>>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RespondToEventRequest {
    pub event_id: String,
    /// Required together with `last_name` and `email` for anonymous
    /// responders; ignored for authenticated ones.
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub attending: bool,
    #[serde(default)]
    pub congratulatory_message: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub guests: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRsvpRequest {
    pub event_id: String,
    pub attending: bool,
    #[serde(default)]
    pub congratulatory_message: Option<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub guests: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UploadEventImagesRequest {
    pub event_id: String,
    pub uploads: Vec<String>,
}
