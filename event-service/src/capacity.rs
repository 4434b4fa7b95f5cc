//! Guest-count ledger. Each transition computes the event's next guest
//! count from one RSVP mutation. Bounds violations here are
//! programming-contract failures (validation must have rejected the
//! request first) and surface as internal errors, never as user-facing
//! validation failures. Committing the computed count happens through
//! the store's atomic compare-and-set.

use willbethere_shared::error::{AppError, Result};
use willbethere_shared::models::Event;

/// A responder turns attending, bringing `extra_guests` along.
pub fn apply_new_attendance(event: &Event, extra_guests: u32) -> Result<u32> {
    checked(event, event.guest_count as i64 + 1 + extra_guests as i64)
}

/// An attending responder withdraws together with their extras.
pub fn apply_withdrawal(event: &Event, extra_guests: u32) -> Result<u32> {
    checked(event, event.guest_count as i64 - 1 - extra_guests as i64)
}

/// An attending responder changes how many extras they bring.
pub fn apply_guest_count_change(
    event: &Event,
    old_extra_guests: u32,
    new_extra_guests: u32,
) -> Result<u32> {
    checked(
        event,
        event.guest_count as i64 - old_extra_guests as i64 + new_extra_guests as i64,
    )
}

fn checked(event: &Event, new_count: i64) -> Result<u32> {
    if new_count < 0 {
        return Err(AppError::internal(format!(
            "Guest count for event {} would drop below zero ({})",
            event.id, new_count
        )));
    }
    if let Some(max_guests) = event.max_guests {
        if new_count > max_guests as i64 {
            return Err(AppError::internal(format!(
                "Guest count for event {} would exceed max guests ({} > {})",
                event.id, new_count, max_guests
            )));
        }
    }
    Ok(new_count as u32)
}
