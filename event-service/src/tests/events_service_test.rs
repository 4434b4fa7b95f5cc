use chrono::Duration;

use willbethere_shared::error::AppError;
use willbethere_shared::mailer::{
    TEMPLATE_CANCELLATION, TEMPLATE_DETAIL_CHANGE, TEMPLATE_LOCATION_RELEASE,
};
use willbethere_shared::store::EventStore;

use crate::models::{OptionalField, UpdateEventRequest};
use crate::scheduler::TriggerKind;
use crate::tests::harness::{create_test_app, event_payload, respond_payload};

#[tokio::test]
async fn create_event_persists_with_zero_guest_count() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();

    assert_eq!(event.guest_count, 0);
    assert_eq!(event.owner_id, "owner-1");
    assert!(!event.cancelled);

    let stored = app.events.get_event(&event.id).await.unwrap();
    assert_eq!(stored.name, "Ada & Ben");
}

#[tokio::test]
async fn create_event_rejects_past_date() {
    let app = create_test_app().await;

    let mut payload = event_payload(app.now(), 10);
    payload.date = app.now() - Duration::days(1);
    let err = app
        .events_service
        .create_event("owner-1", payload)
        .await
        .unwrap_err();

    match err {
        AppError::ValidationFailed(errors) => {
            assert!(errors.iter().any(|e| e.field == "date"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn create_event_rejects_gate_after_date() {
    let app = create_test_app().await;

    let mut payload = event_payload(app.now(), 10);
    payload.location_release_date = Some(payload.date + Duration::days(1));
    let err = app
        .events_service
        .create_event("owner-1", payload)
        .await
        .unwrap_err();

    match err {
        AppError::ValidationFailed(errors) => {
            assert!(errors.iter().any(|e| e.field == "locationReleaseDate"));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[tokio::test]
async fn create_without_gate_arms_only_the_reminder() {
    let app = create_test_app().await;

    // date = now + 10 days: reminder belongs at date - 7 days
    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();

    let armed = app.scheduler.armed().await;
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].kind, TriggerKind::Reminder);
    assert_eq!(armed[0].event_id, event.id);
    assert_eq!(armed[0].fire_at, event.date - Duration::days(7));
}

#[tokio::test]
async fn create_with_gate_arms_location_release() {
    let app = create_test_app().await;

    let mut payload = event_payload(app.now(), 10);
    payload.location_release_date = Some(app.now() + Duration::days(2));
    let event = app
        .events_service
        .create_event("owner-1", payload)
        .await
        .unwrap();

    let armed = app.scheduler.armed().await;
    let release: Vec<_> = armed
        .iter()
        .filter(|t| t.kind == TriggerKind::LocationRelease)
        .collect();
    assert_eq!(release.len(), 1);
    assert_eq!(release[0].event_id, event.id);
    assert_eq!(release[0].fire_at, app.now() + Duration::days(2));
}

#[tokio::test]
async fn near_event_uses_day_reminder_window() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 3))
        .await
        .unwrap();

    let armed = app.scheduler.armed().await;
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].fire_at, event.date - Duration::days(1));
}

#[tokio::test]
async fn imminent_event_gets_no_reminder() {
    let app = create_test_app().await;

    let mut payload = event_payload(app.now(), 10);
    payload.date = app.now() + Duration::hours(20);
    app.events_service
        .create_event("owner-1", payload)
        .await
        .unwrap();

    assert!(app.scheduler.armed().await.is_empty());
}

#[tokio::test]
async fn update_requires_the_owner() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();

    let patch = UpdateEventRequest {
        name: Some("Hijacked".to_string()),
        ..Default::default()
    };
    let err = app
        .events_service
        .update_event("intruder", &event.id, patch)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn update_of_missing_event_is_not_found() {
    let app = create_test_app().await;

    let err = app
        .events_service
        .update_event("owner-1", "ghost", UpdateEventRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn update_of_cancelled_event_is_invalid_state() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    app.events_service
        .cancel_event("owner-1", &event.id)
        .await
        .unwrap();

    let err = app
        .events_service
        .update_event("owner-1", &event.id, UpdateEventRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn detail_change_notifies_attending_under_the_previous_name() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "yes@example.com", true), None)
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "no@example.com", false), None)
        .await
        .unwrap();
    app.mailer.clear();

    let patch = UpdateEventRequest {
        name: Some("Ada & Ben, rescheduled".to_string()),
        ..Default::default()
    };
    app.events_service
        .update_event("owner-1", &event.id, patch)
        .await
        .unwrap();

    let notices = app.mailer.sent_with_template(TEMPLATE_DETAIL_CHANGE);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].recipients, vec!["yes@example.com".to_string()]);
    assert_eq!(notices[0].variables["name"], "Ada & Ben");
    assert_eq!(notices[0].variables["newName"], "Ada & Ben, rescheduled");
    // No gate on this event, so the location is included
    assert_eq!(notices[0].variables["location"], "12 Garden Lane");
}

#[tokio::test]
async fn detail_change_hides_location_behind_a_pending_gate() {
    let app = create_test_app().await;

    let mut payload = event_payload(app.now(), 10);
    payload.location_release_date = Some(app.now() + Duration::days(5));
    let event = app
        .events_service
        .create_event("owner-1", payload)
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "yes@example.com", true), None)
        .await
        .unwrap();
    app.mailer.clear();

    let patch = UpdateEventRequest {
        description: Some("Moved to the orangery".to_string()),
        ..Default::default()
    };
    app.events_service
        .update_event("owner-1", &event.id, patch)
        .await
        .unwrap();

    let notices = app.mailer.sent_with_template(TEMPLATE_DETAIL_CHANGE);
    assert_eq!(notices.len(), 1);
    assert!(!notices[0].variables.contains_key("location"));
}

#[tokio::test]
async fn visibility_change_alone_sends_no_detail_notice() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "yes@example.com", true), None)
        .await
        .unwrap();
    app.mailer.clear();

    let patch = UpdateEventRequest {
        visibility: Some(willbethere_shared::models::Visibility::Private),
        ..Default::default()
    };
    app.events_service
        .update_event("owner-1", &event.id, patch)
        .await
        .unwrap();

    assert!(app.mailer.sent_with_template(TEMPLATE_DETAIL_CHANGE).is_empty());
}

#[tokio::test]
async fn date_change_supersedes_and_rearms_the_reminder() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();

    let new_date = app.now() + Duration::days(20);
    let patch = UpdateEventRequest {
        date: Some(new_date),
        ..Default::default()
    };
    app.events_service
        .update_event("owner-1", &event.id, patch)
        .await
        .unwrap();

    let armed = app.scheduler.armed().await;
    let reminders: Vec<_> = armed
        .iter()
        .filter(|t| t.kind == TriggerKind::Reminder)
        .collect();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].fire_at, new_date - Duration::days(7));
}

#[tokio::test]
async fn clearing_the_gate_releases_the_location_immediately() {
    let app = create_test_app().await;

    let mut payload = event_payload(app.now(), 10);
    payload.location_release_date = Some(app.now() + Duration::days(5));
    let event = app
        .events_service
        .create_event("owner-1", payload)
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "yes@example.com", true), None)
        .await
        .unwrap();
    // The gate is pending: responding must not have leaked the location
    assert!(app
        .mailer
        .sent_with_template(TEMPLATE_LOCATION_RELEASE)
        .is_empty());

    let patch = UpdateEventRequest {
        location_release_date: Some(OptionalField::Null),
        ..Default::default()
    };
    app.events_service
        .update_event("owner-1", &event.id, patch)
        .await
        .unwrap();

    let released = app.mailer.sent_with_template(TEMPLATE_LOCATION_RELEASE);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].recipients, vec!["yes@example.com".to_string()]);

    let armed = app.scheduler.armed().await;
    assert!(armed
        .iter()
        .all(|t| t.kind != TriggerKind::LocationRelease));
}

#[tokio::test]
async fn cancel_twice_is_invalid_state() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();

    app.events_service
        .cancel_event("owner-1", &event.id)
        .await
        .unwrap();
    let err = app
        .events_service
        .cancel_event("owner-1", &event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn cancel_after_the_date_is_invalid_state() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();

    app.clock.advance(Duration::days(11));
    let err = app
        .events_service
        .cancel_event("owner-1", &event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn cancel_announces_to_attending_rsvps() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "yes@example.com", true), None)
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "no@example.com", false), None)
        .await
        .unwrap();

    let cancelled = app
        .events_service
        .cancel_event("owner-1", &event.id)
        .await
        .unwrap();
    assert!(cancelled.cancelled);

    let notices = app.mailer.sent_with_template(TEMPLATE_CANCELLATION);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].recipients, vec!["yes@example.com".to_string()]);
}

#[tokio::test]
async fn cancellation_survives_a_messaging_outage() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    app.rsvp_service
        .respond_to_event(respond_payload(&event.id, "yes@example.com", true), None)
        .await
        .unwrap();

    app.mailer.fail_sends(true);
    let cancelled = app
        .events_service
        .cancel_event("owner-1", &event.id)
        .await
        .unwrap();
    assert!(cancelled.cancelled);

    let stored = app.events.get_event(&event.id).await.unwrap();
    assert!(stored.cancelled);
}

#[tokio::test]
async fn guest_list_flattens_responders_and_their_guests() {
    let app = create_test_app().await;

    let event = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    let mut payload = respond_payload(&event.id, "grace@example.com", true);
    payload.guests = vec!["Plus One".to_string(), "Plus Two".to_string()];
    app.rsvp_service
        .respond_to_event(payload, None)
        .await
        .unwrap();

    let guest_list = app.events_service.get_guest_list(&event.id).await.unwrap();
    assert_eq!(
        guest_list,
        vec![
            "Grace Hopper".to_string(),
            "Plus One".to_string(),
            "Plus Two".to_string()
        ]
    );
}

#[tokio::test]
async fn guest_list_of_missing_event_is_not_found() {
    let app = create_test_app().await;
    let err = app
        .events_service
        .get_guest_list("ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn events_by_owner_lists_only_theirs() {
    let app = create_test_app().await;
    app.identity
        .add_user(willbethere_shared::test_utils::test_user("owner-2"));

    let mine = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    app.events_service
        .create_event("owner-2", event_payload(app.now(), 5))
        .await
        .unwrap();

    let listed = app
        .events_service
        .get_events_by_owner("owner-1")
        .await
        .unwrap();
    let ids: Vec<&str> = listed.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![mine.id.as_str()]);
}

#[tokio::test]
async fn events_by_unknown_owner_is_not_found() {
    let app = create_test_app().await;
    let err = app
        .events_service
        .get_events_by_owner("stranger")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn public_listing_hides_cancelled_events() {
    let app = create_test_app().await;

    let kept = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 10))
        .await
        .unwrap();
    let dropped = app
        .events_service
        .create_event("owner-1", event_payload(app.now(), 5))
        .await
        .unwrap();
    app.events_service
        .cancel_event("owner-1", &dropped.id)
        .await
        .unwrap();

    let listed = app.events_service.get_events().await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![kept.id.as_str()]);
}
