//! Test doubles and helpers shared by every crate's test suite.

pub mod fixtures;
pub mod manual_clock;
pub mod recording_mailer;
pub mod stub_identity;
pub mod test_logging;

pub use fixtures::{test_event, test_rsvp, test_user};
pub use manual_clock::ManualClock;
pub use recording_mailer::{RecordingMailer, SentMail};
pub use stub_identity::StubIdentityService;
pub use test_logging::init_test_logging;
