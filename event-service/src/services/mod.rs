pub mod events;
pub mod rsvp;

pub use events::EventsService;
pub use rsvp::RsvpService;
