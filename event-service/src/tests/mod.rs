
mod events_service_test;
