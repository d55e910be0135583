//! Gateway events

mod event;
mod event_types;

pub use event::Event;
pub use event_types::EventType;
