//! Event dispatch

mod dispatcher;
mod handlers;
mod listeners;

pub use dispatcher::EventDispatcher;
pub use listeners::{Listener, ListenerId, ListenerRegistry};
