//! Client facade and handler context

mod builder;
mod client;
mod context;

pub use builder::ClientBuilder;
pub use client::Client;
pub use context::Context;
