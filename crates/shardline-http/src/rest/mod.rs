//! REST request path

mod client;
mod models;
mod transport;

pub use client::{RestClient, USER_AGENT};
pub use models::{GatewayBot, SessionStartLimit};
pub use transport::{HttpTransport, Method, ReqwestTransport, RestRequest, RestResponse};
