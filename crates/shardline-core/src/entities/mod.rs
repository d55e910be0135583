//! Domain entities mirrored from the remote service

mod channel;
mod emoji;
mod guild;
mod keyed;
mod member;
mod message;
mod role;
mod user;

pub use channel::{Channel, ChannelType};
pub use emoji::Emoji;
pub use guild::Guild;
pub use keyed::Keyed;
pub use member::{Activity, Member, Presence};
pub use message::{Message, Reaction};
pub use role::Role;
pub use user::User;
