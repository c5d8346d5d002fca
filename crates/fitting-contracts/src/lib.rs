pub mod chat;
pub mod events;
pub mod inputs;
pub mod session;
