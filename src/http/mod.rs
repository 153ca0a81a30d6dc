//! Authenticated request pipeline.

mod client;
pub mod request;
pub mod session;

pub use client::AuthClient;
pub use request::RequestDescriptor;
pub use session::SessionStatus;
