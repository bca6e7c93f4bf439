//! Action handlers for mail mutations

mod handler;

pub use handler::{ActionHandler, OutgoingMail, compose_rfc2822};
