//! Domain models for mail entities

mod account;
mod contact;
mod label;
mod message;
mod sync_state;

pub use account::Account;
pub use contact::{Contact, ContactGroup};
pub use label::{Label, LabelId, label_icon, label_sort_order};
pub use message::{EmailAddress, Message, MessageId};
pub use sync_state::SyncState;
