//! Label model and well-known label IDs

use serde::{Deserialize, Serialize};

/// Well-known system label IDs
pub struct LabelId;

impl LabelId {
    pub const INBOX: &'static str = "INBOX";
    pub const SENT: &'static str = "SENT";
    pub const DRAFT: &'static str = "DRAFT";
    pub const TRASH: &'static str = "TRASH";
    pub const SPAM: &'static str = "SPAM";
    pub const STARRED: &'static str = "STARRED";
    pub const UNREAD: &'static str = "UNREAD";
    pub const IMPORTANT: &'static str = "IMPORTANT";
}

/// A mail label (system or user-defined)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// Icon for a label, for UI display
pub fn label_icon(label_id: &str) -> &'static str {
    match label_id {
        LabelId::INBOX => "📥",
        LabelId::SENT => "📤",
        LabelId::DRAFT => "📝",
        LabelId::TRASH => "🗑️",
        LabelId::SPAM => "⚠️",
        LabelId::STARRED => "⭐",
        LabelId::IMPORTANT => "❗",
        _ => "🏷️",
    }
}

/// Sort order for labels in a sidebar: system labels first, in a fixed
/// order, then user labels alphabetically after.
pub fn label_sort_order(label_id: &str) -> u32 {
    match label_id {
        LabelId::INBOX => 0,
        LabelId::STARRED => 1,
        LabelId::SENT => 2,
        LabelId::DRAFT => 3,
        LabelId::IMPORTANT => 4,
        LabelId::SPAM => 5,
        LabelId::TRASH => 6,
        _ => 100,
    }
}
