//! Site Settings Models

use jiff::Timestamp;

/// Site-wide settings singleton.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub footer_text: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub updated_at: Timestamp,
}

/// Site settings patch; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteSettingsUpdate {
    pub footer_text: Option<String>,
    pub contact_email: Option<String>,
    pub phone: Option<String>,
    pub telegram_chat_id: Option<String>,
}
