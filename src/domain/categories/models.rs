//! Category Models

use jiff::Timestamp;
use uuid::Uuid;

/// Category Model
#[derive(Debug, Clone)]
pub struct Category {
    pub uuid: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// New Category Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub uuid: Uuid,
    pub name: String,
    pub image: Option<String>,
}

/// Category Update Model
///
/// `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
}
