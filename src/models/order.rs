use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A completed checkout. Item fields are snapshotted at order time so later
/// catalog edits cannot alter historical records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: i64,
    pub username: Option<String>,
    pub customer_name: String,
    pub contact: String,
    pub item_id: String,
    pub item_name: String,
    pub item_price: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WholesaleRequest {
    pub id: String,
    pub user_id: i64,
    pub username: Option<String>,
    pub request_text: String,
    pub created_at: NaiveDateTime,
}
