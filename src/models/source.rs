use serde::{Deserialize, Serialize};

/// One feed URL together with the category and agency its items belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub category_id: i64,
    pub agency_id: i64,
    pub url: String,
    pub category: String,
    pub agency: String,
}
