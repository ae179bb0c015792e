use serde::{Deserialize, Serialize};

/// A normalized feed entry ready to be posted to the ingest API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category_id: i64,
    pub agency_id: i64,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<i64>,
    pub link: String,
}

/// Body of `POST /api/news`, and each element of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsCreate {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub category_id: i64,
    pub agency_id: i64,
    #[serde(rename = "pubDate", default)]
    pub pub_date: Option<i64>,
    #[serde(default)]
    pub link: Option<String>,
}

impl From<CandidateItem> for NewsCreate {
    fn from(item: CandidateItem) -> Self {
        Self {
            title: item.title,
            content: item.content,
            image_url: item.image_url,
            category_id: item.category_id,
            agency_id: item.agency_id,
            pub_date: item.pub_date,
            link: Some(item.link),
        }
    }
}

/// A stored news row as the duplicate resolver sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub category_id: i64,
    pub agency_id: i64,
    pub pub_date: Option<i64>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: i64,
    pub name: String,
    pub website: Option<String>,
    pub image_url: Option<String>,
}

/// A news record joined with its category and agency, as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<i64>,
    pub link: Option<String>,
    pub category: Category,
    pub agency: Agency,
}

/// Query filters for listing news.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsFilter {
    pub category_id: Option<i64>,
    pub agency_id: Option<i64>,
    pub category: Option<String>,
    pub agency: Option<String>,
    pub q: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for NewsFilter {
    fn default() -> Self {
        Self {
            category_id: None,
            agency_id: None,
            category: None,
            agency: None,
            q: None,
            limit: 50,
            offset: 0,
        }
    }
}
