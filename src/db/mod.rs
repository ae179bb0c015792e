mod repository;
pub mod resolver;
pub(crate) mod schema;

pub use repository::Repository;

use crate::config::FeedCatalog;
use crate::error::Result;
use crate::models::{Agency, Category};

/// Make sure every category and agency in the catalog exists, so items
/// pulled from its feeds can reference them.
pub async fn seed_catalog(repo: &Repository, catalog: &FeedCatalog) -> Result<()> {
    for category in &catalog.categories {
        repo.upsert_category(Category {
            id: category.id,
            name: category.name.clone(),
        })
        .await?;
    }
    let agencies = catalog.agencies();
    for (id, name) in &agencies {
        repo.upsert_agency(Agency {
            id: *id,
            name: name.clone(),
            website: None,
            image_url: None,
        })
        .await?;
    }
    tracing::info!(
        "Seeded {} categories and {} agencies",
        catalog.categories.len(),
        agencies.len()
    );
    Ok(())
}
