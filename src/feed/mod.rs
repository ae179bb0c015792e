pub mod dates;
pub mod extract;
mod fetcher;
pub mod normalize;

pub use fetcher::{parse_entries, FeedFetcher, DEFAULT_MAX_ITEMS_PER_FEED};
pub use normalize::normalize;
