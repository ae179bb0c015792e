mod entry;
mod news;
mod source;

pub use entry::{DateField, Enclosure, EntryLink, RawEntry};
pub use news::{Agency, CandidateItem, Category, NewsCreate, NewsFilter, NewsRecord, NewsView};
pub use source::FeedSource;
