mod cache;
mod delivery;

pub use cache::DeliveryCache;
pub use delivery::{Deliver, DeliveryClient, DeliveryResult, API_KEY_HEADER};
