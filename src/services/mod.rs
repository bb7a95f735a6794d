pub mod record_filler;
pub mod school_resolver;
pub mod selectors;

pub use record_filler::RecordFiller;
pub use school_resolver::{resolve_school, MatchTier, Resolution, SchoolResolver};
pub use selectors::PortalSelectors;
