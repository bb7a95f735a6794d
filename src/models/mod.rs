pub mod loaders;
pub mod record;

pub use loaders::{load_records, RecordFile};
pub use record::{InstitutionIdentity, RecordResult, SchoolOption, SessionRecord};
