pub mod landing;
pub mod session;

pub use landing::{classify_landing, Landing, PortalPaths};
pub use session::{AutomationSession, SessionSettings, SessionState};
