pub mod activity;
pub mod session;
pub mod summary;
pub mod user;

pub use activity::{ActivityContext, ActivitySnapshot, ClassificationDecision};
pub use session::{Category, SessionHandle, SessionSpec, Voice};
pub use summary::SessionSummary;
pub use user::{DeviceIdentity, UserRef};
