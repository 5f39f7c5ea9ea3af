//! License artifacts, per-tenant records, offline grace, and the store.

pub mod artifact;
pub mod grace;
pub mod record;
pub mod store;
pub mod vault;

pub use artifact::{LicenseArtifact, ModuleGrant};
pub use grace::GraceState;
pub use record::{LicenseFeatures, LicenseRecord, LicenseStatus};
pub use store::LicenseStore;
