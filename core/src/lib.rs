pub mod diagram;
pub mod error;
pub mod insights;
pub mod model;
pub mod permissions;
pub mod provider;

pub use error::{ErrorKind, ProviderError, classify_provider_error};
pub use permissions::{CAPABILITY_PERMISSIONS, Capability, PermissionReport, required_permissions};
pub use provider::{Providers, ProviderResult};
