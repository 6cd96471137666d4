pub mod dataset;
pub mod error;
pub mod metadata;
pub mod profile;
pub mod reconciler;
pub mod service;
pub mod status;

#[cfg(test)]
mod tests;

pub use error::{UpdateError, UpdateErrorKind};
pub use reconciler::{ReconcileOutcome, ReconcileState, VersionReconciler};
pub use service::QueryService;
pub use status::Status;
