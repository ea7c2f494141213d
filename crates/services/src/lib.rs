#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod identity;
pub mod progress_tracker;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ProgressError};
pub use identity::{AnonymousIdentity, FixedIdentity, SessionIdentity};
pub use progress_tracker::{OverviewEntry, ProgressTracker};
