use std::sync::Arc;

use course_core::Clock;
use course_core::model::{CatalogDraft, ContentCatalog};
use storage::repository::Storage;

use crate::error::AppServicesError;
use crate::identity::SessionIdentity;
use crate::progress_tracker::ProgressTracker;

/// Assembles the catalog and app-facing services behind one constructor.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<ContentCatalog>,
    progress: Arc<ProgressTracker>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// The catalog draft is validated exactly once here; everything
    /// downstream consumes the validated tree.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the catalog is malformed or storage
    /// initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        draft: CatalogDraft,
        clock: Clock,
        identity: Arc<dyn SessionIdentity>,
    ) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(draft.validate()?);
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::assemble(catalog, &storage, clock, identity))
    }

    /// Build services on the in-memory repository, for tests and prototyping.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the catalog is malformed.
    pub fn new_in_memory(
        draft: CatalogDraft,
        clock: Clock,
        identity: Arc<dyn SessionIdentity>,
    ) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(draft.validate()?);
        let storage = Storage::in_memory();
        Ok(Self::assemble(catalog, &storage, clock, identity))
    }

    fn assemble(
        catalog: Arc<ContentCatalog>,
        storage: &Storage,
        clock: Clock,
        identity: Arc<dyn SessionIdentity>,
    ) -> Self {
        let progress = Arc::new(ProgressTracker::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&storage.progress),
            identity,
        ));
        Self { catalog, progress }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<ContentCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress)
    }
}
