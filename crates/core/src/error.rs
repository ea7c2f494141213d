use thiserror::Error;

use crate::model::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
