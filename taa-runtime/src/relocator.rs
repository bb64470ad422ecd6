//! Move query results into the pipeline's canonical layout

use crate::ports::{ObjectLocation, ObjectStore};
use crate::Result;
use std::sync::Arc;
use tracing::{error, info};

pub struct ResultRelocator {
    store: Arc<dyn ObjectStore>,
}

impl ResultRelocator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Server-side copy of one result object
    pub async fn relocate(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()> {
        self.store.copy_object(source, dest).await.map_err(|e| {
            error!(error = %e, source = %source, dest = %dest, "Failed to relocate query result");
            e
        })?;
        info!(source = %source, dest = %dest, "Relocated query result");
        Ok(())
    }
}
