//! Query rendering from a stored template

use crate::ports::{ObjectLocation, ObjectStore};
use crate::{Error, Result};
use std::sync::Arc;
use taa_core::{Horizon, QueryParameters, QueryTemplate, RunDate};
use tracing::{debug, error};

pub struct QueryRenderer {
    store: Arc<dyn ObjectStore>,
}

impl QueryRenderer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch raw template text; any read failure is `ResourceUnavailable`
    pub async fn load_template(&self, location: &ObjectLocation) -> Result<QueryTemplate> {
        let bytes = self.store.get_object(location).await.map_err(|e| {
            error!(error = %e, template = %location, "Failed to read query template");
            Error::ResourceUnavailable(format!("query template {}: {}", location, e))
        })?;

        let text = String::from_utf8(bytes).map_err(|_| {
            Error::ResourceUnavailable(format!("query template {} is not UTF-8", location))
        })?;
        Ok(QueryTemplate::new(text))
    }

    /// Read the template and substitute the run's date and horizon
    pub async fn render(
        &self,
        date: &RunDate,
        horizon: Horizon,
        location: &ObjectLocation,
    ) -> Result<String> {
        let template = self.load_template(location).await?;
        let query = template.render(&QueryParameters::new(date, horizon));
        debug!(horizon = %horizon, length = query.len(), "Rendered query");
        Ok(query)
    }
}
