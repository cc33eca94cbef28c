use thiserror::Error;
use tf_provider::{AttributePath, Diagnostics};

/// Failures surfaced by resources and data sources.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Api(#[from] roxywi_api::Error),

    #[error("provider not configured")]
    NotConfigured,

    #[error("invalid ID format: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Invalid(String),
}

impl ProviderError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_not_found())
    }

    /// Report as a root diagnostic.
    pub fn report(&self, diags: &mut Diagnostics, summary: &str) {
        diags.root_error(summary.to_owned(), self.to_string());
    }
}

/// Report an attribute-level error.
pub fn attribute_error(diags: &mut Diagnostics, attribute: &str, detail: impl Into<String>) {
    diags.error(
        format!("Invalid {attribute}"),
        detail.into(),
        AttributePath::new(attribute.to_owned()),
    );
}
