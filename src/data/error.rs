use std::error::Error as StdError;

use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by the data layer.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The source could not be read or lacks the required schema.
    #[error("ingest error: {context}")]
    Ingest {
        context: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A filter spec names an unknown field or carries an impossible constraint.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// An aggregation or projection parameter is out of domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

impl CatalogError {
    /// An ingest failure with no underlying cause.
    pub fn ingest(context: impl Into<String>) -> Self {
        CatalogError::Ingest {
            context: context.into(),
            source: None,
        }
    }

    pub fn is_ingest(&self) -> bool {
        matches!(self, CatalogError::Ingest { .. })
    }

    pub fn is_invalid_filter(&self) -> bool {
        matches!(self, CatalogError::InvalidFilter(_))
    }

    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, CatalogError::InvalidParameter(_))
    }
}

/// `anyhow::Context`-style helper that wraps foreign errors as [`CatalogError::Ingest`].
pub trait IngestContext<T> {
    fn ingest_context(self, context: &str) -> Result<T>;

    fn with_ingest_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E> IngestContext<T> for std::result::Result<T, E>
where
    E: Into<BoxError>,
{
    fn ingest_context(self, context: &str) -> Result<T> {
        self.map_err(|e| CatalogError::Ingest {
            context: context.to_string(),
            source: Some(e.into()),
        })
    }

    fn with_ingest_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| CatalogError::Ingest {
            context: f(),
            source: Some(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_ingest_context_keeps_source() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = res.ingest_context("opening CSV").unwrap_err();
        assert!(err.is_ingest());
        assert_eq!(err.to_string(), "ingest error: opening CSV");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("no such file"));
    }

    #[test]
    fn test_kind_predicates() {
        assert!(CatalogError::InvalidFilter("x".into()).is_invalid_filter());
        assert!(CatalogError::InvalidParameter("x".into()).is_invalid_parameter());
        assert!(!CatalogError::ingest("x").is_invalid_filter());
    }
}
