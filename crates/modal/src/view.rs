//! Render model of the result area

use serde::Serialize;
use sift_core::{Readiness, SearchResult, SiftError, SiftResult};
use sift_search::Query;

/// Shown while the engine is not ready.
pub const LOADING_MESSAGE: &str = "Search engine loading, please wait...";
/// Shown once initialization has failed.
pub const LOAD_ERROR_MESSAGE: &str = "Error loading search engine.";
/// Shown when a search call fails.
pub const SEARCH_ERROR_MESSAGE: &str = "An error occurred during search.";
/// Shown under the header when a search matched nothing.
pub const NO_RESULTS_MESSAGE: &str = "No results found";

/// What the result area currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultsView {
    /// Nothing (closed, or empty input)
    #[default]
    Empty,
    /// Engine still initializing
    Loading,
    /// The query matched nothing
    NoResults {
        /// Display form of the query
        header: String,
    },
    /// Hits, in module order
    Results {
        /// Display form of the query
        header: String,
        /// Resolved hits
        items: Vec<SearchResult>,
    },
    /// A user-facing failure message
    Error {
        /// Message to show
        message: String,
    },
}

impl ResultsView {
    /// Error view with `message`.
    pub fn error(message: &str) -> Self {
        ResultsView::Error {
            message: message.to_string(),
        }
    }

    /// View for the outcome of searching `query`.
    pub fn from_outcome(query: &Query, outcome: SiftResult<Vec<SearchResult>>) -> Self {
        match outcome {
            Ok(items) if items.is_empty() => ResultsView::NoResults {
                header: query.display(),
            },
            Ok(items) => ResultsView::Results {
                header: query.display(),
                items,
            },
            Err(SiftError::NotReady(Readiness::Failed)) => Self::error(LOAD_ERROR_MESSAGE),
            Err(SiftError::NotReady(_)) => ResultsView::Loading,
            Err(e) => {
                tracing::warn!(target: "sift::modal", query = %query, error = %e, "Search failed");
                Self::error(SEARCH_ERROR_MESSAGE)
            }
        }
    }

    /// Hits, empty unless this is a `Results` view.
    pub fn items(&self) -> &[SearchResult] {
        match self {
            ResultsView::Results { items, .. } => items.as_slice(),
            _ => &[],
        }
    }

    /// Query header, for result and no-result views.
    pub fn header(&self) -> Option<&str> {
        match self {
            ResultsView::NoResults { header } | ResultsView::Results { header, .. } => {
                Some(header.as_str())
            }
            _ => None,
        }
    }

    /// Status text, if the view shows one instead of hits.
    pub fn message(&self) -> Option<&str> {
        match self {
            ResultsView::Loading => Some(LOADING_MESSAGE),
            ResultsView::NoResults { .. } => Some(NO_RESULTS_MESSAGE),
            ResultsView::Error { message } => Some(message.as_str()),
            ResultsView::Empty | ResultsView::Results { .. } => None,
        }
    }
}
