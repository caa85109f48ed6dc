//! Mutations and the invalidation table.
//!
//! Every mutation declares, in [`Mutation::invalidations`], which cached
//! queries become stale once the server confirms it. Nothing else in the
//! crate decides what to re-fetch after a write.

use std::fmt;

use url::Url;

use crate::{CrawledUrl, JobId, KeyPattern};

pub type MutationId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AddUrl { url: String },
    StartCrawl { id: JobId },
    StopCrawl { id: JobId },
    BulkDelete { ids: Vec<JobId> },
    BulkReanalyze { ids: Vec<JobId> },
}

impl Mutation {
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::AddUrl { .. } => "add url",
            Mutation::StartCrawl { .. } => "start crawl",
            Mutation::StopCrawl { .. } => "stop crawl",
            Mutation::BulkDelete { .. } => "delete",
            Mutation::BulkReanalyze { .. } => "reanalyze",
        }
    }

    /// Job ids the mutation targets. Empty for `AddUrl`.
    pub fn targets(&self) -> Vec<JobId> {
        match self {
            Mutation::AddUrl { .. } => Vec::new(),
            Mutation::StartCrawl { id } | Mutation::StopCrawl { id } => vec![*id],
            Mutation::BulkDelete { ids } | Mutation::BulkReanalyze { ids } => ids.clone(),
        }
    }

    /// Cache keys made stale by a successful run of this mutation.
    pub fn invalidations(&self) -> Vec<KeyPattern> {
        match self {
            Mutation::AddUrl { .. } | Mutation::StartCrawl { .. } | Mutation::StopCrawl { .. } => {
                vec![KeyPattern::AllUrls, KeyPattern::Stats]
            }
            Mutation::BulkDelete { ids } | Mutation::BulkReanalyze { ids } => vec![
                KeyPattern::AllUrls,
                KeyPattern::Stats,
                KeyPattern::AnalysisOf(ids.clone()),
            ],
        }
    }
}

/// What the server confirmed for a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Added(CrawledUrl),
    Started(JobId),
    Stopped(JobId),
    /// Ids the server actually deleted.
    Deleted(Vec<JobId>),
    /// Ids the server actually queued for reanalysis.
    Reanalyzed(Vec<JobId>),
}

impl MutationOutcome {
    /// Ids confirmed by a bulk outcome, `None` for single-entity outcomes.
    pub fn confirmed_ids(&self) -> Option<&[JobId]> {
        match self {
            MutationOutcome::Deleted(ids) | MutationOutcome::Reanalyzed(ids) => Some(ids),
            _ => None,
        }
    }
}

/// Requested ids the server did not confirm, in request order.
pub fn unconfirmed_ids(requested: &[JobId], confirmed: &[JobId]) -> Vec<JobId> {
    requested
        .iter()
        .filter(|id| !confirmed.contains(id))
        .copied()
        .collect()
}

/// Field-level problem with the add-URL input. Caught before any request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    Required,
    Malformed,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Required => write!(f, "URL is required"),
            ValidationError::Malformed => write!(f, "Enter a valid http(s) URL"),
        }
    }
}

/// Returns the trimmed URL if it is an absolute http(s) URL.
pub fn validate_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required);
    }
    let parsed = Url::parse(trimmed).map_err(|_| ValidationError::Malformed)?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ValidationError::Malformed);
    }
    Ok(trimmed.to_string())
}
