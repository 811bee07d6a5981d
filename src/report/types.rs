use crate::client::RateLimitInfo;
use crate::github::PullRequest;

/// How a closed pull request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrState {
    Merged,
    Closed,
    Open,
}

impl PrState {
    pub fn of(pr: &PullRequest) -> Self {
        if pr.is_merged() {
            PrState::Merged
        } else if pr.state == "closed" {
            PrState::Closed
        } else {
            PrState::Open
        }
    }
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Merged => write!(f, "MERGED"),
            PrState::Closed => write!(f, "CLOSED"),
            PrState::Open => write!(f, "OPEN"),
        }
    }
}

/// One line of the listing.
#[derive(Debug, Clone)]
pub struct PullRequestRow {
    pub number: u64,
    pub author: String,
    pub state: PrState,
    /// Diff size in bytes, unknown if details were not fetched
    pub diff_size: Option<u64>,
    /// Number of requested reviewers
    pub review_requests: usize,
    /// Review plus issue comments
    pub comments: usize,
}

/// Everything printed at the end of a run.
#[derive(Debug)]
pub struct Report {
    /// `owner/name`
    pub repository: String,
    /// Quota as reported by the last response
    pub rate_limit: Option<RateLimitInfo>,
    pub rows: Vec<PullRequestRow>,
    pub total: usize,
    pub merged: usize,
}
