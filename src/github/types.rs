use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::client::RateLimitInfo;

/// A closed pull request as listed by the GitHub API.
/// The `Option` detail fields are filled later by the enricher (or straight from the cache)
/// and are never fetched again once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number, the identity of the record
    pub number: u64,
    /// Description text; GitHub sends `null` for an empty one
    #[serde(default)]
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Author
    pub user: User,
    /// "open" or "closed"
    pub state: String,
    #[serde(default)]
    pub assignees: Vec<User>,
    /// Size of the diff in bytes
    #[serde(default)]
    pub diff_size: Option<u64>,
    /// Users asked to review
    #[serde(default)]
    pub review_requests: Option<Vec<User>>,
    /// Comments left on the diff
    #[serde(default)]
    pub review_comments: Option<Vec<Comment>>,
    /// Comments left on the conversation
    #[serde(default)]
    pub issue_comments: Option<Vec<Comment>>,
}

impl PullRequest {
    /// Closed by merging rather than just closed.
    pub fn is_merged(&self) -> bool {
        self.state == "closed" && self.merged_at.is_some()
    }

    /// Review and issue comments together; empty while details are missing.
    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.review_comments
            .iter()
            .chain(self.issue_comments.iter())
            .flatten()
    }

    /// Whether every detail field has been filled.
    pub fn has_details(&self) -> bool {
        self.diff_size.is_some()
            && self.review_requests.is_some()
            && self.review_comments.is_some()
            && self.issue_comments.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

/// A review or issue comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: User,
    #[serde(default)]
    pub body: String,
}

/// The two comment endpoints GitHub keeps for a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// Comments on the diff (`/pulls/{n}/comments`)
    Review,
    /// Conversation comments (`/issues/{n}/comments`)
    Issue,
}

impl CommentKind {
    pub(crate) fn resource(self) -> &'static str {
        match self {
            CommentKind::Review => "pulls",
            CommentKind::Issue => "issues",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

/// Outcome of the connectivity check: the repository plus the quota left for this session.
#[derive(Debug, Clone)]
pub struct Session {
    pub repository: Repository,
    pub rate_limit: Option<RateLimitInfo>,
}

/// A repository path in the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoName {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
