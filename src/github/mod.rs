pub mod page;
pub mod types;

pub use page::{fetch_all_pages, PageOptions};
pub use types::{Comment, CommentKind, PullRequest, RepoName, Repository, Session, User};

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_LENGTH};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::client::{ClientError, HttpClient, Request, Response};

#[derive(Debug, Error)]
pub enum GithubError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected a response body. URL: {url}")]
    MissingBody { url: Url },

    #[error("Invalid repository: {0} (expected owner/name)")]
    InvalidRepo(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Everything the pipeline needs from GitHub.
#[async_trait]
pub trait Api: Send + Sync {
    /// Fetch the repository itself; doubles as a connectivity and credentials check.
    async fn repository(&self) -> Result<Session, GithubError>;

    /// Closed pull requests, most recent first, without details.
    /// `limit` keeps only that many and avoids requesting pages beyond them; zero means no limit.
    async fn closed_pull_requests(&self, limit: Option<usize>) -> Result<Vec<PullRequest>, GithubError>;

    /// Size of the pull request's diff in bytes.
    async fn diff_size(&self, number: u64) -> Result<u64, GithubError>;

    /// Users requested to review the pull request.
    async fn review_requests(&self, number: u64) -> Result<Vec<User>, GithubError>;

    /// All comments of one kind on the pull request.
    async fn comments(&self, number: u64, kind: CommentKind) -> Result<Vec<Comment>, GithubError>;
}

/// Parse an `owner/name` repository path.
pub fn parse_repo(raw: &str) -> Result<RepoName, GithubError> {
    let invalid = || GithubError::InvalidRepo(raw.to_string());
    let (owner, name) = raw.trim().split_once('/').ok_or_else(invalid)?;

    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if !valid(owner) || !valid(name) {
        return Err(invalid());
    }

    Ok(RepoName {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

/// Decode a JSON body, naming the URL when it is missing or malformed.
pub(crate) fn decode_body<T: DeserializeOwned>(response: &Response) -> Result<T, GithubError> {
    let body = response.body.as_ref().ok_or_else(|| GithubError::MissingBody {
        url: response.url.clone(),
    })?;
    serde_json::from_slice(body).map_err(|source| GithubError::Decode {
        url: response.url.clone(),
        source,
    })
}

/// The requested reviewers endpoint has answered both with a bare array
/// and with `{ "users": [...], "teams": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReviewRequests {
    Users(Vec<User>),
    Object { users: Vec<User> },
}

/// [`Api`] over the GitHub REST API (v3).
pub struct RestApi<C> {
    client: C,
    base_url: Url,
    repo: RepoName,
    page_options: PageOptions,
}

impl<C: HttpClient> RestApi<C> {
    pub fn new(client: C, api_url: &str, repo: RepoName, page_options: PageOptions) -> Result<Self, GithubError> {
        let mut base_url = Url::parse(api_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client,
            base_url,
            repo,
            page_options,
        })
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn endpoint(&self, path: &str) -> Result<Url, GithubError> {
        let relative = format!("repos/{}/{}{}", self.repo.owner, self.repo.name, path);
        Ok(self.base_url.join(&relative)?)
    }

    async fn get(&self, url: Url) -> Result<Response, GithubError> {
        Ok(self.client.send(&Request::get(url)).await?)
    }

    async fn get_all<T>(&self, path: &str, query: &[(&str, &str)], options: &PageOptions) -> Result<Vec<T>, GithubError>
    where
        T: DeserializeOwned + Send,
    {
        let mut base = self.endpoint(path)?;
        base.query_pairs_mut()
            .extend_pairs(query)
            .append_pair("per_page", &options.per_page.to_string());

        fetch_all_pages(
            |page| {
                let mut url = base.clone();
                url.query_pairs_mut().append_pair("page", &page.to_string());
                let request = Request::get(url);
                async move { self.client.send(&request).await }
            },
            options,
        )
        .await
    }
}

#[async_trait]
impl<C: HttpClient> Api for RestApi<C> {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn repository(&self) -> Result<Session, GithubError> {
        let response = self.get(self.endpoint("")?).await?;
        let repository: Repository = decode_body(&response)?;
        Ok(Session {
            repository,
            rate_limit: response.head().rate_limit(),
        })
    }

    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn closed_pull_requests(&self, limit: Option<usize>) -> Result<Vec<PullRequest>, GithubError> {
        let limit = limit.filter(|&limit| limit > 0);
        let mut options = self.page_options.clone();
        if let Some(limit) = limit {
            let per_page = options.per_page.max(1) as usize;
            options.max_pages = u32::try_from(limit.div_ceil(per_page)).ok();
        }

        let mut pulls: Vec<PullRequest> = self.get_all("/pulls", &[("state", "closed")], &options).await?;
        if let Some(limit) = limit {
            pulls.truncate(limit);
        }
        debug!(count = pulls.len(), "fetched closed pull requests");
        Ok(pulls)
    }

    async fn diff_size(&self, number: u64) -> Result<u64, GithubError> {
        let request = Request::get(self.endpoint(&format!("/pulls/{number}"))?)
            .with_header(ACCEPT, HeaderValue::from_static("application/vnd.github.diff"));
        let response = self.client.send(&request).await?;

        if let Some(length) = response.header(CONTENT_LENGTH).and_then(|v| v.parse().ok()) {
            return Ok(length);
        }
        let body = response.body.as_ref().ok_or_else(|| GithubError::MissingBody {
            url: response.url.clone(),
        })?;
        Ok(body.len() as u64)
    }

    async fn review_requests(&self, number: u64) -> Result<Vec<User>, GithubError> {
        let response = self
            .get(self.endpoint(&format!("/pulls/{number}/requested_reviewers"))?)
            .await?;
        Ok(match decode_body(&response)? {
            ReviewRequests::Users(users) | ReviewRequests::Object { users } => users,
        })
    }

    async fn comments(&self, number: u64, kind: CommentKind) -> Result<Vec<Comment>, GithubError> {
        let path = format!("/{}/{number}/comments", kind.resource());
        self.get_all(&path, &[], &self.page_options).await
    }
}
