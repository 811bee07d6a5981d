//! Filling in the details the pull request listing leaves out.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, instrument, warn};

use crate::cache::{cache_key, read_entry, write_entry, Cache};
use crate::github::{Api, CommentKind, GithubError, PullRequest};

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Records processed at once
    pub max_concurrency: usize,
    /// Use cached snapshots; when off every record is fetched again (and re-cached)
    pub read_cache: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            read_cache: true,
        }
    }
}

/// Fill diff size, review requests and both kinds of comments for every pull request,
/// reading through `cache`. `on_done` runs once per finished record.
///
/// The first failing record aborts the run and its error is returned. Records still
/// in flight are dropped, while records finished before the failure keep their details
/// in `pulls` and in the cache.
#[instrument(skip_all, fields(count = pulls.len()))]
pub async fn fill_details(
    api: &dyn Api,
    cache: &dyn Cache,
    pulls: &mut [PullRequest],
    options: &EnrichOptions,
    mut on_done: impl FnMut(),
) -> Result<(), GithubError> {
    let work: Vec<(usize, PullRequest)> = pulls.iter().cloned().enumerate().collect();

    let mut finished = stream::iter(work)
        .map(|(index, pull)| async move { (index, enrich(api, cache, pull, options.read_cache).await) })
        .buffer_unordered(options.max_concurrency.max(1));

    while let Some((index, result)) = finished.next().await {
        let pull = result.inspect_err(|err| {
            warn!(number = pulls[index].number, error = %err, "failed to fetch details, cancelling the rest");
        })?;
        pulls[index] = pull;
        on_done();
    }
    Ok(())
}

async fn enrich(api: &dyn Api, cache: &dyn Cache, mut pull: PullRequest, read_cache: bool) -> Result<PullRequest, GithubError> {
    let key = cache_key(pull.number);

    let cached = if read_cache {
        read_entry::<PullRequest>(cache, &key).await.unwrap_or_else(|err| {
            warn!(%key, error = %err, "ignoring unreadable cache entry");
            None
        })
    } else {
        None
    };

    if let Some(snapshot) = cached {
        debug!(%key, "cache hit");
        pull = snapshot;
    }
    if !pull.has_details() {
        fetch_missing(api, &mut pull).await?;
    }

    if let Err(err) = write_entry(cache, &key, &pull).await {
        warn!(%key, error = %err, "failed to cache pull request");
    }
    Ok(pull)
}

/// Fetch every detail field that is still unset, all at once.
async fn fetch_missing(api: &dyn Api, pull: &mut PullRequest) -> Result<(), GithubError> {
    let number = pull.number;
    let (diff_size, review_requests, review_comments, issue_comments) = tokio::try_join!(
        fetch_if(pull.diff_size.is_none(), || api.diff_size(number)),
        fetch_if(pull.review_requests.is_none(), || api.review_requests(number)),
        fetch_if(pull.review_comments.is_none(), || api.comments(number, CommentKind::Review)),
        fetch_if(pull.issue_comments.is_none(), || api.comments(number, CommentKind::Issue)),
    )?;

    if diff_size.is_some() {
        pull.diff_size = diff_size;
    }
    if review_requests.is_some() {
        pull.review_requests = review_requests;
    }
    if review_comments.is_some() {
        pull.review_comments = review_comments;
    }
    if issue_comments.is_some() {
        pull.issue_comments = issue_comments;
    }
    Ok(())
}

async fn fetch_if<T, F, Fut>(missing: bool, fetch: F) -> Result<Option<T>, GithubError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, GithubError>>,
{
    if !missing {
        return Ok(None);
    }
    fetch().await.map(Some)
}
