//! Fetching every page of a paginated GitHub collection.
//!
//! GitHub announces the page count through the `Link` response header, e.g.
//! `<https://api.github.com/repos/o/r/pulls?page=2>; rel="next", <https://api.github.com/repos/o/r/pulls?page=5>; rel="last"`.
//! Page 1 is fetched alone; once the last page number is known the remaining
//! pages are fetched concurrently and stitched back together in page order.

use futures::stream::{self, StreamExt};
use reqwest::header::LINK;
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

use super::{decode_body, GithubError};
use crate::client::{ClientError, Response};

/// Knobs for [`fetch_all_pages`].
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Items per page requested from the API
    pub per_page: u32,
    /// Stop after this many pages
    pub max_pages: Option<u32>,
    /// Pages in flight at once
    pub max_concurrency: usize,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            per_page: 100,
            max_pages: None,
            max_concurrency: 8,
        }
    }
}

/// One fetched page, labelled with its number.
#[derive(Debug)]
struct Page {
    number: u32,
    response: Response,
}

/// Fetch all pages using `fetch_page(n)` and decode each as a JSON array of `T`,
/// concatenated in page order.
///
/// The first failing page aborts the whole fetch: pages still in flight are
/// dropped and nothing fetched so far is returned.
pub async fn fetch_all_pages<T, F, Fut>(
    fetch_page: F,
    options: &PageOptions,
) -> Result<Vec<T>, GithubError>
where
    T: DeserializeOwned,
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<Response, ClientError>>,
{
    let first = fetch_page(1).await?;
    let mut last = last_page(&first).unwrap_or(1);
    if let Some(max_pages) = options.max_pages {
        last = last.min(max_pages.max(1));
    }
    debug!(url = %first.url, last_page = last, "discovered page count");

    let mut pages = vec![Page {
        number: 1,
        response: first,
    }];

    if last > 1 {
        let mut rest = stream::iter(2..=last)
            .map(|number| {
                let fetched = fetch_page(number);
                async move { (number, fetched.await) }
            })
            .buffer_unordered(options.max_concurrency.max(1));

        while let Some((number, result)) = rest.next().await {
            let response = result.inspect_err(|err| {
                warn!(page = number, error = %err, "page fetch failed, dropping the remaining pages");
            })?;
            pages.push(Page { number, response });
        }
    }

    pages.sort_by_key(|page| page.number);

    let mut items = Vec::new();
    for page in &pages {
        let decoded: Vec<T> = decode_body(&page.response)?;
        items.extend(decoded);
    }
    Ok(items)
}

/// Page number of the `rel="last"` link, if the response has a usable one.
pub(crate) fn last_page(response: &Response) -> Option<u32> {
    let header = response.header(LINK)?;
    let target = link_url(header, "last")?;
    page_number(target)
}

/// Find the URL tagged with `rel` in a `Link` header value.
pub(crate) fn link_url<'a>(header: &'a str, rel: &str) -> Option<&'a str> {
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;
        let tagged = parts.any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .is_some_and(|rels| rels.trim_matches('"').split_whitespace().any(|r| r == rel))
        });
        tagged.then_some(target)
    })
}

fn page_number(target: &str) -> Option<u32> {
    let url = Url::parse(target).ok()?;
    let page = url
        .query_pairs()
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())?;
    page.parse().ok()
}
