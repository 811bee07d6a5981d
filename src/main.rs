mod cache;
mod client;
mod config;
mod enrich;
mod github;
mod report;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use crate::cache::FsCache;
use crate::client::ReqwestTransport;
use crate::enrich::EnrichOptions;
use crate::github::{Api, RestApi};

const PROGRESS_TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} pull requests";

/// PR Harvest: fetches the closed pull requests of a GitHub repository together
/// with their diff size, requested reviewers and comments.
#[derive(Parser, Debug)]
#[command(name = "pr-harvest", version, about)]
struct Cli {
    /// Repository as owner/name (e.g., rust-lang/cargo)
    repo: String,

    /// Only the N most recently closed pull requests
    #[arg(short, long)]
    limit: Option<usize>,

    /// Ignore cached pull requests and fetch everything again
    #[arg(long)]
    reset: bool,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log every HTTP request
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let repo = github::parse_repo(&cli.repo)?;
    let _main_span = info_span!("pr_harvest", repo = %repo).entered();

    info!("loading configuration");
    let config = config::Config::load()?;

    let client = client::build(ReqwestTransport::new(), config.client_options(cli.verbose)?);
    let api = RestApi::new(client, config.api_url(), repo.clone(), config.page_options())?;

    info!("checking connectivity");
    let session = api.repository().await?;
    info!(repository = %session.repository.full_name, "connected");
    if let Some(rate_limit) = &session.rate_limit {
        report::print_rate_limit(rate_limit);
    }

    info!("fetching closed pull requests");
    let mut pulls = api.closed_pull_requests(cli.limit).await?;
    info!(count = pulls.len(), "fetched pull request listing");

    let cache = FsCache::new(config.cache_dir(&repo));
    debug!(dir = %cache.dir().display(), reset = cli.reset, "using cache");
    let options = EnrichOptions {
        max_concurrency: config.fetch.max_concurrency,
        read_cache: !cli.reset,
    };

    let progress = ProgressBar::new(pulls.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)?
            .progress_chars("=> "),
    );
    let filled = enrich::fill_details(&api, &cache, &mut pulls, &options, || progress.inc(1)).await;
    progress.finish_and_clear();
    filled?;
    info!("details complete");

    let last_response = api.client().last_response();
    if let Some(head) = &last_response {
        debug!(status = %head.status, "last response");
    }
    let rate_limit = last_response.and_then(|head| head.rate_limit());
    let built_report = report::build(&session.repository.full_name, &pulls, rate_limit);
    report::output(&built_report, cli.output.as_deref())?;
    info!(total = built_report.total, merged = built_report.merged, "done");

    Ok(())
}

/// `RUST_LOG` wins when set. Otherwise warnings always show and `--verbose` adds
/// the per-request lines.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{dummy_request, successful_response, ScriptedClient};
    use crate::client::{Client, HttpClient};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    async fn log_one_request(verbose: bool) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(default_directive(verbose)))
            .with_ansi(false)
            .with_writer({
                let captured = captured.clone();
                move || captured.clone()
            })
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = Client::new(ScriptedClient::always(successful_response), verbose);
        client.send(&dummy_request()).await.unwrap();
        tracing::warn!("cache entry unreadable");
        captured.text()
    }

    #[tokio::test]
    async fn test_verbose_logs_every_request() {
        let output = log_one_request(true).await;
        assert!(output.contains("DONE"));
        assert!(output.contains("http://example.com/url1"));
    }

    #[tokio::test]
    async fn test_warnings_show_without_verbose() {
        let output = log_one_request(false).await;
        assert!(output.contains("cache entry unreadable"));
        assert!(!output.contains("DONE"));
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["pr-harvest", "octo/widgets", "--limit", "5", "--reset", "-v"]);
        assert_eq!(cli.repo, "octo/widgets");
        assert_eq!(cli.limit, Some(5));
        assert!(cli.reset);
        assert!(cli.verbose);
        assert!(cli.output.is_none());
    }
}
