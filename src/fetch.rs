//! Retrieval of reference files that may live on a remote host.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::DataLoadError;

/// Where a reference file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source<'a> {
    Url(&'a str),
    File(&'a Path),
}

impl<'a> Source<'a> {
    /// `http://` and `https://` locations are fetched, anything else is a
    /// local path.
    pub fn parse(location: &'a str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location)
        } else {
            Source::File(Path::new(location))
        }
    }
}

/// Blocking fetcher with a fixed request timeout. A failed or timed-out
/// request is an error; nothing is retried.
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Read the whole body of `location` as text.
    pub fn fetch_text(&self, location: &str, dataset: &str) -> Result<String, DataLoadError> {
        match Source::parse(location) {
            Source::File(path) => std::fs::read_to_string(path).map_err(|source| DataLoadError::Io {
                dataset: dataset.to_string(),
                path: path.to_path_buf(),
                source,
            }),
            Source::Url(url) => {
                log::info!("Fetching {dataset} from {url}");
                let remote_err = |e: reqwest::Error| DataLoadError::Remote {
                    dataset: dataset.to_string(),
                    url: url.to_string(),
                    reason: e.to_string(),
                };
                self.client
                    .get(url)
                    .send()
                    .and_then(reqwest::blocking::Response::error_for_status)
                    .and_then(reqwest::blocking::Response::text)
                    .map_err(remote_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_are_classified() {
        assert_eq!(
            Source::parse("https://example.org/deaths.csv"),
            Source::Url("https://example.org/deaths.csv")
        );
        assert_eq!(
            Source::parse("data/deaths.csv"),
            Source::File(Path::new("data/deaths.csv"))
        );
    }

    #[test]
    fn local_files_bypass_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deaths.csv");
        std::fs::write(&path, "Country,Year\n").unwrap();

        let fetcher = Fetcher::new(Duration::from_secs(1)).unwrap();
        let text = fetcher.fetch_text(path.to_str().unwrap(), "deaths").unwrap();
        assert_eq!(text, "Country,Year\n");

        let missing = dir.path().join("missing.csv");
        let err = fetcher
            .fetch_text(missing.to_str().unwrap(), "deaths")
            .unwrap_err();
        assert_eq!(err.dataset(), "deaths");
    }
}
