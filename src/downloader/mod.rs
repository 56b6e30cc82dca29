//! Subtitle sites.
//!
//! Sites are registered explicitly in a [`DownloaderRegistry`]. Searching a
//! site starts with the full keyword query and drops trailing keywords until
//! enough results turn up.

mod library;
mod site;

pub use library::LibraryDownloader;
pub use site::{Download, DownloadKind, Downloader};

use tracing::{debug, warn};

use crate::config::Config;
use crate::keywords::Keywords;
use crate::select::{rank_search_results, SearchResult, SearchResults};
use crate::Error;

/// Add `result` to `results`. A result whose name is already present
/// replaces the earlier one in place.
fn merge_result(results: &mut SearchResults, result: SearchResult) {
    match results.iter_mut().find(|r| r.name == result.name) {
        Some(existing) => *existing = result,
        None => results.push(result),
    }
}

/// Search one site, narrowing the query until `limit` results are found or
/// only the title is left. Results are ranked and truncated to `limit`.
pub fn search_site(
    downloader: &dyn Downloader,
    keywords: &Keywords,
    limit: usize,
) -> Result<SearchResults, Error> {
    let mut keywords = keywords.clone();
    let mut results = SearchResults::new();

    loop {
        let query = keywords.query();
        debug!(site = downloader.name(), %query, "searching");

        for result in downloader.search(&query)? {
            merge_result(&mut results, result);
        }

        if results.len() >= limit {
            break;
        }
        match keywords.narrow() {
            Some(dropped) => debug!(site = downloader.name(), %dropped, "too few results, narrowing"),
            None => break,
        }
    }

    let mut ranked = rank_search_results(results);
    ranked.truncate(limit);
    Ok(ranked)
}

/// Ordered set of sites.
pub struct DownloaderRegistry {
    downloaders: Vec<Box<dyn Downloader>>,
}

impl DownloaderRegistry {
    pub fn new() -> Self {
        Self {
            downloaders: Vec::new(),
        }
    }

    /// Add a site after the existing ones.
    pub fn register<D: Downloader + 'static>(&mut self, downloader: D) {
        self.downloaders.push(Box::new(downloader));
    }

    /// Sites enabled by `config`, narrowed to `config.downloader` if set.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut registry = Self::new();
        if let Some(library) = &config.library {
            registry.register(LibraryDownloader::new(library));
        }

        match &config.downloader {
            Some(name) => registry.only(name),
            None => Ok(registry),
        }
    }

    /// Keep only the site called `name`.
    pub fn only(mut self, name: &str) -> Result<Self, Error> {
        if self.get(name).is_none() {
            return Err(Error::UnknownDownloader {
                name: name.to_string(),
                available: self.names().join(", "),
            });
        }
        self.downloaders.retain(|d| d.name() == name);
        Ok(self)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.downloaders.iter().map(|d| d.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Downloader> {
        self.downloaders
            .iter()
            .find(|d| d.name() == name)
            .map(|d| d.as_ref())
    }

    pub fn by_choice_prefix(&self, prefix: &str) -> Option<&dyn Downloader> {
        self.downloaders
            .iter()
            .find(|d| d.choice_prefix() == prefix)
            .map(|d| d.as_ref())
    }

    /// The site a result came from, read off the `[PREFIX]` of its name.
    pub fn for_result(&self, result: &SearchResult) -> Option<&dyn Downloader> {
        if !result.name.starts_with('[') {
            return None;
        }
        let end = result.name.find(']')?;
        self.by_choice_prefix(&result.name[..=end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Downloader> {
        self.downloaders.iter().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.downloaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloaders.is_empty()
    }

    /// Search sites in order until `limit` results have been collected.
    ///
    /// A failing site is logged and skipped.
    pub fn search_all(&self, keywords: &Keywords, limit: usize) -> SearchResults {
        let mut results = SearchResults::new();

        for downloader in self.iter() {
            match search_site(downloader, keywords, limit) {
                Ok(found) => {
                    for result in found {
                        merge_result(&mut results, result);
                    }
                }
                Err(e) => {
                    warn!(site = downloader.name(), error = %e, "search failed, trying next site");
                    continue;
                }
            }

            if results.len() >= limit {
                break;
            }
        }

        results
    }
}

impl Default for DownloaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
