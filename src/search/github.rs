use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{Page, Paged, RepositorySearch, SearchHit, SearchResults};
use crate::config::SearchSettings;
use crate::error::{Error, Result};

/// The search API never returns more than this many results for one query.
const MAX_RESULTS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    items: Vec<RepositoryItem>,
}

#[derive(Debug, Deserialize)]
struct RepositoryItem {
    name: String,
    owner: OwnerItem,
    clone_url: String,
}

#[derive(Debug, Deserialize)]
struct OwnerItem {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

impl From<SearchResponse> for Page {
    fn from(resp: SearchResponse) -> Self {
        Page {
            total_count: resp.total_count,
            hits: resp
                .items
                .into_iter()
                .map(|item| SearchHit {
                    owner: item.owner.login,
                    name: item.name,
                    clone_url: item.clone_url,
                })
                .collect(),
        }
    }
}

/// [`RepositorySearch`] against the GitHub REST search endpoint.
pub struct GithubSearch {
    client: Client,
    base_url: String,
    sort: String,
    per_page: u32,
    token: Option<String>,
}

impl GithubSearch {
    pub fn new(settings: &SearchSettings, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Remote(e.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            sort: settings.sort.clone(),
            per_page: settings.per_page,
            token,
        })
    }

    /// Page size for a search that keeps `limit` hits.
    fn page_size(&self, limit: usize) -> u32 {
        u32::try_from(limit)
            .unwrap_or(u32::MAX)
            .clamp(1, self.per_page.max(1))
    }

    fn fetch_page(&self, query: &str, page: u32, per_page: u32) -> Result<Page> {
        let url = format!("{}/search/repositories", self.base_url);
        let per_page = per_page.to_string();
        let page_number = page.to_string();

        let mut request = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", query),
                ("sort", self.sort.as_str()),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
                ("page", page_number.as_str()),
            ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().map_err(|e| Error::Remote(e.to_string()))?;
        handle_response(resp)
    }
}

fn handle_response(resp: reqwest::blocking::Response) -> Result<Page> {
    let status = resp.status();
    if status.is_success() {
        let body: SearchResponse = resp.json().map_err(|e| Error::Remote(e.to_string()))?;
        return Ok(body.into());
    }

    let message = resp
        .json::<ErrorResponse>()
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| "no details provided".to_string());

    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Credential(message)),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => Err(Error::Remote(format!(
            "request refused ({status}): {message}"
        ))),
        _ => Err(Error::Remote(format!("{status}: {message}"))),
    }
}

impl RepositorySearch for GithubSearch {
    fn search(&self, query: &str, limit: usize) -> Result<SearchResults<'_>> {
        let per_page = self.page_size(limit);
        let first = self.fetch_page(query, 1, per_page)?;
        let total_count = first.total_count;
        tracing::debug!("Search '{query}' reports {total_count} repositories");

        let query = query.to_string();
        let limit = u64::try_from(limit).unwrap_or(u64::MAX).min(MAX_RESULTS);
        let hits = Paged::new(first, per_page as usize, limit, move |page| {
            self.fetch_page(&query, page, per_page)
        });
        Ok(SearchResults::new(total_count, hits))
    }
}
