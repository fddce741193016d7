//! Remote repository search.
//!
//! A search yields a total-count hint plus a lazy sequence of hits. Pages are
//! only requested while the caller keeps iterating, so `take(n)` on a large
//! result set costs at most `ceil(n / per_page)` requests.

#[cfg(feature = "github")]
mod github;

#[cfg(feature = "github")]
pub use github::GithubSearch;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::RepositoryKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub owner: String,
    pub name: String,
    pub clone_url: String,
}

impl SearchHit {
    #[must_use]
    pub fn key(&self) -> RepositoryKey {
        RepositoryKey::new(&self.owner, &self.name)
    }
}

/// One page of results as returned by the remote.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub total_count: u64,
    pub hits: Vec<SearchHit>,
}

pub trait RepositorySearch {
    /// Runs `query` from the start, yielding at most `limit` hits. The first
    /// page is fetched eagerly so credential and query errors surface here.
    fn search(&self, query: &str, limit: usize) -> Result<SearchResults<'_>>;
}

pub struct SearchResults<'a> {
    total_count: u64,
    hits: Box<dyn Iterator<Item = Result<SearchHit>> + 'a>,
}

impl<'a> SearchResults<'a> {
    pub fn new(total_count: u64, hits: impl Iterator<Item = Result<SearchHit>> + 'a) -> Self {
        Self {
            total_count,
            hits: Box::new(hits),
        }
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }
}

impl Iterator for SearchResults<'_> {
    type Item = Result<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.hits.next()
    }
}

/// Iterates hits across pages, calling `fetch(page_number)` for pages after
/// the first. Stops after a short page, an empty page, `limit` hits, or the
/// first error.
pub struct Paged<F> {
    fetch: F,
    buffer: VecDeque<SearchHit>,
    next_page: u32,
    per_page: usize,
    remaining: u64,
    done: bool,
}

impl<F> Paged<F>
where
    F: FnMut(u32) -> Result<Page>,
{
    pub fn new(first: Page, per_page: usize, limit: u64, fetch: F) -> Self {
        let remaining = first.total_count.min(limit);
        let done = first.hits.len() < per_page;
        Self {
            fetch,
            buffer: first.hits.into(),
            next_page: 2,
            per_page,
            remaining,
            done,
        }
    }
}

impl<F> Iterator for Paged<F>
where
    F: FnMut(u32) -> Result<Page>,
{
    type Item = Result<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        if self.buffer.is_empty() {
            if self.done {
                return None;
            }
            match (self.fetch)(self.next_page) {
                Ok(page) => {
                    self.next_page += 1;
                    self.done = page.hits.len() < self.per_page;
                    self.buffer.extend(page.hits);
                }
                Err(e) => {
                    self.done = true;
                    self.remaining = 0;
                    return Some(Err(e));
                }
            }
        }

        let hit = self.buffer.pop_front()?;
        self.remaining -= 1;
        Some(Ok(hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn hits(range: std::ops::Range<u32>) -> Vec<SearchHit> {
        range
            .map(|i| SearchHit {
                owner: "owner".to_string(),
                name: format!("repo-{i}"),
                clone_url: format!("https://example.com/owner/repo-{i}.git"),
            })
            .collect()
    }

    #[test]
    fn test_paged_fetches_lazily() {
        let mut requested = Vec::new();
        let first = Page {
            total_count: 5,
            hits: hits(0..2),
        };

        let taken: Vec<_> = Paged::new(first, 2, u64::MAX, |page| {
            requested.push(page);
            let start = (page - 1) * 2;
            Ok(Page {
                total_count: 5,
                hits: hits(start..(start + 2).min(5)),
            })
        })
        .take(3)
        .collect::<Result<Vec<_>>>()
        .unwrap();

        assert_eq!(taken.len(), 3);
        assert_eq!(taken[2].name, "repo-2");
        assert_eq!(requested, vec![2]);
    }

    #[test]
    fn test_paged_stops_on_short_page() {
        let first = Page {
            total_count: 100,
            hits: hits(0..2),
        };
        let mut calls = 0;
        let all: Vec<_> = Paged::new(first, 2, u64::MAX, |_| {
            calls += 1;
            Ok(Page {
                total_count: 100,
                hits: hits(2..3),
            })
        })
        .collect::<Result<Vec<_>>>()
        .unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_paged_respects_limit() {
        let first = Page {
            total_count: 5000,
            hits: hits(0..3),
        };
        let all: Vec<_> = Paged::new(first, 3, 4, |page| {
            let start = (page - 1) * 3;
            Ok(Page {
                total_count: 5000,
                hits: hits(start..start + 3),
            })
        })
        .collect::<Result<Vec<_>>>()
        .unwrap();

        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_paged_surfaces_error_once() {
        let first = Page {
            total_count: 10,
            hits: hits(0..1),
        };
        let mut paged = Paged::new(first, 1, u64::MAX, |_| {
            Err(Error::Remote("rate limited".to_string()))
        });

        assert!(matches!(paged.next(), Some(Ok(_))));
        assert!(matches!(paged.next(), Some(Err(Error::Remote(_)))));
        assert!(paged.next().is_none());
    }

    #[test]
    fn test_search_results_reports_total() {
        let results = SearchResults::new(42, hits(0..2).into_iter().map(Ok));
        assert_eq!(results.total_count(), 42);
        assert_eq!(results.count(), 2);
    }
}
