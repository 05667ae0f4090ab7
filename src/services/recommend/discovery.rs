use std::collections::HashSet;
use std::sync::Arc;

use rand::{seq::SliceRandom, Rng};

use crate::{
    error::AppResult,
    models::{Candidate, DiscoverStrategy, MediaType},
    services::providers::CatalogProvider,
};

/// Sequential pages collect this many times the target
const OVER_DISCOVER_FACTOR: f64 = 1.5;
/// Randomly sampled pages add this fraction of the target on top
const SCATTER_FACTOR: f64 = 0.5;
/// Pages past this one are never sampled
const MAX_SCATTER_PAGE: u32 = 50;
/// Re-rolls allowed when a sampled page was already visited
const PAGE_PICK_RETRIES: u32 = 5;

/// One discovery pass: a listing plus the share of the total it should fill
#[derive(Debug, Clone)]
pub struct Discovery {
    pub media_type: MediaType,
    pub strategy: DiscoverStrategy,
    pub percentage: f64,
    pub total_to_recommend: f64,
    pub start_page: u32,
}

impl Discovery {
    pub fn new(
        media_type: MediaType,
        strategy: DiscoverStrategy,
        percentage: f64,
        total_to_recommend: f64,
    ) -> Self {
        Self {
            media_type,
            strategy,
            percentage,
            total_to_recommend,
            start_page: 1,
        }
    }

    fn target(&self) -> f64 {
        let target = self.total_to_recommend * self.percentage;
        if target.is_finite() && target > 0.0 {
            target
        } else {
            0.0
        }
    }

    /// Number of candidates the pass returns
    pub fn target_count(&self) -> usize {
        self.target().floor() as usize
    }
}

/// Pulls candidates from paged catalog listings
///
/// Pages are read in order until `target * 1.5` eligible candidates are
/// collected, then up to `target * 0.5` more come from randomly sampled pages
/// further in. The pool is shuffled and cut to `floor(target)`, so repeated
/// runs over the same catalog do not keep proposing the top of the list.
#[derive(Clone)]
pub struct CandidateDiscoverer {
    catalog: Arc<dyn CatalogProvider>,
}

impl CandidateDiscoverer {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    pub async fn discover(
        &self,
        discovery: &Discovery,
        exclude: &HashSet<i64>,
    ) -> AppResult<Vec<Candidate>> {
        let target_count = discovery.target_count();
        if target_count == 0 {
            return Ok(Vec::new());
        }

        let to_discover = (discovery.target() * OVER_DISCOVER_FACTOR).ceil() as usize;
        let to_scatter = (discovery.target() * SCATTER_FACTOR).ceil() as usize;
        let mut pool = CandidatePool::new(exclude);

        let mut page = discovery.start_page.max(1);
        let mut total_pages: Option<u32> = None;
        while pool.len() < to_discover {
            if total_pages.is_some_and(|total| page > total) {
                break;
            }

            let listing = self
                .catalog
                .discover(discovery.media_type, &discovery.strategy, page)
                .await?;
            total_pages = Some(listing.total_pages);
            pool.accept(listing.results, to_discover);
            page += 1;
        }

        let last_page = total_pages.unwrap_or(0).min(MAX_SCATTER_PAGE);
        if last_page >= page {
            let scatter_limit = pool.len() + to_scatter;
            let mut visited = HashSet::new();

            while pool.len() < scatter_limit {
                let Some(sampled) = random_unvisited_page(page, last_page, &visited) else {
                    tracing::debug!(
                        strategy = discovery.strategy.name(),
                        first_page = page,
                        last_page,
                        "No unvisited page left to sample"
                    );
                    break;
                };
                visited.insert(sampled);

                let listing = self
                    .catalog
                    .discover(discovery.media_type, &discovery.strategy, sampled)
                    .await?;
                pool.accept(listing.results, scatter_limit);
            }
        }

        let found = pool.len();
        let candidates = pool.into_sample(target_count);

        tracing::debug!(
            media_type = %discovery.media_type,
            strategy = discovery.strategy.name(),
            found,
            returned = candidates.len(),
            "Discovery pass finished"
        );

        Ok(candidates)
    }
}

/// Eligible, unique, not excluded candidates in arrival order
struct CandidatePool<'a> {
    exclude: &'a HashSet<i64>,
    seen: HashSet<i64>,
    candidates: Vec<Candidate>,
}

impl<'a> CandidatePool<'a> {
    fn new(exclude: &'a HashSet<i64>) -> Self {
        Self {
            exclude,
            seen: HashSet::new(),
            candidates: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Adds results in order until the pool holds `limit` candidates
    fn accept(&mut self, results: Vec<Candidate>, limit: usize) {
        for candidate in results {
            if self.candidates.len() >= limit {
                break;
            }
            if !candidate.is_eligible() || self.exclude.contains(&candidate.id) {
                continue;
            }
            if self.seen.insert(candidate.id) {
                self.candidates.push(candidate);
            }
        }
    }

    fn into_sample(self, count: usize) -> Vec<Candidate> {
        let mut candidates = self.candidates;
        candidates.shuffle(&mut rand::thread_rng());
        candidates.truncate(count);
        candidates
    }
}

fn random_unvisited_page(first: u32, last: u32, visited: &HashSet<u32>) -> Option<u32> {
    pick_unvisited_page(&mut rand::thread_rng(), first, last, visited)
}

/// Picks a page in `first..=last` not in `visited`
///
/// Gives up after `PAGE_PICK_RETRIES` re-rolls, or at once when every page in
/// the range has been visited.
pub fn pick_unvisited_page<R: Rng>(
    rng: &mut R,
    first: u32,
    last: u32,
    visited: &HashSet<u32>,
) -> Option<u32> {
    if first > last {
        return None;
    }
    let range_len = (last - first) as usize + 1;
    if (first..=last).filter(|p| visited.contains(p)).count() >= range_len {
        return None;
    }

    let mut page = rng.gen_range(first..=last);
    let mut retries = 0;
    while visited.contains(&page) {
        if retries >= PAGE_PICK_RETRIES {
            return None;
        }
        page = rng.gen_range(first..=last);
        retries += 1;
    }
    Some(page)
}
