//! Recommendation engine: watch-history weighting, catalog discovery and list planning

pub mod discovery;
pub mod planner;
pub mod seeds;
pub mod weights;

pub use discovery::{CandidateDiscoverer, Discovery};
pub use planner::{RecommendSummary, RecommendationPlanner};
pub use weights::{weigh_genres_and_production_year, weigh_watched};
