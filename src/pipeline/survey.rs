//! Batch orchestration: border filter, rate-limited lookups, matching.

use indicatif::ProgressBar;
use tracing::{info, warn};

use super::RateLimiter;
use crate::matcher::SettlementMatcher;
use crate::models::{CandidateRecord, MatchResult};
use crate::overpass::SettlementLookup;
use crate::pip::PointFilter;

/// Default search radius around each origin, in kilometers
pub const DEFAULT_RADIUS_KM: f64 = 100.0;

/// One batch run over a set of candidate points.
///
/// Origins are processed strictly one after another. A failed lookup only
/// empties that origin's match set.
pub struct Survey<'a, L> {
    filter: PointFilter<'a>,
    matcher: SettlementMatcher<'a>,
    lookup: L,
    limiter: RateLimiter,
    radius_km: f64,
    parallel_filter: bool,
    progress: ProgressBar,
}

impl<'a, L: SettlementLookup> Survey<'a, L> {
    pub fn new(filter: PointFilter<'a>, matcher: SettlementMatcher<'a>, lookup: L) -> Self {
        Self {
            filter,
            matcher,
            lookup,
            limiter: RateLimiter::default(),
            radius_km: DEFAULT_RADIUS_KM,
            parallel_filter: false,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_parallel_filter(mut self, parallel: bool) -> Self {
        self.parallel_filter = parallel;
        self
    }

    /// Report per-origin progress on this bar; its length is set by `run`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Filter the candidates to the border and match settlements around
    /// each survivor. Results are in filtered input order.
    pub async fn run(&mut self, candidates: Vec<CandidateRecord>) -> Vec<MatchResult> {
        let origins = if self.parallel_filter {
            self.filter.filter_parallel(candidates)
        } else {
            self.filter.filter(candidates)
        };
        info!("Points left after border filtering: {}", origins.len());

        self.progress.set_length(origins.len() as u64);

        let mut results = Vec::with_capacity(origins.len());
        for origin in origins {
            let result = self.survey_origin(origin).await;
            self.progress.inc(1);
            results.push(result);
        }

        let total: usize = results.iter().map(|r| r.matches.len()).sum();
        self.progress.finish_with_message("Survey complete");
        info!(
            "Survey complete: {} origins, {} settlement pairs",
            results.len(),
            total
        );

        results
    }

    async fn survey_origin(&mut self, origin: CandidateRecord) -> MatchResult {
        info!("Processing origin: {}", origin.name);
        self.limiter.acquire().await;

        let location = origin.location.normalize();
        let looked_up = self
            .lookup
            .lookup(location.lat, location.lon, self.radius_km)
            .await;
        self.limiter.release();

        match looked_up {
            Ok(raw) => {
                let matches = self.matcher.match_settlements(&origin, raw);
                MatchResult::new(origin, matches)
            }
            Err(e) => {
                warn!("Settlement lookup failed for {}: {}", origin.name, e);
                MatchResult::empty(origin)
            }
        }
    }
}
