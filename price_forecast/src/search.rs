//! Automatic order selection
//!
//! Two branches are searched: one with seasonal terms of period `m` and one
//! without. Each branch fixes its differencing orders first and then walks the
//! `(p, q, P, Q)` space stepwise, keeping the candidate with the lowest AIC.
//! The seasonal winner is only preferred when its AIC is strictly lower.

use crate::data::{TimeSeries, MIN_OBSERVATIONS};
use crate::error::{ForecastError, Result};
use crate::models::{FitOptions, ModelOrder, Sarima, SeasonalOrder};
use crate::store::{CommodityModelSpec, ParamStore};
use chrono::Local;
use price_math::differencing::seasonal_difference;
use price_math::stationarity::{suggest_differencing, suggest_seasonal_differencing};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Bounds of the order search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSpace {
    pub max_p: usize,
    pub max_d: usize,
    pub max_q: usize,
    #[serde(rename = "max_P")]
    pub max_seasonal_p: usize,
    #[serde(rename = "max_D")]
    pub max_seasonal_d: usize,
    #[serde(rename = "max_Q")]
    pub max_seasonal_q: usize,
    /// Seasonal period
    pub m: usize,
    /// Upper bound on `p + q + P + Q`
    pub max_order: usize,
    /// Stepwise walk when true, full grid otherwise
    pub stepwise: bool,
    /// Cap on the number of models fitted per branch
    pub max_models: usize,
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_d: 2,
            max_q: 5,
            max_seasonal_p: 2,
            max_seasonal_d: 1,
            max_seasonal_q: 2,
            m: 52,
            max_order: 5,
            stepwise: true,
            max_models: 60,
        }
    }
}

/// `(p, q, P, Q)` of a candidate; differencing is fixed per branch
type Key = (usize, usize, usize, usize);

/// One fitted candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub order: ModelOrder,
    pub seasonal_order: SeasonalOrder,
    pub aic: f64,
    pub bic: f64,
    pub converged: bool,
}

/// Result of one search branch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BranchResult {
    /// Lowest-AIC candidate, if any candidate could be fitted
    pub best: Option<Candidate>,
    /// Number of fits attempted, failures included; infeasible orders are
    /// skipped without being counted
    pub models_fitted: usize,
}

/// Result of both branches, before anything is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub seasonal: BranchResult,
    pub non_seasonal: BranchResult,
    /// Winner across branches
    pub winner: Candidate,
}

/// Committed outcome of a tuning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningOutcome {
    pub commodity: String,
    /// The specification written to the store
    pub spec: CommodityModelSpec,
    pub aic_seasonal: Option<f64>,
    pub aic_non_seasonal: Option<f64>,
    /// Models fitted across both branches
    pub models_fitted: usize,
}

/// Pick the winner across branches; ties go to the non-seasonal candidate
pub fn select_winner(seasonal: Option<&Candidate>, non_seasonal: Option<&Candidate>) -> Option<Candidate> {
    match (seasonal, non_seasonal) {
        (Some(s), Some(n)) if s.aic < n.aic => Some(s.clone()),
        (_, Some(n)) => Some(n.clone()),
        (Some(s), None) => Some(s.clone()),
        (None, None) => None,
    }
}

/// Order search over a series
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSearch {
    space: SearchSpace,
    fit_options: FitOptions,
    min_observations: usize,
}

impl OrderSearch {
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            fit_options: FitOptions::default(),
            min_observations: MIN_OBSERVATIONS,
        }
    }

    pub fn with_fit_options(mut self, fit_options: FitOptions) -> Self {
        self.fit_options = fit_options;
        self
    }

    pub fn with_min_observations(mut self, min_observations: usize) -> Self {
        self.min_observations = min_observations;
        self
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Run both branches and pick the winner without touching any store
    pub fn run(&self, series: &TimeSeries) -> Result<SearchResult> {
        series.ensure_modelable(self.min_observations)?;

        let seasonal = if self.space.m >= 2 {
            self.branch(series, true)?
        } else {
            BranchResult::default()
        };
        let non_seasonal = self.branch(series, false)?;

        let winner = select_winner(seasonal.best.as_ref(), non_seasonal.best.as_ref())
            .ok_or_else(|| {
                ForecastError::SearchExhausted(format!(
                    "No candidate could be fitted ({} models tried)",
                    seasonal.models_fitted + non_seasonal.models_fitted
                ))
            })?;

        Ok(SearchResult {
            seasonal,
            non_seasonal,
            winner,
        })
    }

    /// Search, then commit the winner for `commodity` to `store`.
    ///
    /// Nothing is written unless the search succeeds; the commodity must
    /// already exist in the store.
    pub fn tune(&self, series: &TimeSeries, commodity: &str, store: &ParamStore) -> Result<TuningOutcome> {
        if store.get(commodity)?.is_none() {
            return Err(ForecastError::StoreNotFound(format!(
                "Commodity '{}' is not in {}",
                commodity,
                store.path().display()
            )));
        }

        let result = self.run(series)?;
        let winner = &result.winner;
        let spec = CommodityModelSpec::tuned(
            winner.order,
            winner.seasonal_order,
            winner.aic,
            winner.bic,
            Local::now().naive_local(),
        );

        store.update(commodity, &spec)?;

        info!(
            commodity,
            model_type = %spec.model_type,
            order = %spec.order,
            seasonal_order = %spec.seasonal_order,
            aic = winner.aic,
            "tuning committed"
        );

        Ok(TuningOutcome {
            commodity: commodity.to_string(),
            spec,
            aic_seasonal: result.seasonal.best.as_ref().map(|c| c.aic),
            aic_non_seasonal: result.non_seasonal.best.as_ref().map(|c| c.aic),
            models_fitted: result.seasonal.models_fitted + result.non_seasonal.models_fitted,
        })
    }

    fn branch(&self, series: &TimeSeries, seasonal: bool) -> Result<BranchResult> {
        let space = &self.space;
        let values = series.values();

        let (d, big_d, m) = if seasonal {
            let big_d = suggest_seasonal_differencing(values, space.m, space.max_seasonal_d)?;
            let d = suggest_differencing(&seasonal_difference(values, big_d, space.m), space.max_d)?;
            (d, big_d, space.m)
        } else {
            (suggest_differencing(values, space.max_d)?, 0, 0)
        };

        let bounds = if seasonal {
            (space.max_p, space.max_q, space.max_seasonal_p, space.max_seasonal_q)
        } else {
            (space.max_p, space.max_q, 0, 0)
        };

        debug!(seasonal, d, big_d, m, "differencing orders chosen");

        let walker = Walker {
            series,
            search: self,
            d,
            big_d,
            m,
            bounds,
        };
        let result = if space.stepwise {
            walker.stepwise()
        } else {
            walker.exhaustive()
        };

        match &result.best {
            Some(best) => info!(
                seasonal,
                order = %best.order,
                seasonal_order = %best.seasonal_order,
                aic = best.aic,
                models = result.models_fitted,
                "branch winner"
            ),
            None => warn!(seasonal, models = result.models_fitted, "branch exhausted"),
        }
        Ok(result)
    }
}

/// Walks the candidate space of one branch
struct Walker<'a> {
    series: &'a TimeSeries,
    search: &'a OrderSearch,
    d: usize,
    big_d: usize,
    m: usize,
    bounds: Key,
}

impl Walker<'_> {
    fn admissible(&self, key: &Key) -> bool {
        let (p, q, sp, sq) = *key;
        let (max_p, max_q, max_sp, max_sq) = self.bounds;
        p <= max_p
            && q <= max_q
            && sp <= max_sp
            && sq <= max_sq
            && p + q + sp + sq <= self.search.space.max_order
    }

    fn model(&self, key: &Key) -> Sarima {
        let (p, q, sp, sq) = *key;
        let seasonal = if self.m >= 2 {
            SeasonalOrder::new(sp, self.big_d, sq, self.m)
        } else {
            SeasonalOrder::NONE
        };
        Sarima::new(ModelOrder::new(p, self.d, q), seasonal)
            .with_options(self.search.fit_options)
            .with_min_observations(self.search.min_observations)
    }

    fn fit(&self, model: &Sarima) -> Option<Candidate> {
        match model.fit(self.series) {
            Ok(fitted) if fitted.aic().is_finite() => Some(Candidate {
                order: fitted.order(),
                seasonal_order: fitted.seasonal_order(),
                aic: fitted.aic(),
                bic: fitted.bic(),
                converged: fitted.converged(),
            }),
            Ok(_) => None,
            Err(err) => {
                debug!(order = %model.order(), error = %err, "candidate rejected");
                None
            }
        }
    }

    /// Fit the feasible `keys` in parallel, preserving their order.
    ///
    /// Also returns how many fits were attempted; infeasible keys are skipped
    /// without fitting.
    fn fit_all(&self, keys: &[Key]) -> (Vec<Candidate>, usize) {
        let models: Vec<Sarima> = keys
            .iter()
            .map(|key| self.model(key))
            .filter(|model| model.is_feasible(self.series.len()))
            .collect();
        let candidates = models.par_iter().filter_map(|model| self.fit(model)).collect();
        (candidates, models.len())
    }

    fn stepwise(&self) -> BranchResult {
        let budget = self.search.space.max_models;
        let mut visited: HashSet<Key> = HashSet::new();

        let (max_p, max_q, max_sp, max_sq) = self.bounds;
        let clamp = |(p, q, sp, sq): Key| (p.min(max_p), q.min(max_q), sp.min(max_sp), sq.min(max_sq));
        let mut starts: Vec<Key> = Vec::new();
        for key in [(2, 2, 1, 1), (0, 0, 0, 0), (1, 0, 1, 0), (0, 1, 0, 1)].map(clamp) {
            if self.admissible(&key) && !starts.contains(&key) {
                starts.push(key);
            }
        }
        starts.truncate(budget);
        visited.extend(starts.iter().copied());

        let (fitted, mut attempted) = self.fit_all(&starts);
        let mut best = lowest_aic(fitted);

        while let Some(current) = best.clone() {
            let remaining = budget.saturating_sub(visited.len());
            if remaining == 0 {
                break;
            }

            let mut neighbours: Vec<Key> = neighbours(&key_of(&current))
                .into_iter()
                .filter(|k| self.admissible(k) && !visited.contains(k))
                .collect();
            neighbours.truncate(remaining);
            if neighbours.is_empty() {
                break;
            }
            visited.extend(neighbours.iter().copied());

            let (fitted, count) = self.fit_all(&neighbours);
            attempted += count;
            match lowest_aic(fitted) {
                Some(candidate) if candidate.aic < current.aic => best = Some(candidate),
                _ => break,
            }
        }

        BranchResult {
            best,
            models_fitted: attempted,
        }
    }

    fn exhaustive(&self) -> BranchResult {
        let (max_p, max_q, max_sp, max_sq) = self.bounds;
        let mut keys: Vec<Key> = Vec::new();
        for p in 0..=max_p {
            for q in 0..=max_q {
                for sp in 0..=max_sp {
                    for sq in 0..=max_sq {
                        if self.admissible(&(p, q, sp, sq)) {
                            keys.push((p, q, sp, sq));
                        }
                    }
                }
            }
        }
        keys.truncate(self.search.space.max_models);

        let (fitted, attempted) = self.fit_all(&keys);
        BranchResult {
            best: lowest_aic(fitted),
            models_fitted: attempted,
        }
    }
}

fn key_of(candidate: &Candidate) -> Key {
    (
        candidate.order.p,
        candidate.order.q,
        candidate.seasonal_order.p,
        candidate.seasonal_order.q,
    )
}

/// `+/-1` on each of `p, q, P, Q`, then joint `+/-1` on `(p, q)` and `(P, Q)`
fn neighbours(&(p, q, sp, sq): &Key) -> Vec<Key> {
    let step = |v: usize, delta: i8| -> Option<usize> {
        match delta {
            -1 => v.checked_sub(1),
            _ => Some(v + 1),
        }
    };

    let mut out = Vec::with_capacity(12);
    for delta in [-1i8, 1] {
        if let Some(v) = step(p, delta) {
            out.push((v, q, sp, sq));
        }
        if let Some(v) = step(q, delta) {
            out.push((p, v, sp, sq));
        }
        if let Some(v) = step(sp, delta) {
            out.push((p, q, v, sq));
        }
        if let Some(v) = step(sq, delta) {
            out.push((p, q, sp, v));
        }
        if let (Some(a), Some(b)) = (step(p, delta), step(q, delta)) {
            out.push((a, b, sp, sq));
        }
        if let (Some(a), Some(b)) = (step(sp, delta), step(sq, delta)) {
            out.push((p, q, a, b));
        }
    }
    out
}

/// First candidate with the lowest AIC
fn lowest_aic(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.aic.is_finite())
        .fold(None, |best: Option<Candidate>, c| match best {
            Some(b) if b.aic <= c.aic => Some(b),
            _ => Some(c),
        })
}

/// Search the default way and commit the winner to `store`
pub fn search(
    series: &TimeSeries,
    commodity: &str,
    space: SearchSpace,
    store: &ParamStore,
) -> Result<TuningOutcome> {
    OrderSearch::new(space).tune(series, commodity, store)
}
