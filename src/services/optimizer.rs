use std::cmp::Ordering;
use std::time::Instant;

use good_lp::{default_solver, variable, Expression, ProblemVariables, SolverModel, Variable};

use crate::{
    error::{AppError, AppResult},
    models::{Bundle, StreamingService},
};

use super::candidates::{non_empty_subsets, subset_members, MAX_MASK_SERVICES};
use super::coverage::clamp_percent;
use super::engine::{dedup, RecommendationEngine};

/// Small cost added per selected service so the solver prefers fewer services on price ties
const SERVICE_COUNT_PENALTY: f64 = 1e-4;

/// Relative slack allowed when pinning the phase-one coverage optimum
const COVERAGE_TOLERANCE: f64 = 1e-6;

/// Per-service, per-league percents for the target leagues
struct PercentTable {
    /// `percents[service][league]`, zero where the service lists nothing
    percents: Vec<Vec<f64>>,
    weights: Vec<f64>,
}

impl PercentTable {
    fn new(services: &[&StreamingService], league_ids: &[String], weights: Vec<f64>) -> Self {
        let percents = services
            .iter()
            .map(|s| {
                league_ids
                    .iter()
                    .map(|l| s.coverage_percent(l).max(0.0))
                    .collect()
            })
            .collect();
        Self { percents, weights }
    }

    /// Weighted capped coverage of the services selected by `mask`
    fn weighted(&self, mask: u64) -> f64 {
        let mut total = 0.0;
        for (l, weight) in self.weights.iter().enumerate() {
            let mut sum = 0.0;
            for (j, row) in self.percents.iter().enumerate() {
                if mask & (1u64 << j) != 0 {
                    sum += row[l];
                }
            }
            total += clamp_percent(sum) * weight;
        }
        total
    }
}

/// Best subset found so far by the exhaustive scan
#[derive(Debug, Clone, Copy)]
struct Best {
    mask: u64,
    weighted: f64,
    price: f64,
    size: u32,
}

impl Best {
    /// Higher weighted coverage, then lower price, then fewer services
    fn beats(&self, other: &Best) -> bool {
        match self.weighted.total_cmp(&other.weighted) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match self.price.total_cmp(&other.price) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => self.size < other.size,
            },
        }
    }
}

impl<'a> RecommendationEngine<'a> {
    /// Finds the service set with the highest preference-weighted coverage
    ///
    /// Ties go to the cheaper set, then the smaller one. Returns `None` when no league is
    /// selected or the catalog is empty. Catalogs above the exhaustive limit are solved
    /// as an integer program instead of by enumeration.
    pub fn build_optimal_bundle(&self, league_ids: &[String]) -> AppResult<Option<Bundle>> {
        let league_ids = dedup(league_ids);
        let catalog = self.catalog;
        let services = catalog.services();
        if league_ids.is_empty() || services.is_empty() {
            return Ok(None);
        }

        let start = Instant::now();
        let weights: Vec<f64> = league_ids
            .iter()
            .map(|l| f64::from(self.preferences.preference_weight(l)))
            .collect();

        let limit = self.exhaustive_limit.min(MAX_MASK_SERVICES);
        let (strategy, members) = if services.len() <= limit {
            ("exhaustive", self.exhaustive_search(services, &league_ids, weights))
        } else {
            (
                "integer_program",
                self.integer_program(services, &league_ids, &weights)?,
            )
        };

        let bundle = self
            .coverage
            .bundle_stats(&members, &league_ids, self.preferences);

        tracing::info!(
            strategy,
            services = services.len(),
            leagues = league_ids.len(),
            selected = ?bundle.service_ids(),
            total_price = bundle.total_price,
            weighted_coverage = bundle.total_weighted_coverage,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Optimal bundle built"
        );

        Ok(Some(bundle))
    }

    fn exhaustive_search(
        &self,
        services: &'a [StreamingService],
        league_ids: &[String],
        weights: Vec<f64>,
    ) -> Vec<&'a StreamingService> {
        let refs: Vec<&StreamingService> = services.iter().collect();
        let table = PercentTable::new(&refs, league_ids, weights);

        let mut best: Option<Best> = None;
        for mask in non_empty_subsets(services.len()) {
            let candidate = Best {
                mask,
                weighted: table.weighted(mask),
                price: services
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| mask & (1u64 << j) != 0)
                    .map(|(_, s)| s.numeric_price)
                    .sum(),
                size: mask.count_ones(),
            };
            if best.map_or(true, |b| candidate.beats(&b)) {
                best = Some(candidate);
            }
        }

        best.map(|b| subset_members(b.mask, services))
            .unwrap_or_default()
    }

    /// Two-phase integer program over the finitely priced services
    ///
    /// Phase one maximises weighted coverage. Phase two keeps that optimum and minimises
    /// price plus a small per-service penalty.
    fn integer_program(
        &self,
        services: &'a [StreamingService],
        league_ids: &[String],
        weights: &[f64],
    ) -> AppResult<Vec<&'a StreamingService>> {
        let priced: Vec<&'a StreamingService> = services
            .iter()
            .filter(|s| s.numeric_price.is_finite())
            .collect();

        if priced.len() < services.len() {
            tracing::debug!(
                excluded = services.len() - priced.len(),
                "Services without a numeric price left out of the integer program"
            );
        }

        let table = PercentTable::new(&priced, league_ids, weights.to_vec());

        let mut selected = Vec::new();
        if !priced.is_empty() {
            let best_weighted = solve_coverage_program(&priced, &table, None)?.weighted;
            let floor = best_weighted - COVERAGE_TOLERANCE * best_weighted.max(1.0);
            selected = solve_coverage_program(&priced, &table, Some(floor))?.selected;
        }

        if selected.is_empty() {
            // Nothing adds coverage: fall back to the cheapest single service
            let cheapest = priced
                .iter()
                .copied()
                .min_by(|a, b| a.numeric_price.total_cmp(&b.numeric_price))
                .or_else(|| services.first());
            return Ok(cheapest.into_iter().collect());
        }

        Ok(selected)
    }
}

/// Outcome of one solver run
struct ProgramSolution<'a> {
    selected: Vec<&'a StreamingService>,
    weighted: f64,
}

/// Solves one phase of the coverage program
///
/// Without `coverage_floor` the weighted coverage is maximised. With it, the weighted
/// coverage must stay at or above the floor and the total price is minimised.
fn solve_coverage_program<'a>(
    services: &[&'a StreamingService],
    table: &PercentTable,
    coverage_floor: Option<f64>,
) -> AppResult<ProgramSolution<'a>> {
    let mut vars = ProblemVariables::new();

    // One binary per service (selected or not)
    let service_vars: Vec<Variable> = services
        .iter()
        .map(|_| vars.add(variable().binary()))
        .collect();

    // One continuous coverage per league, capped at 100
    let league_vars: Vec<Variable> = table
        .weights
        .iter()
        .map(|_| vars.add(variable().min(0.0).max(100.0)))
        .collect();

    let mut constraints = vec![];

    // A league is covered at most as much as the selected services provide
    for (l, &coverage_var) in league_vars.iter().enumerate() {
        let mut provided = Expression::from(0);
        for (j, &service_var) in service_vars.iter().enumerate() {
            let percent = table.percents[j][l];
            if percent > 0.0 {
                provided = provided + percent * service_var;
            }
        }
        constraints.push(Expression::from(coverage_var).leq(provided));
    }

    let mut weighted = Expression::from(0);
    for (&coverage_var, &weight) in league_vars.iter().zip(&table.weights) {
        weighted = weighted + weight * coverage_var;
    }

    let solution = match coverage_floor {
        None => {
            let mut problem = vars.maximise(weighted).using(default_solver);
            for constraint in constraints {
                problem = problem.with(constraint);
            }
            problem.solve()
        }
        Some(floor) => {
            constraints.push(weighted.geq(floor));

            let mut cost = Expression::from(0);
            for (service, &var) in services.iter().zip(&service_vars) {
                cost = cost + (service.numeric_price + SERVICE_COUNT_PENALTY) * var;
            }

            let mut problem = vars.minimise(cost).using(default_solver);
            for constraint in constraints {
                problem = problem.with(constraint);
            }
            problem.solve()
        }
    }
    .map_err(|e| AppError::Optimization(format!("Solver failed: {}", e)))?;

    Ok(extract_solution(&solution, services, &service_vars, &league_vars, &table.weights))
}

fn extract_solution<'a>(
    solution: &impl good_lp::solvers::Solution,
    services: &[&'a StreamingService],
    service_vars: &[Variable],
    league_vars: &[Variable],
    weights: &[f64],
) -> ProgramSolution<'a> {
    let selected = services
        .iter()
        .zip(service_vars)
        .filter(|(_, var)| solution.value(**var) > 0.5)
        .map(|(&service, _)| service)
        .collect();

    let weighted = league_vars
        .iter()
        .zip(weights)
        .map(|(&var, weight)| solution.value(var) * weight)
        .sum();

    ProgramSolution { selected, weighted }
}
