//! Deterministic Simulation Testing for bucket aggregation
//!
//! VOPR-style harness that:
//! - Generates seeded random observation streams
//! - Applies them through the repository against an in-memory store
//! - Cross-checks every touched bucket against a shadow model after each step
//! - Periodically reconstructs summaries and checks them too

use super::{StoreSummaryRepository, SummaryRepository};
use crate::model::{MeasurementType, Observation, SummaryType};
use crate::schema::{self, COUNTER_FIELD};
use crate::store::{InMemoryStore, SummaryStore};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet};

/// Configuration for aggregation DST
#[derive(Debug, Clone)]
pub struct AggregateDSTConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of distinct sensor ids to draw from
    pub num_sensors: u64,
    /// Observations are drawn uniformly from `-value_range..value_range`
    pub value_range: f64,
    /// Probability of running a summary query after an observation
    pub query_prob: f64,
}

impl Default for AggregateDSTConfig {
    fn default() -> Self {
        AggregateDSTConfig {
            seed: 0,
            num_sensors: 20,
            value_range: 1000.0,
            query_prob: 0.1,
        }
    }
}

impl AggregateDSTConfig {
    pub fn new(seed: u64) -> Self {
        AggregateDSTConfig {
            seed,
            ..Default::default()
        }
    }

    /// Few sensors, so buckets accumulate long histories
    pub fn hot_buckets(seed: u64) -> Self {
        AggregateDSTConfig {
            seed,
            num_sensors: 2,
            value_range: 50.0,
            query_prob: 0.2,
        }
    }

    /// Many sensors with wide values, mostly fresh buckets
    pub fn wide_spread(seed: u64) -> Self {
        AggregateDSTConfig {
            seed,
            num_sensors: 500,
            value_range: 1.0e6,
            query_prob: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ShadowBucket {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

/// Result of an aggregation DST run
#[derive(Debug, Clone)]
pub struct AggregateDSTResult {
    pub seed: u64,
    pub observations: u64,
    pub queries: u64,
    pub sensors_registered: u64,
    pub invariant_violations: Vec<String>,
    pub last_observation: Option<Observation>,
}

impl AggregateDSTResult {
    pub fn new(seed: u64) -> Self {
        AggregateDSTResult {
            seed,
            observations: 0,
            queries: 0,
            sensors_registered: 0,
            invariant_violations: Vec::new(),
            last_observation: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} observations, {} queries, {} sensors, {} violations",
            self.seed,
            self.observations,
            self.queries,
            self.sensors_registered,
            self.invariant_violations.len()
        )
    }
}

/// DST harness driving a repository over an in-memory store
pub struct AggregateDSTHarness {
    config: AggregateDSTConfig,
    rng: ChaCha8Rng,
    repo: StoreSummaryRepository<InMemoryStore>,
    shadow: HashMap<(u64, MeasurementType), ShadowBucket>,
    registered: HashSet<u64>,
    result: AggregateDSTResult,
}

impl AggregateDSTHarness {
    pub fn new(config: AggregateDSTConfig) -> Self {
        AggregateDSTHarness {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            result: AggregateDSTResult::new(config.seed),
            config,
            repo: StoreSummaryRepository::new(InMemoryStore::new()),
            shadow: HashMap::new(),
            registered: HashSet::new(),
        }
    }

    fn next_observation(&mut self) -> Observation {
        let sensor_id = self.rng.gen_range(0..self.config.num_sensors.max(1));
        let idx = self.rng.gen_range(0..MeasurementType::ALL.len());
        let range = self.config.value_range;
        let measurement = self.rng.gen_range(-range..range);
        Observation::new(sensor_id, MeasurementType::ALL[idx], measurement)
    }

    fn tolerance(magnitude: f64) -> f64 {
        1e-9 * magnitude.abs().max(1.0) * 1e3
    }

    fn violation(&mut self, msg: String) {
        self.result.invariant_violations.push(msg);
    }

    fn read_f64(&self, key: &str, field: &str) -> Option<f64> {
        self.repo
            .store()
            .hget(key, field)
            .ok()
            .flatten()
            .and_then(|raw| raw.parse().ok())
    }

    fn check_bucket(&mut self, sensor_id: u64, measurement_type: MeasurementType) {
        let Some(expected) = self.shadow.get(&(sensor_id, measurement_type)).copied() else {
            return;
        };
        let key = schema::summary_key(sensor_id, measurement_type);

        let min = self.read_f64(&key, "min");
        let max = self.read_f64(&key, "max");
        let sum = self.read_f64(&key, "sum");
        let avg = self.read_f64(&key, "avg");
        let counter = self.read_f64(&key, COUNTER_FIELD);

        if min != Some(expected.min) {
            self.violation(format!("{}: min {:?} != {}", key, min, expected.min));
        }
        if max != Some(expected.max) {
            self.violation(format!("{}: max {:?} != {}", key, max, expected.max));
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                self.violation(format!("{}: min {} > max {}", key, min, max));
            }
        }
        if counter != Some(expected.count as f64) {
            self.violation(format!("{}: counter {:?} != {}", key, counter, expected.count));
        }
        match sum {
            Some(s) if (s - expected.sum).abs() <= Self::tolerance(expected.sum) => {}
            other => self.violation(format!("{}: sum {:?} != {}", key, other, expected.sum)),
        }
        match (avg, sum, counter) {
            (Some(a), Some(s), Some(c)) if c > 0.0 => {
                if (a - s / c).abs() > Self::tolerance(a) {
                    self.violation(format!("{}: avg {} != sum/counter {}", key, a, s / c));
                }
            }
            other => self.violation(format!("{}: avg fields incomplete {:?}", key, other)),
        }
    }

    fn check_query(&mut self, sensor_id: u64) {
        self.result.queries += 1;
        let summary = match self.repo.find_by_sensor_id(sensor_id, &[], &[SummaryType::Max]) {
            Ok(summary) => summary,
            Err(e) => {
                self.violation(format!("query for sensor {} failed: {}", sensor_id, e));
                return;
            }
        };

        let Some(summary) = summary else {
            if self.registered.contains(&sensor_id) {
                self.violation(format!("registered sensor {} not found", sensor_id));
            }
            return;
        };
        if !self.registered.contains(&sensor_id) {
            self.violation(format!("unregistered sensor {} returned a summary", sensor_id));
        }

        for mt in MeasurementType::ALL {
            let entries = summary.entries(mt);
            if entries.len() != 1 {
                self.violation(format!("sensor {} {}: {} entries", sensor_id, mt, entries.len()));
                continue;
            }
            let entry = entries[0];
            let (value, count) = match self.shadow.get(&(sensor_id, mt)) {
                Some(b) => (b.max, b.count),
                None => (0.0, 0),
            };
            if entry.value != value || entry.counter != count {
                self.violation(format!(
                    "sensor {} {}: entry ({}, {}) != ({}, {})",
                    sensor_id, mt, entry.value, entry.counter, value, count
                ));
            }
        }
    }

    /// Run `num_ops` observations, checking invariants after each one
    pub fn run(&mut self, num_ops: usize) {
        for _ in 0..num_ops {
            let obs = self.next_observation();
            self.result.last_observation = Some(obs);
            self.result.observations += 1;

            if let Err(e) = self.repo.handle(&obs) {
                self.violation(format!("handle {:?} failed: {}", obs, e));
                continue;
            }

            if self.registered.insert(obs.sensor_id) {
                self.result.sensors_registered += 1;
            }
            let bucket = self
                .shadow
                .entry((obs.sensor_id, obs.measurement_type))
                .or_insert(ShadowBucket {
                    min: obs.measurement,
                    max: obs.measurement,
                    sum: 0.0,
                    count: 0,
                });
            bucket.min = bucket.min.min(obs.measurement);
            bucket.max = bucket.max.max(obs.measurement);
            bucket.sum += obs.measurement;
            bucket.count += 1;

            self.check_bucket(obs.sensor_id, obs.measurement_type);

            if self.rng.gen_bool(self.config.query_prob) {
                let sensor_id = self.rng.gen_range(0..self.config.num_sensors.max(1) + 1);
                self.check_query(sensor_id);
            }
        }

        let registry = self.repo.store().scard(&schema::sensor_keys()).unwrap_or(0);
        if registry as u64 != self.result.sensors_registered {
            self.violation(format!(
                "registry holds {} sensors, expected {}",
                registry, self.result.sensors_registered
            ));
        }
    }

    pub fn result(&self) -> &AggregateDSTResult {
        &self.result
    }
}

/// Run `count` seeds starting at `start_seed`
pub fn run_aggregate_batch(
    start_seed: u64,
    count: usize,
    ops_per_run: usize,
    config_fn: fn(u64) -> AggregateDSTConfig,
) -> Vec<AggregateDSTResult> {
    (0..count as u64)
        .map(|i| {
            let mut harness = AggregateDSTHarness::new(config_fn(start_seed + i));
            harness.run(ops_per_run);
            harness.result().clone()
        })
        .collect()
}

pub fn summarize_aggregate_batch(results: &[AggregateDSTResult]) -> String {
    let passed = results.iter().filter(|r| r.is_success()).count();
    let observations: u64 = results.iter().map(|r| r.observations).sum();
    let queries: u64 = results.iter().map(|r| r.queries).sum();

    let mut summary = format!(
        "Aggregate DST: {}/{} seeds passed, {} observations, {} queries",
        passed,
        results.len(),
        observations,
        queries
    );
    for failed in results.iter().filter(|r| !r.is_success()).take(5) {
        summary.push_str(&format!("\n  FAILED {}", failed.summary()));
        if let Some(first) = failed.invariant_violations.first() {
            summary.push_str(&format!("\n    first violation: {}", first));
        }
    }
    summary
}
