//! Benchmark lifecycle.
//!
//! generate → load → for each pass, for each join method: force the method,
//! run every query, parse its plan → drop indexes → restore planner switches
//! → purge → present.
//!
//! Restoring the switches, dropping indexes and purging happen on every exit
//! path. When more than one step fails the first error is returned and the
//! rest are logged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::datagen::DataGenerator;
use crate::plan::PlanTiming;
use crate::report::RunPresenter;
use crate::store::JoinStore;
use crate::types::{DatasetSize, Department, Employee, ExecutionResult, JoinMethod, Pass};
use crate::variant::VariantConfig;
use crate::{BenchError, Result};

/// Results of one harness run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRun {
    pub variant: String,
    pub title: String,
    pub size: DatasetSize,
    pub join_methods: Vec<JoinMethod>,
    pub results: Vec<ExecutionResult>,
    /// Samples dropped because their plan carried no usable timing.
    pub skipped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BenchmarkRun {
    pub fn results_for(&self, pass: Pass) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(move |r| r.pass == pass)
    }

    pub fn chart_title(&self) -> String {
        format!("{} ({})", self.title, self.size.employees)
    }
}

pub struct BenchmarkHarness {
    variant: VariantConfig,
    size: DatasetSize,
    join_methods: Vec<JoinMethod>,
    seed: Option<u64>,
}

impl BenchmarkHarness {
    pub fn new(variant: VariantConfig, size: DatasetSize) -> Self {
        Self {
            variant,
            size,
            join_methods: JoinMethod::ALL.to_vec(),
            seed: None,
        }
    }

    /// Measure only these methods, in order, each once. The others stay
    /// forced off during measurement.
    pub fn with_join_methods(mut self, join_methods: Vec<JoinMethod>) -> Result<Self> {
        if join_methods.is_empty() {
            return Err(BenchError::InvalidConfig("at least one join method is required".into()));
        }
        let mut unique = Vec::with_capacity(join_methods.len());
        for method in join_methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }
        self.join_methods = unique;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn variant(&self) -> &VariantConfig {
        &self.variant
    }

    pub fn generate_data(&self) -> (Vec<Employee>, Vec<Department>) {
        DataGenerator::new(self.seed).generate(self.size)
    }

    /// Full lifecycle including presentation.
    pub async fn execute<S>(&self, store: &mut S, presenter: &dyn RunPresenter) -> Result<BenchmarkRun>
    where
        S: JoinStore + ?Sized,
    {
        let run = self.run(store).await?;
        self.plot_results(&run, presenter)?;
        Ok(run)
    }

    /// Lifecycle up to and including the purge.
    pub async fn run<S>(&self, store: &mut S) -> Result<BenchmarkRun>
    where
        S: JoinStore + ?Sized,
    {
        let mut run = BenchmarkRun {
            variant: self.variant.name.clone(),
            title: self.variant.title.clone(),
            size: self.size,
            join_methods: self.join_methods.clone(),
            results: vec![],
            skipped: 0,
            started_at: Utc::now(),
            finished_at: None,
        };

        let (employees, departments) = self.generate_data();
        info!(
            variant = %self.variant.name,
            employees = employees.len(),
            departments = departments.len(),
            "loading benchmark data"
        );

        let measured = match store.load(&employees, &departments).await {
            Ok(()) => self.measure_passes(store, &mut run).await,
            Err(e) => Err(e),
        };

        let restored = restore_join_methods(store).await;
        let purged = store.purge_tables().await;

        let outcome = first_error(vec![measured, restored, purged]);
        run.finished_at = Some(Utc::now());
        outcome?;

        info!(
            variant = %run.variant,
            results = run.results.len(),
            skipped = run.skipped,
            "benchmark finished"
        );
        Ok(run)
    }

    pub fn plot_results(&self, run: &BenchmarkRun, presenter: &dyn RunPresenter) -> Result<()> {
        presenter.present(run)
    }

    async fn measure_passes<S>(&self, store: &mut S, run: &mut BenchmarkRun) -> Result<()>
    where
        S: JoinStore + ?Sized,
    {
        for pass in self.variant.passes() {
            if pass == Pass::WithIndex {
                let measured = self.indexed_pass(store, run).await;
                let dropped = self.drop_indexes(store).await;
                first_error(vec![measured, dropped])?;
            } else {
                self.measure_pass(store, pass, run).await?;
            }
        }
        Ok(())
    }

    async fn indexed_pass<S>(&self, store: &mut S, run: &mut BenchmarkRun) -> Result<()>
    where
        S: JoinStore + ?Sized,
    {
        for index in &self.variant.indexes {
            debug!(index = %index.name, "creating index");
            store.create_index(index).await?;
        }
        self.measure_pass(store, Pass::WithIndex, run).await
    }

    async fn drop_indexes<S>(&self, store: &mut S) -> Result<()>
    where
        S: JoinStore + ?Sized,
    {
        let mut results = Vec::with_capacity(self.variant.indexes.len());
        for index in &self.variant.indexes {
            results.push(store.drop_index(index).await);
        }
        first_error(results)
    }

    async fn measure_pass<S>(&self, store: &mut S, pass: Pass, run: &mut BenchmarkRun) -> Result<()>
    where
        S: JoinStore + ?Sized,
    {
        for &method in &self.join_methods {
            force_join_method(store, method).await?;

            for query in &self.variant.queries {
                let measurement = store.measure_execution(&query.sql).await?;

                match PlanTiming::parse(&measurement.plan) {
                    Ok(timing) => {
                        let result = ExecutionResult::new(query, pass, method, measurement, timing);
                        debug!(
                            label = %result.label,
                            elapsed_ms = result.elapsed_ms,
                            plan_time_ms = result.plan_time_ms,
                            "sample recorded"
                        );
                        run.results.push(result);
                    }
                    Err(e) => {
                        warn!(query = %query.label, method = %method, error = %e, "skipping sample with unusable plan");
                        run.skipped += 1;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Enable `forced` and disable every other join method.
pub async fn force_join_method<S>(store: &mut S, forced: JoinMethod) -> Result<()>
where
    S: JoinStore + ?Sized,
{
    store.set_join_method(forced, true).await?;
    for method in JoinMethod::ALL.into_iter().filter(|m| *m != forced) {
        store.set_join_method(method, false).await?;
    }
    Ok(())
}

/// Turn every join method back on, attempting all of them even if one fails.
pub async fn restore_join_methods<S>(store: &mut S) -> Result<()>
where
    S: JoinStore + ?Sized,
{
    let mut results = Vec::with_capacity(JoinMethod::ALL.len());
    for method in JoinMethod::ALL {
        results.push(store.set_join_method(method, true).await);
    }
    first_error(results)
}

fn first_error(results: Vec<Result<()>>) -> Result<()> {
    let mut first = None;
    for result in results {
        if let Err(e) = result {
            if first.is_none() {
                first = Some(e);
            } else {
                warn!(error = %e, "additional failure during cleanup");
            }
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_keeps_earliest() {
        let outcome = first_error(vec![
            Ok(()),
            Err(BenchError::InvalidConfig("first".into())),
            Err(BenchError::InvalidConfig("second".into())),
        ]);
        match outcome {
            Err(BenchError::InvalidConfig(msg)) => assert_eq!(msg, "first"),
            other => panic!("Expected first error, got {:?}", other),
        }
        assert!(first_error(vec![Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn test_empty_join_methods_rejected() {
        let size = DatasetSize::new(1, 1).unwrap();
        let harness = BenchmarkHarness::new(crate::VariantKind::Plain.config(), size);
        assert!(harness.with_join_methods(vec![]).is_err());
    }

    #[test]
    fn test_duplicate_join_methods_measured_once() {
        let size = DatasetSize::new(1, 1).unwrap();
        let harness = BenchmarkHarness::new(crate::VariantKind::Plain.config(), size)
            .with_join_methods(vec![
                JoinMethod::HashJoin,
                JoinMethod::NestLoop,
                JoinMethod::HashJoin,
            ])
            .unwrap();
        assert_eq!(harness.join_methods, vec![JoinMethod::HashJoin, JoinMethod::NestLoop]);
    }

    #[test]
    fn test_chart_title_includes_size() {
        let size = DatasetSize::new(10_000, 100).unwrap();
        let harness = BenchmarkHarness::new(crate::VariantKind::Range.config(), size);
        let run = BenchmarkRun {
            variant: harness.variant().name.clone(),
            title: harness.variant().title.clone(),
            size,
            join_methods: JoinMethod::ALL.to_vec(),
            results: vec![],
            skipped: 0,
            started_at: Utc::now(),
            finished_at: None,
        };
        assert_eq!(run.chart_title(), "Join Between Test (10000)");
    }
}
