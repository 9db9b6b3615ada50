//! Runs only when JOINBENCH_TEST_DATABASE_URL points at a disposable database.

use async_trait::async_trait;
use joinbench_core::harness::force_join_method;
use joinbench_core::{
    BenchmarkHarness, DatasetSize, Department, Employee, IndexDef, JoinMethod, JoinStore, Pass,
    Result, Table, VariantKind,
};
use joinbench_postgres::PgJoinStore;

async fn connect() -> Option<PgJoinStore> {
    let url = match std::env::var("JOINBENCH_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("JOINBENCH_TEST_DATABASE_URL not set, skipping");
            return None;
        }
    };
    Some(PgJoinStore::connect(&url).await.expect("Failed to connect"))
}

/// What the session looked like right after one timed query.
#[derive(Debug)]
struct TimedQuery {
    enabled: Vec<JoinMethod>,
    indexed: bool,
    cached_copies: usize,
}

/// Delegates to PostgreSQL and inspects the session after every timed query.
struct Inspected {
    inner: PgJoinStore,
    indexed: bool,
    timed: Vec<TimedQuery>,
}

#[async_trait]
impl JoinStore for Inspected {
    async fn load(&mut self, employees: &[Employee], departments: &[Department]) -> Result<()> {
        self.inner.load(employees, departments).await
    }

    async fn set_join_method(&mut self, method: JoinMethod, enabled: bool) -> Result<()> {
        self.inner.set_join_method(method, enabled).await
    }

    async fn join_method_enabled(&mut self, method: JoinMethod) -> Result<bool> {
        self.inner.join_method_enabled(method).await
    }

    async fn run_query(&mut self, sql: &str) -> Result<u64> {
        let rows = self.inner.run_query(sql).await?;

        let mut enabled = vec![];
        for method in JoinMethod::ALL {
            if self.inner.join_method_enabled(method).await? {
                enabled.push(method);
            }
        }
        let cached_copies = self
            .inner
            .prepared_statements()
            .await?
            .iter()
            .filter(|(_, statement)| statement.trim() == sql)
            .count();
        self.timed.push(TimedQuery {
            enabled,
            indexed: self.indexed,
            cached_copies,
        });
        Ok(rows)
    }

    async fn explain_analyze(&mut self, sql: &str) -> Result<Vec<String>> {
        self.inner.explain_analyze(sql).await
    }

    async fn create_index(&mut self, index: &IndexDef) -> Result<()> {
        self.indexed = true;
        self.inner.create_index(index).await
    }

    async fn drop_index(&mut self, index: &IndexDef) -> Result<()> {
        self.indexed = false;
        self.inner.drop_index(index).await
    }

    async fn purge_tables(&mut self) -> Result<()> {
        self.inner.purge_tables().await
    }

    async fn row_count(&mut self, table: Table) -> Result<u64> {
        self.inner.row_count(table).await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }
}

#[tokio::test]
async fn test_load_purge_and_indexed_run() {
    let Some(mut store) = connect().await else { return };
    let size = DatasetSize::new(300, 7).unwrap();
    let harness = BenchmarkHarness::new(VariantKind::Plain.config(), size).with_seed(Some(1));
    let (employees, departments) = harness.generate_data();

    store.load(&employees, &departments).await.unwrap();
    assert_eq!(store.row_count(Table::Employees).await.unwrap(), 300);
    assert_eq!(store.row_count(Table::Departments).await.unwrap(), 7);

    store.purge_tables().await.unwrap();
    assert_eq!(store.row_count(Table::Employees).await.unwrap(), 0);
    assert_eq!(store.row_count(Table::Departments).await.unwrap(), 0);

    // Same test so the loads never race on the shared schema.
    let mut store = indexed_run_replans_every_query(store).await;
    timed_query_follows_forced_method(&mut store).await;
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_join_method_switches() {
    let Some(mut store) = connect().await else { return };

    store.set_join_method(JoinMethod::HashJoin, false).await.unwrap();
    assert!(!store.join_method_enabled(JoinMethod::HashJoin).await.unwrap());
    store.set_join_method(JoinMethod::HashJoin, true).await.unwrap();
    assert!(store.join_method_enabled(JoinMethod::HashJoin).await.unwrap());
    store.close().await.unwrap();
}

#[tokio::test]
async fn test_closed_store_rejects_calls() {
    let Some(mut store) = connect().await else { return };

    store.close().await.unwrap();
    store.close().await.unwrap();
    assert!(store.join_method_enabled(JoinMethod::NestLoop).await.is_err());
}

async fn indexed_run_replans_every_query(store: PgJoinStore) -> PgJoinStore {
    let mut inspected = Inspected {
        inner: store,
        indexed: false,
        timed: vec![],
    };
    let size = DatasetSize::new(2000, 20).unwrap();
    let run = BenchmarkHarness::new(VariantKind::Indexed.config(), size)
        .with_seed(Some(2))
        .run(&mut inspected)
        .await
        .unwrap();

    // A cached generic plan would keep the join of the first forced method.
    assert_eq!(inspected.timed.len(), 6);
    for (timed, method) in inspected.timed.iter().zip(JoinMethod::ALL.iter().cycle()) {
        assert_eq!(timed.enabled, vec![*method], "{:?}", timed);
        assert_eq!(timed.cached_copies, 0, "{:?}", timed);
    }
    assert_eq!(inspected.timed.iter().filter(|t| t.indexed).count(), 3);

    assert_eq!(run.results.len() + run.skipped, 6);
    for pass in [Pass::WithoutIndex, Pass::WithIndex] {
        for result in run.results_for(pass) {
            assert!(
                result.plan.iter().any(|line| line.contains(result.join_method.node_name())),
                "{} missing from plan {:?}",
                result.join_method,
                result.plan
            );
        }
    }

    let mut store = inspected.inner;
    for method in JoinMethod::ALL {
        assert!(store.join_method_enabled(method).await.unwrap());
    }
    assert_eq!(store.row_count(Table::Employees).await.unwrap(), 0);
    store
}

async fn timed_query_follows_forced_method(store: &mut PgJoinStore) {
    let size = DatasetSize::new(2000, 20).unwrap();
    let harness = BenchmarkHarness::new(VariantKind::Plain.config(), size).with_seed(Some(3));
    let (employees, departments) = harness.generate_data();
    let sql = harness.variant().queries[0].sql.clone();
    store.load(&employees, &departments).await.unwrap();

    for method in JoinMethod::ALL {
        force_join_method(store, method).await.unwrap();
        let measurement = store.measure_execution(&sql).await.unwrap();

        assert!(measurement.plan[0].starts_with(method.node_name()), "{:?}", measurement.plan);
        let cached: Vec<String> = store
            .prepared_statements()
            .await
            .unwrap()
            .into_iter()
            .filter(|(_, statement)| statement.trim() == sql)
            .map(|(name, _)| name)
            .collect();
        assert!(cached.is_empty(), "{} left prepared as {:?}", method, cached);
    }

    joinbench_core::harness::restore_join_methods(store).await.unwrap();
    store.purge_tables().await.unwrap();
}
