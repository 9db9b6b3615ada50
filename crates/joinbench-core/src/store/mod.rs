pub mod mock;

use async_trait::async_trait;
use std::time::Instant;

use crate::types::{Department, Employee, JoinMethod, Table};
use crate::variant::IndexDef;
use crate::Result;

/// Wall-clock time of one execution plus the plan of a second, analyzed one.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub elapsed_ms: f64,
    pub plan: Vec<String>,
}

/// Storage boundary the harness drives.
///
/// Planner switches are session state, so implementations hold a single
/// connection for the lifetime of the store.
#[async_trait]
pub trait JoinStore: Send {
    /// Replace both tables with the given rows.
    async fn load(&mut self, employees: &[Employee], departments: &[Department]) -> Result<()>;

    /// Toggle `enable_<method>` for this session.
    async fn set_join_method(&mut self, method: JoinMethod, enabled: bool) -> Result<()>;

    async fn join_method_enabled(&mut self, method: JoinMethod) -> Result<bool>;

    /// Run a query to completion, returning the number of rows it produced.
    async fn run_query(&mut self, sql: &str) -> Result<u64>;

    /// `EXPLAIN ANALYZE <sql>`, one entry per plan line.
    async fn explain_analyze(&mut self, sql: &str) -> Result<Vec<String>>;

    async fn create_index(&mut self, index: &IndexDef) -> Result<()>;

    async fn drop_index(&mut self, index: &IndexDef) -> Result<()>;

    /// Drop and recreate the working schema.
    async fn purge_tables(&mut self) -> Result<()>;

    /// Rows in `table`; a table that does not exist counts as empty.
    async fn row_count(&mut self, table: Table) -> Result<u64>;

    /// Disconnect cleanly. Any later call on the store fails.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn measure_execution(&mut self, sql: &str) -> Result<Measurement> {
        let start = Instant::now();
        let rows = self.run_query(sql).await?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(rows, elapsed_ms, "query finished");

        let plan = self.explain_analyze(sql).await?;
        Ok(Measurement { elapsed_ms, plan })
    }
}
