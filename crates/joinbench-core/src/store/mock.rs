//! In-memory store that imitates PostgreSQL's planner switches and
//! `EXPLAIN ANALYZE` output. Backs `--dry-run` and the harness tests.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::JoinStore;
use crate::types::{Department, Employee, JoinMethod, Table};
use crate::variant::IndexDef;
use crate::{BenchError, Result};

/// Operation at which the mock reports a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Load,
    /// Fail the query after this many successful ones.
    Query { after: usize },
    /// Reject turning this method off.
    DisableJoinMethod(JoinMethod),
    CreateIndex,
    Purge,
    Close,
}

/// Shape of the plans the mock returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStyle {
    Analyzed,
    /// Plain `EXPLAIN` output without timings.
    CostsOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Load { employees: usize, departments: usize },
    SetJoinMethod { method: JoinMethod, enabled: bool },
    Query { sql: String, enabled: Vec<JoinMethod> },
    CreateIndex(String),
    DropIndex(String),
    Purge,
    Close,
}

pub struct MockJoinStore {
    employees: usize,
    departments: usize,
    loaded: bool,
    enabled: BTreeMap<JoinMethod, bool>,
    indexes: Vec<String>,
    fail_point: Option<FailPoint>,
    plan_style: PlanStyle,
    queries_run: usize,
    events: Vec<StoreEvent>,
}

impl MockJoinStore {
    pub fn new() -> Self {
        Self {
            employees: 0,
            departments: 0,
            loaded: false,
            enabled: JoinMethod::ALL.iter().map(|m| (*m, true)).collect(),
            indexes: vec![],
            fail_point: None,
            plan_style: PlanStyle::Analyzed,
            queries_run: 0,
            events: vec![],
        }
    }

    pub fn failing_at(mut self, fail_point: FailPoint) -> Self {
        self.fail_point = Some(fail_point);
        self
    }

    pub fn with_plan_style(mut self, plan_style: PlanStyle) -> Self {
        self.plan_style = plan_style;
        self
    }

    pub fn events(&self) -> &[StoreEvent] {
        &self.events
    }

    pub fn indexes(&self) -> &[String] {
        &self.indexes
    }

    pub fn enabled_methods(&self) -> Vec<JoinMethod> {
        self.enabled
            .iter()
            .filter(|(_, on)| **on)
            .map(|(method, _)| *method)
            .collect()
    }

    fn fails_at(&self, point: FailPoint) -> bool {
        self.fail_point == Some(point)
    }

    fn require_tables(&self) -> Result<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(BenchError::storage("relation \"employees\" does not exist"))
        }
    }

    /// The planner prefers hash, then merge, then nested loop; with every
    /// strategy disabled it still falls back to a nested loop.
    fn chosen_method(&self) -> JoinMethod {
        [JoinMethod::HashJoin, JoinMethod::MergeJoin, JoinMethod::NestLoop]
            .into_iter()
            .find(|m| self.enabled.get(m).copied().unwrap_or(false))
            .unwrap_or(JoinMethod::NestLoop)
    }

    fn simulated_ms(&self, method: JoinMethod) -> f64 {
        let e = self.employees.max(1) as f64;
        let d = self.departments.max(1) as f64;
        let indexed = !self.indexes.is_empty();
        match (method, indexed) {
            (JoinMethod::NestLoop, false) => e * d * 2e-5,
            (JoinMethod::NestLoop, true) => e * 2e-3,
            (JoinMethod::HashJoin, _) => (e + d) * 4e-4,
            (JoinMethod::MergeJoin, false) => (e * e.log2() + d * d.log2()) * 1e-4,
            (JoinMethod::MergeJoin, true) => e * 3e-4,
        }
    }

    fn render_plan(&self) -> Vec<String> {
        let method = self.chosen_method();
        let rows = self.employees;
        let total = self.simulated_ms(method);
        let scan_e = self.employees as f64 * 6e-5;
        let scan_d = self.departments as f64 * 6e-5;

        match self.plan_style {
            PlanStyle::CostsOnly => vec![
                format!("{}  (cost=0.00..{:.2} rows={} width=64)", method.node_name(), total * 40.0, rows),
                format!("  ->  Seq Scan on employees e  (cost=0.00..{:.2} rows={} width=32)", scan_e * 40.0, self.employees),
            ],
            PlanStyle::Analyzed => vec![
                format!(
                    "{}  (cost=0.00..{:.2} rows={} width=64) (actual time=0.035..{:.3} rows={} loops=1)",
                    method.node_name(),
                    total * 40.0,
                    rows,
                    total,
                    rows
                ),
                "  Join Filter: (e.department_id = d.dept_id)".to_string(),
                format!(
                    "  ->  Seq Scan on employees e  (cost=0.00..{:.2} rows={} width=32) (actual time=0.006..{:.3} rows={} loops=1)",
                    scan_e * 40.0,
                    self.employees,
                    scan_e,
                    self.employees
                ),
                format!(
                    "  ->  Seq Scan on departments d  (cost=0.00..{:.2} rows={} width=32) (actual time=0.004..{:.3} rows={} loops=1)",
                    scan_d * 40.0,
                    self.departments,
                    scan_d,
                    self.departments
                ),
                "Planning Time: 0.120 ms".to_string(),
                format!("Execution Time: {:.3} ms", total + 0.050),
            ],
        }
    }
}

impl Default for MockJoinStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JoinStore for MockJoinStore {
    async fn load(&mut self, employees: &[Employee], departments: &[Department]) -> Result<()> {
        if self.fails_at(FailPoint::Load) {
            return Err(BenchError::storage("connection refused"));
        }
        self.employees = employees.len();
        self.departments = departments.len();
        self.loaded = true;
        self.events.push(StoreEvent::Load {
            employees: self.employees,
            departments: self.departments,
        });
        tracing::info!("MOCK LOAD: {} employees, {} departments", self.employees, self.departments);
        Ok(())
    }

    async fn set_join_method(&mut self, method: JoinMethod, enabled: bool) -> Result<()> {
        if !enabled && self.fails_at(FailPoint::DisableJoinMethod(method)) {
            return Err(BenchError::PlannerConfig {
                method,
                reason: format!("unrecognized configuration parameter \"{}\"", method.setting()),
            });
        }
        self.enabled.insert(method, enabled);
        self.events.push(StoreEvent::SetJoinMethod { method, enabled });
        Ok(())
    }

    async fn join_method_enabled(&mut self, method: JoinMethod) -> Result<bool> {
        Ok(self.enabled.get(&method).copied().unwrap_or(true))
    }

    async fn run_query(&mut self, sql: &str) -> Result<u64> {
        self.require_tables()?;
        if let Some(FailPoint::Query { after }) = self.fail_point {
            if self.queries_run >= after {
                return Err(BenchError::storage("canceling statement due to user request"));
            }
        }
        self.queries_run += 1;
        self.events.push(StoreEvent::Query {
            sql: sql.to_string(),
            enabled: self.enabled_methods(),
        });
        Ok(self.employees as u64)
    }

    async fn explain_analyze(&mut self, _sql: &str) -> Result<Vec<String>> {
        self.require_tables()?;
        Ok(self.render_plan())
    }

    async fn create_index(&mut self, index: &IndexDef) -> Result<()> {
        self.require_tables()?;
        if self.fails_at(FailPoint::CreateIndex) {
            return Err(BenchError::storage(format!("could not create index \"{}\"", index.name)));
        }
        self.indexes.push(index.name.clone());
        self.events.push(StoreEvent::CreateIndex(index.name.clone()));
        Ok(())
    }

    async fn drop_index(&mut self, index: &IndexDef) -> Result<()> {
        self.indexes.retain(|name| name != &index.name);
        self.events.push(StoreEvent::DropIndex(index.name.clone()));
        Ok(())
    }

    async fn purge_tables(&mut self) -> Result<()> {
        if self.fails_at(FailPoint::Purge) {
            return Err(BenchError::storage("schema \"public\" is in use"));
        }
        self.employees = 0;
        self.departments = 0;
        self.loaded = false;
        self.indexes.clear();
        self.events.push(StoreEvent::Purge);
        Ok(())
    }

    async fn row_count(&mut self, table: Table) -> Result<u64> {
        Ok(match table {
            Table::Employees => self.employees as u64,
            Table::Departments => self.departments as u64,
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.events.push(StoreEvent::Close);
        if self.fails_at(FailPoint::Close) {
            return Err(BenchError::storage("connection reset by peer"));
        }
        Ok(())
    }
}
