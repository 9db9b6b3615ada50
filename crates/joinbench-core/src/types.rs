use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::plan::PlanTiming;
use crate::store::Measurement;
use crate::{BenchError, Result};

/// Planner join strategies that can be toggled per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMethod {
    NestLoop,
    HashJoin,
    MergeJoin,
}

impl JoinMethod {
    pub const ALL: [JoinMethod; 3] = [JoinMethod::NestLoop, JoinMethod::HashJoin, JoinMethod::MergeJoin];

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinMethod::NestLoop => "nestloop",
            JoinMethod::HashJoin => "hashjoin",
            JoinMethod::MergeJoin => "mergejoin",
        }
    }

    /// Name of the planner switch, e.g. `enable_hashjoin`.
    pub fn setting(&self) -> String {
        format!("enable_{}", self.as_str())
    }

    /// Node name the planner prints for this strategy.
    pub fn node_name(&self) -> &'static str {
        match self {
            JoinMethod::NestLoop => "Nested Loop",
            JoinMethod::HashJoin => "Hash Join",
            JoinMethod::MergeJoin => "Merge Join",
        }
    }
}

impl fmt::Display for JoinMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinMethod {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nestloop" | "nested-loop" | "nested_loop" => Ok(JoinMethod::NestLoop),
            "hashjoin" | "hash-join" | "hash_join" | "hash" => Ok(JoinMethod::HashJoin),
            "mergejoin" | "merge-join" | "merge_join" | "merge" => Ok(JoinMethod::MergeJoin),
            other => Err(BenchError::InvalidConfig(format!("unknown join method '{}'", other))),
        }
    }
}

/// The two benchmark tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Employees,
    Departments,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::Employees, Table::Departments];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Employees => "employees",
            Table::Departments => "departments",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub emp_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub department_id: i64,
    pub salary: f64,
    pub hire_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub dept_id: i64,
    pub dept_name: String,
    pub location: String,
    pub budget: f64,
}

/// Number of rows generated for one run. Both counts are at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSize {
    pub employees: usize,
    pub departments: usize,
}

impl DatasetSize {
    pub fn new(employees: usize, departments: usize) -> Result<Self> {
        if employees == 0 || departments == 0 {
            return Err(BenchError::InvalidConfig(format!(
                "dataset needs at least one employee and one department (got {} / {})",
                employees, departments
            )));
        }
        Ok(Self { employees, departments })
    }
}

/// A labeled query run by a benchmark variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDescriptor {
    pub label: String,
    pub sql: String,
}

impl QueryDescriptor {
    pub fn new(label: impl Into<String>, sql: impl Into<String>) -> Self {
        Self { label: label.into(), sql: sql.into() }
    }
}

/// Which measurement sweep a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Single,
    WithoutIndex,
    WithIndex,
}

impl Pass {
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Pass::Single => None,
            Pass::WithoutIndex => Some("without index"),
            Pass::WithIndex => Some("with index"),
        }
    }
}

/// One measured query under one forced join method.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub label: String,
    pub query: String,
    pub pass: Pass,
    pub join_method: JoinMethod,
    pub elapsed_ms: f64,
    pub plan_time_ms: f64,
    pub planning_ms: Option<f64>,
    pub execution_ms: Option<f64>,
    pub rows: Option<u64>,
    pub plan: Vec<String>,
}

impl ExecutionResult {
    pub fn new(
        query: &QueryDescriptor,
        pass: Pass,
        join_method: JoinMethod,
        measurement: Measurement,
        timing: PlanTiming,
    ) -> Self {
        let label = match pass.suffix() {
            Some(suffix) => format!("{} {} {}", query.label, join_method, suffix),
            None => format!("{} {}", query.label, join_method),
        };

        Self {
            label,
            query: query.label.clone(),
            pass,
            join_method,
            elapsed_ms: measurement.elapsed_ms,
            plan_time_ms: timing.root.total_ms,
            planning_ms: timing.planning_ms,
            execution_ms: timing.execution_ms,
            rows: timing.root.rows,
            plan: measurement.plan,
        }
    }

    /// Label without the pass suffix, used to line up indexed/non-indexed bars.
    pub fn base_label(&self) -> String {
        format!("{} {}", self.query, self.join_method)
    }
}
