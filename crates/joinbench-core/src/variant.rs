use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::{Pass, QueryDescriptor};
use crate::{BenchError, Result};

const PROJECTED_JOIN: &str =
    "SELECT e.first_name, e.last_name, d.dept_name FROM employees e JOIN departments d ON e.department_id = d.dept_id";

/// Secondary index created for the indexed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub column: String,
}

impl IndexDef {
    pub fn new(name: &str, table: &str, column: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn create_sql(&self) -> String {
        format!("CREATE INDEX {} ON {}({})", self.name, self.table, self.column)
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP INDEX IF EXISTS {}", self.name)
    }
}

/// Everything that distinguishes one benchmark from another.
#[derive(Debug, Clone, Serialize)]
pub struct VariantConfig {
    pub name: String,
    pub title: String,
    pub queries: Vec<QueryDescriptor>,
    /// Non-empty means a second pass runs with these indexes in place.
    pub indexes: Vec<IndexDef>,
}

impl VariantConfig {
    pub fn new(name: impl Into<String>, title: impl Into<String>, queries: Vec<QueryDescriptor>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            queries,
            indexes: vec![],
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<IndexDef>) -> Self {
        self.indexes = indexes;
        self
    }

    pub fn is_indexed(&self) -> bool {
        !self.indexes.is_empty()
    }

    pub fn passes(&self) -> Vec<Pass> {
        if self.is_indexed() {
            vec![Pass::WithoutIndex, Pass::WithIndex]
        } else {
            vec![Pass::Single]
        }
    }
}

/// The built-in benchmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// Equi-join on department id
    Plain,
    /// Equi-join, measured without and then with secondary indexes
    Indexed,
    /// Equi-join filtered by a LIKE prefix pattern
    Pattern,
    /// Non-equi join on a BETWEEN range
    Range,
    /// Inner/outer join types plus LIKE and BETWEEN filters
    Catalogue,
}

impl VariantKind {
    pub const ALL: [VariantKind; 5] = [
        VariantKind::Plain,
        VariantKind::Indexed,
        VariantKind::Pattern,
        VariantKind::Range,
        VariantKind::Catalogue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Plain => "plain",
            VariantKind::Indexed => "indexed",
            VariantKind::Pattern => "pattern",
            VariantKind::Range => "range",
            VariantKind::Catalogue => "catalogue",
        }
    }

    pub fn config(&self) -> VariantConfig {
        match self {
            VariantKind::Plain => VariantConfig::new(
                self.as_str(),
                "Join Method Test",
                vec![QueryDescriptor::new("Join using ON", PROJECTED_JOIN)],
            ),
            VariantKind::Indexed => VariantConfig::new(
                self.as_str(),
                "Execution Time with and without Indexes",
                vec![QueryDescriptor::new(
                    "Join using ON",
                    "SELECT * FROM employees e JOIN departments d ON e.department_id = d.dept_id",
                )],
            )
            .with_indexes(vec![
                IndexDef::new("idx_employees_department_id", "employees", "department_id"),
                IndexDef::new("idx_departments_dept_id", "departments", "dept_id"),
                IndexDef::new("idx_departments_name", "departments", "dept_name"),
            ]),
            VariantKind::Pattern => VariantConfig::new(
                self.as_str(),
                "Join Like Test",
                vec![QueryDescriptor::new(
                    "Join with LIKE",
                    format!("{} WHERE e.first_name LIKE 'A%'", PROJECTED_JOIN),
                )],
            ),
            VariantKind::Range => VariantConfig::new(
                self.as_str(),
                "Join Between Test",
                vec![QueryDescriptor::new(
                    "Join using BETWEEN",
                    "SELECT * FROM employees e JOIN departments d ON e.department_id BETWEEN d.dept_id AND d.dept_id + 10",
                )],
            ),
            VariantKind::Catalogue => VariantConfig::new(
                self.as_str(),
                "Join Query Execution Times",
                vec![
                    QueryDescriptor::new("Inner Join", PROJECTED_JOIN),
                    QueryDescriptor::new(
                        "Left Join",
                        "SELECT e.first_name, e.last_name, d.dept_name FROM employees e LEFT JOIN departments d ON e.department_id = d.dept_id",
                    ),
                    QueryDescriptor::new(
                        "Right Join",
                        "SELECT e.first_name, e.last_name, d.dept_name FROM employees e RIGHT JOIN departments d ON e.department_id = d.dept_id",
                    ),
                    QueryDescriptor::new(
                        "Full Outer Join",
                        "SELECT e.first_name, e.last_name, d.dept_name FROM employees e FULL OUTER JOIN departments d ON e.department_id = d.dept_id",
                    ),
                    QueryDescriptor::new(
                        "Join with LIKE",
                        format!("{} WHERE e.first_name LIKE 'A%'", PROJECTED_JOIN),
                    ),
                    QueryDescriptor::new(
                        "Join with BETWEEN",
                        format!("{} WHERE e.salary BETWEEN 50000 AND 100000", PROJECTED_JOIN),
                    ),
                ],
            ),
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantKind {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "join" => Ok(VariantKind::Plain),
            "indexed" | "index" => Ok(VariantKind::Indexed),
            "pattern" | "like" => Ok(VariantKind::Pattern),
            "range" | "between" => Ok(VariantKind::Range),
            "catalogue" | "catalog" => Ok(VariantKind::Catalogue),
            other => Err(BenchError::InvalidConfig(format!("unknown benchmark variant '{}'", other))),
        }
    }
}
