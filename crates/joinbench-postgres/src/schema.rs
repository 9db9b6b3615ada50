use joinbench_core::{Department, Employee};
use sqlx::{Postgres, QueryBuilder};

// Postgres caps a statement at 65535 bind parameters.
pub const EMPLOYEE_BATCH: usize = 5_000;
pub const DEPARTMENT_BATCH: usize = 10_000;

pub const DROP_EMPLOYEES: &str = "DROP TABLE IF EXISTS employees";
pub const DROP_DEPARTMENTS: &str = "DROP TABLE IF EXISTS departments";

pub const CREATE_EMPLOYEES: &str = "CREATE TABLE employees (
    emp_id BIGINT,
    first_name TEXT,
    last_name TEXT,
    department_id BIGINT,
    salary DOUBLE PRECISION,
    hire_date DATE
)";

pub const CREATE_DEPARTMENTS: &str = "CREATE TABLE departments (
    dept_id BIGINT,
    dept_name TEXT,
    location TEXT,
    budget DOUBLE PRECISION
)";

pub const DROP_SCHEMA: &str = "DROP SCHEMA public CASCADE";
pub const CREATE_SCHEMA: &str = "CREATE SCHEMA public";

pub fn insert_employees(rows: &[Employee]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO employees (emp_id, first_name, last_name, department_id, salary, hire_date) ",
    );
    builder.push_values(rows, |mut row, e| {
        row.push_bind(e.emp_id)
            .push_bind(e.first_name.as_str())
            .push_bind(e.last_name.as_str())
            .push_bind(e.department_id)
            .push_bind(e.salary)
            .push_bind(e.hire_date);
    });
    builder
}

pub fn insert_departments(rows: &[Department]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new("INSERT INTO departments (dept_id, dept_name, location, budget) ");
    builder.push_values(rows, |mut row, d| {
        row.push_bind(d.dept_id)
            .push_bind(d.dept_name.as_str())
            .push_bind(d.location.as_str())
            .push_bind(d.budget);
    });
    builder
}

pub fn set_join_method_sql(setting: &str, enabled: bool) -> String {
    format!("SET {} = {}", setting, if enabled { "on" } else { "off" })
}

pub fn explain_analyze_sql(sql: &str) -> String {
    format!("EXPLAIN ANALYZE {}", sql)
}
