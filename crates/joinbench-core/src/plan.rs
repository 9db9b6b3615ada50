//! Timing extraction from PostgreSQL `EXPLAIN ANALYZE` text output.
//!
//! A plan node line carries its runtime in the group
//! `(actual time=<startup>..<total> rows=<n> loops=<n>)`, and the report ends
//! with `Planning Time: <x> ms` / `Execution Time: <x> ms` footer lines.
//! The first line is always the root node.

use nom::{
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0, multispace1, u64 as parse_u64},
    combinator::{map, map_res, opt, recognize},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use serde::Serialize;
use thiserror::Error;

const ACTUAL_TIME: &str = "actual time=";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanParseError {
    #[error("execution plan is empty")]
    EmptyPlan,
    #[error("no 'actual time=' in plan line: {0}")]
    MissingActualTime(String),
    #[error("malformed actual time in plan line: {0}")]
    Malformed(String),
}

/// Runtime figures of a single plan node, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeTiming {
    pub startup_ms: f64,
    pub total_ms: f64,
    pub rows: Option<u64>,
    pub loops: Option<u64>,
}

/// Root node timing plus the report footer, when present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanTiming {
    pub root: NodeTiming,
    pub planning_ms: Option<f64>,
    pub execution_ms: Option<f64>,
}

impl PlanTiming {
    pub fn parse<S: AsRef<str>>(plan: &[S]) -> Result<Self, PlanParseError> {
        let first = plan.first().ok_or(PlanParseError::EmptyPlan)?;
        let root = parse_node_timing(first.as_ref())?;

        let mut planning_ms = None;
        let mut execution_ms = None;
        for line in plan.iter().skip(1) {
            let line = line.as_ref();
            if let Some(ms) = footer_ms(line, "Planning Time") {
                planning_ms = Some(ms);
            } else if let Some(ms) = footer_ms(line, "Execution Time") {
                execution_ms = Some(ms);
            }
        }

        Ok(Self { root, planning_ms, execution_ms })
    }
}

/// End time of the root node, e.g. `67.890` for `actual time=12.345..67.890`.
pub fn parse_actual_time<S: AsRef<str>>(plan: &[S]) -> Result<f64, PlanParseError> {
    let first = plan.first().ok_or(PlanParseError::EmptyPlan)?;
    parse_node_timing(first.as_ref()).map(|timing| timing.total_ms)
}

pub fn parse_node_timing(line: &str) -> Result<NodeTiming, PlanParseError> {
    let start = line
        .find(ACTUAL_TIME)
        .ok_or_else(|| PlanParseError::MissingActualTime(line.to_string()))?;

    match actual_time_group(&line[start..]) {
        Ok((_, timing)) => Ok(timing),
        Err(_) => Err(PlanParseError::Malformed(line.to_string())),
    }
}

fn actual_time_group(input: &str) -> IResult<&str, NodeTiming> {
    map(
        tuple((
            preceded(tag(ACTUAL_TIME), millis),
            preceded(tag(".."), millis),
            opt(preceded(pair(multispace1, tag("rows=")), parse_u64)),
            opt(preceded(pair(multispace1, tag("loops=")), parse_u64)),
        )),
        |(startup_ms, total_ms, rows, loops)| NodeTiming {
            startup_ms,
            total_ms,
            rows,
            loops,
        },
    )(input)
}

// 12, 12.345 (no exponent, no sign; `..` must stay unconsumed)
fn millis(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        str::parse::<f64>,
    )(input)
}

fn footer_ms(line: &str, label: &str) -> Option<f64> {
    let parsed: IResult<&str, f64> = preceded(
        tuple((multispace0, tag(label), char(':'), multispace0)),
        terminated(millis, opt(pair(multispace0, tag("ms")))),
    )(line);
    parsed.ok().map(|(_, ms)| ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_PLAN: &[&str] = &[
        "Hash Join  (cost=3.25..2041.38 rows=100000 width=24) (actual time=0.041..27.120 rows=100000 loops=1)",
        "  Hash Cond: (e.department_id = d.dept_id)",
        "  ->  Seq Scan on employees e  (cost=0.00..1736.00 rows=100000 width=19) (actual time=0.008..6.518 rows=100000 loops=1)",
        "  ->  Hash  (cost=2.00..2.00 rows=100 width=13) (actual time=0.027..0.028 rows=100 loops=1)",
        "        Buckets: 1024  Batches: 1  Memory Usage: 13kB",
        "Planning Time: 0.211 ms",
        "Execution Time: 29.904 ms",
    ];

    #[test]
    fn test_parse_actual_time_takes_end_of_range() {
        let plan = ["Nested Loop  (cost=0.00..1.00 rows=1 width=8) (actual time=12.345..67.890 rows=10 loops=1)"];
        assert_eq!(parse_actual_time(&plan).unwrap(), 67.890);
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let plan = ["Hash Join  (cost=3.25..2041.38 rows=100000 width=24)"];
        match parse_actual_time(&plan) {
            Err(PlanParseError::MissingActualTime(line)) => assert!(line.starts_with("Hash Join")),
            other => panic!("Expected MissingActualTime, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_plan() {
        let plan: [&str; 0] = [];
        assert_eq!(parse_actual_time(&plan), Err(PlanParseError::EmptyPlan));
    }

    #[test]
    fn test_malformed_range() {
        let line = "Seq Scan on t (actual time=abc..1.0 rows=1 loops=1)";
        assert!(matches!(parse_node_timing(line), Err(PlanParseError::Malformed(_))));

        let line = "Seq Scan on t (actual time=0.5-1.0 rows=1 loops=1)";
        assert!(matches!(parse_node_timing(line), Err(PlanParseError::Malformed(_))));
    }

    #[test]
    fn test_node_timing_rows_and_loops() {
        let timing = parse_node_timing(HASH_PLAN[0]).unwrap();
        assert_eq!(timing.startup_ms, 0.041);
        assert_eq!(timing.total_ms, 27.120);
        assert_eq!(timing.rows, Some(100000));
        assert_eq!(timing.loops, Some(1));
    }

    #[test]
    fn test_node_timing_without_decimals() {
        let timing = parse_node_timing("Result (actual time=1..2 rows=1 loops=3)").unwrap();
        assert_eq!(timing.startup_ms, 1.0);
        assert_eq!(timing.total_ms, 2.0);
        assert_eq!(timing.loops, Some(3));
    }

    #[test]
    fn test_node_timing_without_row_counts() {
        // EXPLAIN (ANALYZE, TIMING) with a trailing close paren only
        let timing = parse_node_timing("Limit (actual time=0.010..0.020)").unwrap();
        assert_eq!(timing.total_ms, 0.020);
        assert_eq!(timing.rows, None);
    }

    #[test]
    fn test_plan_timing_reads_footer() {
        let timing = PlanTiming::parse(HASH_PLAN).unwrap();
        assert_eq!(timing.root.total_ms, 27.120);
        assert_eq!(timing.planning_ms, Some(0.211));
        assert_eq!(timing.execution_ms, Some(29.904));
    }

    #[test]
    fn test_plan_timing_only_reads_root_line() {
        // The root line decides; a timed child does not rescue a root without timing.
        let plan = [
            "Gather  (cost=1000.00..2000.00 rows=10 width=4)",
            "  ->  Seq Scan on employees  (actual time=0.010..5.000 rows=10 loops=1)",
        ];
        assert!(matches!(PlanTiming::parse(&plan), Err(PlanParseError::MissingActualTime(_))));
    }

    #[test]
    fn test_footer_ms() {
        assert_eq!(footer_ms("Execution Time: 1.500 ms", "Execution Time"), Some(1.5));
        assert_eq!(footer_ms("  Planning Time: 0.2 ms", "Planning Time"), Some(0.2));
        assert_eq!(footer_ms("Execution Time: n/a", "Execution Time"), None);
    }
}
