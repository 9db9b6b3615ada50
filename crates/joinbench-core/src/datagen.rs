//! Synthetic employee/department data.
//!
//! Names, companies and cities are drawn from small built-in word lists;
//! salaries, budgets, department references and hire dates are uniform.
//! Passing a seed makes the output reproducible.

use chrono::{Datelike, Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::types::{DatasetSize, Department, Employee};

const FIRST_NAMES: &[&str] = &[
    "Aaron", "Abigail", "Adam", "Alice", "Amanda", "Andrew", "Anna", "Anthony", "Ashley", "Barbara",
    "Benjamin", "Brian", "Carol", "Charles", "Christopher", "Daniel", "David", "Deborah", "Donna",
    "Edward", "Elizabeth", "Emily", "Eric", "Frank", "Gary", "George", "Hannah", "Helen", "Jacob",
    "James", "Jennifer", "Jessica", "John", "Joseph", "Karen", "Kevin", "Laura", "Linda", "Lisa",
    "Mark", "Mary", "Matthew", "Melissa", "Michael", "Nancy", "Nicole", "Olivia", "Patricia", "Paul",
    "Rachel", "Rebecca", "Richard", "Robert", "Ronald", "Sandra", "Sarah", "Scott", "Sharon",
    "Stephanie", "Steven", "Susan", "Thomas", "Timothy", "William",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Allen", "Anderson", "Baker", "Brown", "Campbell", "Carter", "Clark", "Collins",
    "Davis", "Edwards", "Evans", "Garcia", "Gonzalez", "Green", "Hall", "Harris", "Hernandez",
    "Hill", "Jackson", "Johnson", "Jones", "King", "Lee", "Lewis", "Lopez", "Martin", "Martinez",
    "Miller", "Mitchell", "Moore", "Nelson", "Parker", "Perez", "Phillips", "Roberts", "Robinson",
    "Rodriguez", "Scott", "Smith", "Taylor", "Thomas", "Thompson", "Turner", "Walker", "White",
    "Williams", "Wilson", "Wright", "Young",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Ltd", "Group", "PLC", "and Sons"];

const CITIES: &[&str] = &[
    "Port Jennifer", "East Michael", "Lake Sarah", "New David", "North Laura", "South Brian",
    "West Anthony", "Jamesview", "Kellyberg", "Millerton", "Smithfurt", "Davisborough",
    "Garciamouth", "Johnsonstad", "Brownside", "Wilsonhaven", "Clarkport", "Lewisville",
    "Walkerbury", "Hallchester",
];

const HIRE_WINDOW_YEARS: i32 = 10;

pub struct DataGenerator {
    rng: StdRng,
    today: NaiveDate,
}

impl DataGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, today: Local::now().date_naive() }
    }

    /// Pin the end of the hire-date window.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn generate(&mut self, size: DatasetSize) -> (Vec<Employee>, Vec<Department>) {
        let departments = (1..=size.departments as i64)
            .map(|dept_id| self.department(dept_id))
            .collect();

        let employees = (1..=size.employees as i64)
            .map(|emp_id| self.employee(emp_id, size.departments as i64))
            .collect();

        (employees, departments)
    }

    fn department(&mut self, dept_id: i64) -> Department {
        Department {
            dept_id,
            dept_name: self.company(),
            location: self.pick(CITIES).to_string(),
            budget: round2(self.rng.gen_range(50_000.0..=500_000.0)),
        }
    }

    fn employee(&mut self, emp_id: i64, num_departments: i64) -> Employee {
        Employee {
            emp_id,
            first_name: self.pick(FIRST_NAMES).to_string(),
            last_name: self.pick(LAST_NAMES).to_string(),
            department_id: self.rng.gen_range(1..=num_departments),
            salary: round2(self.rng.gen_range(30_000.0..=120_000.0)),
            hire_date: self.hire_date(),
        }
    }

    fn company(&mut self) -> String {
        let first = self.pick(LAST_NAMES);
        match self.rng.gen_range(0..3) {
            0 => format!("{} {}", first, self.pick(COMPANY_SUFFIXES)),
            1 => format!("{}-{}", first, self.pick(LAST_NAMES)),
            _ => format!("{}, {} and {}", first, self.pick(LAST_NAMES), self.pick(LAST_NAMES)),
        }
    }

    fn hire_date(&mut self) -> NaiveDate {
        let earliest = self
            .today
            .with_year(self.today.year() - HIRE_WINDOW_YEARS)
            .unwrap_or_else(|| self.today - Duration::days(365 * HIRE_WINDOW_YEARS as i64 + 3));
        let span = (self.today - earliest).num_days();
        earliest + Duration::days(self.rng.gen_range(0..=span))
    }

    fn pick(&mut self, words: &'static [&'static str]) -> &'static str {
        words.choose(&mut self.rng).copied().unwrap_or_default()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(employees: usize, departments: usize) -> DatasetSize {
        DatasetSize::new(employees, departments).unwrap()
    }

    #[test]
    fn test_generate_counts_and_ids() {
        let mut gen = DataGenerator::new(Some(7));
        let (employees, departments) = gen.generate(size(250, 12));

        assert_eq!(employees.len(), 250);
        assert_eq!(departments.len(), 12);
        assert!(employees.iter().enumerate().all(|(i, e)| e.emp_id == i as i64 + 1));
        assert!(departments.iter().enumerate().all(|(i, d)| d.dept_id == i as i64 + 1));
    }

    #[test]
    fn test_generated_value_ranges() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let mut gen = DataGenerator::new(Some(42)).with_today(today);
        let (employees, departments) = gen.generate(size(1000, 5));

        let earliest = NaiveDate::from_ymd_opt(2014, 2, 28).unwrap();
        for e in &employees {
            assert!((1..=5).contains(&e.department_id));
            assert!((30_000.0..=120_000.0).contains(&e.salary));
            assert!(e.hire_date >= earliest && e.hire_date <= today, "hire date {}", e.hire_date);
            assert!(!e.first_name.is_empty() && !e.last_name.is_empty());
        }
        for d in &departments {
            assert!((50_000.0..=500_000.0).contains(&d.budget));
            assert!(!d.dept_name.is_empty());
            assert!(CITIES.contains(&d.location.as_str()));
        }
    }

    #[test]
    fn test_amounts_rounded_to_cents() {
        let mut gen = DataGenerator::new(Some(3));
        let (employees, _) = gen.generate(size(100, 1));
        for e in employees {
            assert_eq!(round2(e.salary), e.salary);
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let a = DataGenerator::new(Some(99)).with_today(today).generate(size(50, 4));
        let b = DataGenerator::new(Some(99)).with_today(today).generate(size(50, 4));
        let c = DataGenerator::new(Some(100)).with_today(today).generate(size(50, 4));

        assert_eq!(a, b);
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn test_single_department_references() {
        let mut gen = DataGenerator::new(Some(1));
        let (employees, _) = gen.generate(size(20, 1));
        assert!(employees.iter().all(|e| e.department_id == 1));
    }
}
