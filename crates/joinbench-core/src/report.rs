use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::harness::BenchmarkRun;
use crate::Result;

const RULE: &str = "--------------------------------------------------";

/// Renders or persists a finished run.
pub trait RunPresenter {
    fn present(&self, run: &BenchmarkRun) -> Result<()>;
}

/// Runs several presenters in order, stopping at the first failure.
#[derive(Default)]
pub struct PresenterChain {
    presenters: Vec<Box<dyn RunPresenter>>,
}

impl PresenterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, presenter: impl RunPresenter + 'static) -> Self {
        self.presenters.push(Box::new(presenter));
        self
    }

    pub fn len(&self) -> usize {
        self.presenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presenters.is_empty()
    }
}

impl RunPresenter for PresenterChain {
    fn present(&self, run: &BenchmarkRun) -> Result<()> {
        for presenter in &self.presenters {
            presenter.present(run)?;
        }
        Ok(())
    }
}

/// Per-sample textual summary on stdout.
pub struct SummaryPrinter {
    pub print_plans: bool,
}

impl SummaryPrinter {
    pub fn write_summary<W: Write>(&self, run: &BenchmarkRun, out: &mut W) -> io::Result<()> {
        for result in &run.results {
            writeln!(out, "{}", RULE)?;
            writeln!(out, "Query: {}", result.label)?;
            writeln!(out, "Execution Time: {:.4} ms", result.elapsed_ms)?;
            writeln!(out, "Explained Time: {:.4} ms", result.plan_time_ms)?;
            if let Some(total) = result.execution_ms {
                writeln!(out, "Reported Execution Time: {:.4} ms", total)?;
            }
            writeln!(out, "Join Method: {}", result.join_method)?;
            if self.print_plans {
                writeln!(out, "{}", RULE)?;
                writeln!(out, "Execution Plan:")?;
                for line in &result.plan {
                    writeln!(out, "{}", line)?;
                }
            }
            writeln!(out, "{}", RULE)?;
        }
        if run.skipped > 0 {
            writeln!(out, "Skipped samples: {}", run.skipped)?;
        }
        Ok(())
    }
}

impl RunPresenter for SummaryPrinter {
    fn present(&self, run: &BenchmarkRun) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write_summary(run, &mut out)?;
        Ok(())
    }
}

/// Writes `<variant>_<employees>.json` into a directory.
pub struct JsonReport {
    dir: PathBuf,
}

impl JsonReport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, run: &BenchmarkRun) -> PathBuf {
        report_path(&self.dir, run, "json")
    }
}

impl RunPresenter for JsonReport {
    fn present(&self, run: &BenchmarkRun) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(run);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, run)?;
        writer.flush()?;
        tracing::info!("Wrote report to {}", path.display());
        Ok(())
    }
}

/// `<dir>/<variant>_<employees>.<ext>`
pub fn report_path(dir: &Path, run: &BenchmarkRun, ext: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", run.variant, run.size.employees, ext))
}
