//! Grouped bar charts for finished runs, drawn as terminal text and SVG.

use joinbench_core::report::report_path;
use joinbench_core::{BenchmarkRun, Pass, Result, RunPresenter};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

const SVG_HEIGHT: f64 = 480.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 150.0;
const BAR_WIDTH: f64 = 28.0;
const GROUP_GAP: f64 = 24.0;

/// `None` marks a label with no sample in this series; it gets no bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub color: &'static str,
    pub values: Vec<Option<f64>>,
}

/// One group of bars per label, one bar per series inside each group.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl BarChart {
    /// Indexed runs compare the two passes side by side. Every other run
    /// compares the wall-clock time against the time the plan reports.
    pub fn from_run(run: &BenchmarkRun) -> Self {
        let indexed = run.results_for(Pass::WithIndex).next().is_some();

        if indexed {
            let mut labels: Vec<String> = Vec::new();
            for result in &run.results {
                let label = result.base_label();
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
            let pass_values = |pass: Pass| -> Vec<Option<f64>> {
                labels
                    .iter()
                    .map(|label| {
                        run.results_for(pass)
                            .find(|r| &r.base_label() == label)
                            .map(|r| r.elapsed_ms)
                    })
                    .collect()
            };
            let series = vec![
                Series {
                    name: "Without Index".to_string(),
                    color: "blue",
                    values: pass_values(Pass::WithoutIndex),
                },
                Series {
                    name: "With Index".to_string(),
                    color: "orange",
                    values: pass_values(Pass::WithIndex),
                },
            ];
            return Self {
                title: run.chart_title(),
                labels,
                series,
            };
        }

        Self {
            title: run.chart_title(),
            labels: run.results.iter().map(|r| r.label.clone()).collect(),
            series: vec![
                Series {
                    name: "Execution Time".to_string(),
                    color: "blue",
                    values: run.results.iter().map(|r| Some(r.elapsed_ms)).collect(),
                },
                Series {
                    name: "Explain Time".to_string(),
                    color: "lightgreen",
                    values: run.results.iter().map(|r| Some(r.plan_time_ms)).collect(),
                },
            ],
        }
    }

    pub fn bar_count(&self) -> usize {
        self.series
            .iter()
            .map(|s| s.values.iter().filter(|v| v.is_some()).count())
            .sum()
    }

    fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten().copied())
            .fold(0.0, f64::max)
    }

    /// Horizontal bars scaled so the longest one spans `width` cells.
    pub fn render_text(&self, width: usize) -> String {
        let max = self.max_value();
        let label_width = self.labels.iter().map(|l| l.len()).max().unwrap_or(0);
        let series_width = self.series.iter().map(|s| s.name.len()).max().unwrap_or(0);

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        for (i, label) in self.labels.iter().enumerate() {
            for series in &self.series {
                let Some(value) = series.values.get(i).copied().flatten() else {
                    let _ = writeln!(
                        out,
                        "{:<lw$}  {:<sw$} | skipped",
                        label,
                        series.name,
                        lw = label_width,
                        sw = series_width,
                    );
                    continue;
                };
                let cells = if max > 0.0 {
                    ((value / max) * width as f64).round() as usize
                } else {
                    0
                };
                let _ = writeln!(
                    out,
                    "{:<lw$}  {:<sw$} |{} {:.3} ms",
                    label,
                    series.name,
                    "#".repeat(cells),
                    value,
                    lw = label_width,
                    sw = series_width,
                );
            }
        }
        out
    }

    pub fn render_svg(&self) -> String {
        let groups = self.labels.len().max(1) as f64;
        let group_width = BAR_WIDTH * self.series.len().max(1) as f64 + GROUP_GAP;
        let width = MARGIN_LEFT + MARGIN_RIGHT + groups * group_width;
        let plot_height = SVG_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let baseline = MARGIN_TOP + plot_height;
        let max = self.max_value();
        let scale = if max > 0.0 { plot_height / max } else { 0.0 };

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" font-family="sans-serif" font-size="11">"#,
            width, SVG_HEIGHT
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
            width / 2.0,
            escape(&self.title)
        );
        let _ = writeln!(
            svg,
            r#"<text x="16" y="{:.1}" text-anchor="middle" transform="rotate(-90 16 {:.1})">Execution Time (ms)</text>"#,
            MARGIN_TOP + plot_height / 2.0,
            MARGIN_TOP + plot_height / 2.0
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="black"/>"#,
            MARGIN_LEFT,
            baseline,
            width - MARGIN_RIGHT,
            baseline
        );

        for (i, label) in self.labels.iter().enumerate() {
            let group_x = MARGIN_LEFT + GROUP_GAP / 2.0 + i as f64 * group_width;
            for (j, series) in self.series.iter().enumerate() {
                let Some(value) = series.values.get(i).copied().flatten() else {
                    continue;
                };
                let height = value * scale;
                let x = group_x + j as f64 * BAR_WIDTH;
                let _ = writeln!(
                    svg,
                    r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {:.3} ms</title></rect>"#,
                    x,
                    baseline - height,
                    BAR_WIDTH - 2.0,
                    height,
                    series.color,
                    escape(&series.name),
                    value
                );
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="9">{:.2}</text>"#,
                    x + BAR_WIDTH / 2.0,
                    baseline - height - 4.0,
                    value
                );
            }
            let center = group_x + (group_width - GROUP_GAP) / 2.0;
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" transform="rotate(-45 {:.1} {:.1})">{}</text>"#,
                center,
                baseline + 14.0,
                center,
                baseline + 14.0,
                escape(label)
            );
        }

        for (j, series) in self.series.iter().enumerate() {
            let y = MARGIN_TOP + j as f64 * 16.0;
            let x = width - MARGIN_RIGHT - 130.0;
            let _ = writeln!(
                svg,
                r#"<rect x="{:.1}" y="{:.1}" width="10" height="10" fill="{}"/><text x="{:.1}" y="{:.1}">{}</text>"#,
                x,
                y,
                series.color,
                x + 14.0,
                y + 9.0,
                escape(&series.name)
            );
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Prints the text chart and writes `<variant>_<employees>.svg`.
pub struct ChartPresenter {
    dir: PathBuf,
    text_width: usize,
}

impl ChartPresenter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            text_width: 50,
        }
    }

    pub fn path_for(&self, run: &BenchmarkRun) -> PathBuf {
        report_path(&self.dir, run, "svg")
    }
}

impl RunPresenter for ChartPresenter {
    fn present(&self, run: &BenchmarkRun) -> Result<()> {
        if run.results.is_empty() {
            warn!(variant = %run.variant, "no results to plot");
            return Ok(());
        }

        let chart = BarChart::from_run(run);
        println!("{}", chart.render_text(self.text_width));

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(run);
        fs::write(&path, chart.render_svg())?;
        info!("Wrote chart to {}", path.display());
        Ok(())
    }
}
