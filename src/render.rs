//! Plain-text reports for the fan-out commands.

use crate::orchestrator::{Outcome, Report};
use crossterm::style::{Color, Stylize};
use gitfleet_core::{PruneResult, RepositoryStatus, UpdateResult};
use std::io::{self, Write};

pub const ALL_CLEAN: &str = "All repositories are clean";
pub const UP_TO_DATE: &str = "Everything up to date";
pub const NOTHING_TO_PRUNE: &str = "No branches to prune";

/// Writes reports, optionally with ANSI colors.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    pub color: bool,
    pub display_all: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self {
            color,
            display_all: false,
        }
    }

    pub fn with_display_all(mut self, display_all: bool) -> Self {
        self.display_all = display_all;
        self
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, out: &mut impl Write, report: &Report) -> io::Result<()> {
        match report {
            Report::Status(outcomes) => self.status(out, outcomes)?,
            Report::Update { fetch_only, outcomes } => self.update(out, *fetch_only, outcomes)?,
            Report::Prune { dry_run, results } => self.prune(out, *dry_run, results)?,
        }

        let summary = report.summary();
        if summary.is_all_clean() {
            let signal = match report {
                Report::Status(_) => ALL_CLEAN,
                Report::Update { .. } => UP_TO_DATE,
                Report::Prune { .. } => NOTHING_TO_PRUNE,
            };
            writeln!(out, "{}", self.paint(signal, Color::Green))?;
        } else {
            writeln!(
                out,
                "{} repositories: {} clean, {} need attention, {} failed",
                summary.total,
                summary.clean(),
                summary.with_issues,
                summary.failed
            )?;
        }
        Ok(())
    }

    fn status(&self, out: &mut impl Write, outcomes: &[Outcome<RepositoryStatus>]) -> io::Result<()> {
        for outcome in outcomes {
            let name = outcome.repository.full_name();
            let status = match &outcome.result {
                Ok(status) => status,
                Err(err) => {
                    writeln!(out, "{}: {}", self.heading(&name), self.paint(&err.to_string(), Color::Red))?;
                    continue;
                }
            };

            if !status.has_issues() {
                if self.display_all {
                    writeln!(out, "{}: {}", self.heading(&name), self.paint("clean", Color::Green))?;
                }
                continue;
            }

            writeln!(out, "{}", self.heading(&name))?;
            if status.has_uncommitted_changes {
                writeln!(
                    out,
                    "  {}",
                    self.paint(
                        &format!("{} uncommitted change(s)", status.uncommitted_changes.len()),
                        Color::Yellow
                    )
                )?;
                for change in &status.uncommitted_changes {
                    writeln!(out, "    {change}")?;
                }
            }
            if status.stash_count > 0 {
                writeln!(out, "  {} stash(es)", status.stash_count)?;
            }
            for branch in &status.branches {
                if branch.no_remote_tracking {
                    writeln!(out, "  {}: no remote tracking branch", branch.name)?;
                } else if branch.remote_gone {
                    writeln!(out, "  {}: {}", branch.name, self.paint("remote gone", Color::Red))?;
                } else if branch.behind > 0 {
                    writeln!(
                        out,
                        "  {}: {}",
                        branch.name,
                        self.paint(&format!("behind {}", branch.behind), Color::Yellow)
                    )?;
                }
            }
        }
        Ok(())
    }

    fn update(
        &self,
        out: &mut impl Write,
        fetch_only: bool,
        outcomes: &[Outcome<UpdateResult>],
    ) -> io::Result<()> {
        for outcome in outcomes {
            let name = outcome.repository.full_name();
            let update = match &outcome.result {
                Ok(update) => update,
                Err(err) if err.is_uncommitted_changes() => {
                    writeln!(out, "{}: {}", self.heading(&name), self.paint("skipped, uncommitted changes", Color::Yellow))?;
                    continue;
                }
                Err(err) => {
                    writeln!(out, "{}: {}", self.heading(&name), self.paint(&err.to_string(), Color::Red))?;
                    continue;
                }
            };

            if fetch_only {
                if self.display_all {
                    writeln!(out, "{}: fetched", self.heading(&name))?;
                }
                continue;
            }
            if update.updated_count() == 0 && !update.has_errors() {
                continue;
            }

            writeln!(out, "{}", self.heading(&name))?;
            for (branch, result) in &update.branches {
                match &result.error {
                    Some(err) => writeln!(out, "  {branch}: {}", self.paint(&err.to_string(), Color::Red))?,
                    None if result.was_updated() => {
                        writeln!(out, "  {branch}: {}", self.paint("updated", Color::Green))?
                    }
                    None => {}
                }
            }
            if let Some(err) = &update.restore_error {
                writeln!(out, "  {}", self.paint(&err.to_string(), Color::Red))?;
            }
        }
        Ok(())
    }

    fn prune(&self, out: &mut impl Write, dry_run: bool, results: &[PruneResult]) -> io::Result<()> {
        if dry_run {
            writeln!(out, "{}", self.paint("Dry run: no branches will be deleted", Color::Cyan))?;
        }
        let verb = if dry_run { "would delete" } else { "deleted" };

        for result in results {
            let name = result.repository.full_name();
            if let Some(err) = &result.error {
                writeln!(out, "{}: {}", self.heading(&name), self.paint(&err.to_string(), Color::Red))?;
                continue;
            }
            if result.pruned_branches.is_empty() {
                continue;
            }
            writeln!(out, "{}", self.heading(&name))?;
            for branch in &result.pruned_branches {
                writeln!(out, "  {verb} {branch}")?;
            }
        }
        Ok(())
    }
}
