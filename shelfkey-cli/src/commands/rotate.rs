//! Rotate command - re-encrypt stored catalog secrets under a new algorithm or key

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use super::{get_context, get_logger, log_event};
use shelfkey_core::domain::{PlanDecision, RecordKind, RotationReport};
use shelfkey_core::ports::RotationProgress;
use shelfkey_core::services::rotation::rotate_all;
use shelfkey_core::services::RotationRequest;
use shelfkey_core::{Error, LogEvent, LoggingService, OperationResult};

const COMMAND: &str = "rotate";

#[derive(Serialize)]
struct RotateResponse {
    changed: bool,
    old_algorithm: Option<String>,
    new_algorithm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<RotationReport>,
}

/// Console observer: phase headers, a progress bar, and per-record failures
struct ConsoleProgress<'a> {
    quiet: bool,
    bar: Option<ProgressBar>,
    logger: &'a Option<LoggingService>,
    algorithm: String,
}

impl<'a> ConsoleProgress<'a> {
    fn new(quiet: bool, logger: &'a Option<LoggingService>, algorithm: &str) -> Self {
        Self {
            quiet,
            bar: None,
            logger,
            algorithm: algorithm.to_string(),
        }
    }

    fn print(&self, line: String) {
        if self.quiet {
            return;
        }
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }
}

impl RotationProgress for ConsoleProgress<'_> {
    fn phase_started(&mut self, kind: RecordKind, count: usize) {
        self.print(format!("\tConverting secrets for {} {}.", count, kind.plural()));
        if self.quiet || count == 0 {
            return;
        }

        let style = ProgressStyle::with_template("\t{bar:40.cyan/blue} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(count as u64);
        bar.set_style(style);
        self.bar = Some(bar);
    }

    fn record_rotated(&mut self, _kind: RecordKind, _label: &str) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn record_failed(&mut self, _kind: RecordKind, label: &str, error: &Error) {
        self.print(format!("\t{} {}: {}", "Failed".red(), label, error));
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        log_event(
            self.logger,
            LogEvent::new("record_failed")
                .with_command(COMMAND)
                .with_record(label)
                .with_algorithm(&self.algorithm)
                .with_error(error.to_string()),
        );
    }

    fn phase_finished(&mut self, _kind: RecordKind) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Log the abort, print the JSON envelope if requested, and hand the error back
fn abort(logger: &Option<LoggingService>, json: bool, error: Error) -> anyhow::Error {
    log_event(
        logger,
        LogEvent::new("rotation_aborted")
            .with_command(COMMAND)
            .with_error(error.to_string()),
    );
    if json {
        let result: OperationResult<RotateResponse> = OperationResult::fail(error.to_string());
        if let Ok(out) = serde_json::to_string_pretty(&result) {
            println!("{}", out);
        }
    }
    error.into()
}

/// Whether to ask before rewriting secrets. JSON output cannot prompt, so it
/// only proceeds with an explicit `--yes`.
fn needs_prompt(yes: bool, json: bool) -> std::result::Result<bool, Error> {
    match (yes, json) {
        (true, _) => Ok(false),
        (false, true) => Err(Error::validation(
            "--json cannot prompt for confirmation; pass --yes to rewrite stored secrets",
        )),
        (false, false) => Ok(true),
    }
}

pub fn run(algorithm: String, key: Option<String>, yes: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(
        &logger,
        LogEvent::new("rotation_started")
            .with_command(COMMAND)
            .with_algorithm(&algorithm),
    );

    let ctx = get_context()?;
    let service = ctx.rotation_service();

    let request = RotationRequest { algorithm, key };

    let plan = match service.plan(&request) {
        Ok(PlanDecision::Rotate(plan)) => plan,
        Ok(PlanDecision::NoChange) => {
            log_event(&logger, LogEvent::new("rotation_noop").with_command(COMMAND));
            if json {
                let spec = ctx.config.encryption.current_spec();
                let result = OperationResult::ok(RotateResponse {
                    changed: false,
                    old_algorithm: Some(spec.algorithm().to_string()),
                    new_algorithm: spec.algorithm().to_string(),
                    report: None,
                });
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("No changes requested -- no action needed.");
            }
            return Ok(());
        }
        Err(e) => return Err(abort(&logger, json, e)),
    };

    let ciphers = service
        .build_ciphers(&plan)
        .map_err(|e| abort(&logger, json, e))?;

    if !json {
        println!(
            "Rotating catalog secrets: {} -> {}",
            plan.old.describe(),
            plan.new.describe()
        );
    }

    let prompt = needs_prompt(yes, json).map_err(|e| abort(&logger, json, e))?;
    if prompt
        && !Confirm::new()
            .with_prompt("Re-encrypt all stored catalog passwords? Settings are updated first.")
            .default(false)
            .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    service
        .persist_config(&plan.new)
        .map_err(|e| abort(&logger, json, e))?;
    log_event(
        &logger,
        LogEvent::new("config_written")
            .with_command(COMMAND)
            .with_algorithm(plan.new.algorithm()),
    );
    if !json {
        println!("{}", "Saved new encryption settings.".green());
    }

    let mut progress = ConsoleProgress::new(json, &logger, plan.new.algorithm());
    let report = rotate_all(&ctx.account_store(), &ctx.card_store(), &ciphers, &mut progress);

    log_event(
        &logger,
        LogEvent::new("rotation_completed")
            .with_command(COMMAND)
            .with_algorithm(plan.new.algorithm())
            .with_error_details(format!(
                "rotated {}, failed {}",
                report.total_rotated(),
                report.failures.len()
            )),
    );

    if json {
        let result = OperationResult::ok(RotateResponse {
            changed: true,
            old_algorithm: (!plan.old.is_none()).then(|| plan.old.algorithm().to_string()),
            new_algorithm: plan.new.algorithm().to_string(),
            report: Some(report),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "Rotated {} of {} user secret(s) and {} of {} card secret(s).",
        report.accounts.rotated,
        report.accounts.processed,
        report.cards.rotated,
        report.cards.processed
    );

    if report.has_failures() {
        println!();
        println!(
            "{}",
            format!("{} record(s) could not be rotated:", report.failures.len())
                .yellow()
                .bold()
        );
        for failure in &report.failures {
            println!("  {} {}", failure.label, failure.error.dimmed());
        }
        println!(
            "{}",
            "Their stored values were left unchanged; re-enter those catalog passwords.".dimmed()
        );
    }

    Ok(())
}
