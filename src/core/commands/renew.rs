use std::io::Write;

use anyhow::Result;

use super::CommandStatus;
use crate::renewal::{BatchPolicy, BatchReport, RenewalError, RenewalOutcome, Renewer};

pub fn by_id(renewer: &Renewer<'_>, endpoint_id: &str, out: &mut dyn Write) -> Result<CommandStatus> {
    finish(renewer.renew_id(endpoint_id), out)
}

pub fn by_domain(renewer: &Renewer<'_>, domain: &str, out: &mut dyn Write) -> Result<CommandStatus> {
    finish(renewer.renew_domain(domain), out)
}

/// Renews every endpoint and prints one line per endpoint. Failures are part
/// of the report; only a failed listing is returned as an error.
pub fn all(renewer: &Renewer<'_>, policy: BatchPolicy, out: &mut dyn Write) -> Result<CommandStatus> {
    let report = renewer.renew_all(policy)?;
    write_report(&report, out)?;
    Ok(report_status(&report))
}

fn finish(result: Result<RenewalOutcome, RenewalError>, out: &mut dyn Write) -> Result<CommandStatus> {
    match result {
        Ok(outcome) => {
            writeln!(out, "{outcome}")?;
            Ok(CommandStatus::Success)
        }
        Err(err) if err.is_interrupted() => {
            write_failure(&err, out)?;
            Ok(CommandStatus::Interrupted)
        }
        Err(err) => Err(err.into()),
    }
}

fn write_failure(err: &RenewalError, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{err}")?;
    if let Some(leftover) = err.leftover() {
        writeln!(out, "  left behind: {leftover}")?;
    }
    Ok(())
}

pub(crate) fn write_report(report: &BatchReport, out: &mut dyn Write) -> Result<()> {
    for entry in &report.entries {
        match &entry.result {
            Ok(outcome) => writeln!(out, "{outcome}")?,
            Err(err) => write_failure(err, out)?,
        }
    }
    for endpoint_id in &report.not_attempted {
        writeln!(out, "{endpoint_id}: not attempted")?;
    }
    Ok(())
}

fn report_status(report: &BatchReport) -> CommandStatus {
    if report.was_interrupted() {
        CommandStatus::Interrupted
    } else if report.is_success() {
        CommandStatus::Success
    } else {
        CommandStatus::Failed
    }
}
