use std::fmt;
use std::io;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use super::decision::{RenewalDecision, evaluate};
use super::interrupt::Interrupt;
use crate::api::{ApiError, CdnDirectory, CertificateStore};
use crate::domain::{certificate_slug, slugged_name};
use crate::issuance::{CertificateAuthority, IssuanceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalStep {
    ResolveEndpoint,
    Evaluate,
    Issue,
    Upload,
    Rebind,
    RetireOld,
}

impl RenewalStep {
    pub fn as_str(self) -> &'static str {
        match self {
            RenewalStep::ResolveEndpoint => "resolve_endpoint",
            RenewalStep::Evaluate => "evaluate",
            RenewalStep::Issue => "issue",
            RenewalStep::Upload => "upload",
            RenewalStep::Rebind => "rebind",
            RenewalStep::RetireOld => "retire_old",
        }
    }
}

impl fmt::Display for RenewalStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External state a failed run leaves behind. Neither case loses data; a
/// later run or an operator can clean it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leftover {
    /// Uploaded but never bound to the endpoint.
    UnboundCertificate { certificate_id: String },
    /// Unbound from the endpoint but not deleted.
    SupersededCertificate { certificate_id: String },
}

impl fmt::Display for Leftover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leftover::UnboundCertificate { certificate_id } => {
                write!(f, "certificate {certificate_id} was uploaded but is not bound")
            }
            Leftover::SupersededCertificate { certificate_id } => {
                write!(f, "certificate {certificate_id} is unbound but was not deleted")
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Issuance(#[from] IssuanceError),
    #[error("failed to read issued material: {0}")]
    Material(#[source] io::Error),
    #[error("{0}")]
    Naming(String),
    /// The provider accepted the rebind but reports another certificate bound.
    #[error("endpoint reports certificate {actual:?} bound instead of {expected}")]
    RebindMismatch {
        expected: String,
        actual: Option<String>,
    },
}

#[derive(Error, Debug)]
pub enum RenewalError {
    /// `endpoint_id` holds the requested domain when the domain lookup
    /// itself failed.
    #[error("renewal of {endpoint_id} failed at {step}: {source}")]
    StepFailed {
        endpoint_id: String,
        step: RenewalStep,
        #[source]
        source: StepError,
        leftover: Option<Leftover>,
    },
    #[error("renewal of {endpoint_id} interrupted before {step}")]
    Interrupted {
        endpoint_id: String,
        step: RenewalStep,
        leftover: Option<Leftover>,
    },
    #[error("failed to list CDN endpoints: {0}")]
    Listing(#[source] ApiError),
}

impl RenewalError {
    pub fn step(&self) -> Option<RenewalStep> {
        match self {
            RenewalError::StepFailed { step, .. } | RenewalError::Interrupted { step, .. } => {
                Some(*step)
            }
            RenewalError::Listing(_) => None,
        }
    }

    pub fn leftover(&self) -> Option<&Leftover> {
        match self {
            RenewalError::StepFailed { leftover, .. }
            | RenewalError::Interrupted { leftover, .. } => leftover.as_ref(),
            RenewalError::Listing(_) => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, RenewalError::Interrupted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// Certificate still has more than the renewal threshold left.
    Skipped {
        endpoint_id: String,
        certificate_id: String,
        not_after: DateTime<Utc>,
        seconds_remaining: i64,
    },
    Renewed {
        endpoint_id: String,
        domain: String,
        old_certificate_id: String,
        new_certificate_id: String,
        new_certificate_name: String,
    },
    /// Endpoint has no bound certificate or no custom domain to issue for.
    Unmanaged { endpoint_id: String, reason: String },
}

impl RenewalOutcome {
    pub fn endpoint_id(&self) -> &str {
        match self {
            RenewalOutcome::Skipped { endpoint_id, .. }
            | RenewalOutcome::Renewed { endpoint_id, .. }
            | RenewalOutcome::Unmanaged { endpoint_id, .. } => endpoint_id,
        }
    }
}

impl fmt::Display for RenewalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenewalOutcome::Skipped {
                endpoint_id,
                certificate_id,
                seconds_remaining,
                ..
            } => write!(
                f,
                "{endpoint_id}: skipped, {certificate_id} has {} days left",
                seconds_remaining / 86_400
            ),
            RenewalOutcome::Renewed {
                endpoint_id,
                domain,
                old_certificate_id,
                new_certificate_id,
                new_certificate_name,
            } => write!(
                f,
                "{endpoint_id}: renewed {domain}, {old_certificate_id} -> {new_certificate_id} ({new_certificate_name})"
            ),
            RenewalOutcome::Unmanaged {
                endpoint_id,
                reason,
            } => write!(f, "{endpoint_id}: unmanaged, {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    #[default]
    HaltOnFailure,
    ContinueOnFailure,
}

#[derive(Debug)]
pub struct BatchEntry {
    pub endpoint_id: String,
    pub result: Result<RenewalOutcome, RenewalError>,
}

/// Per-endpoint results of a `renew all` pass, in listing order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    /// Endpoints never attempted because the batch stopped early.
    pub not_attempted: Vec<String>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &RenewalError)> {
        self.entries.iter().filter_map(|entry| match &entry.result {
            Ok(_) => None,
            Err(err) => Some((entry.endpoint_id.as_str(), err)),
        })
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &RenewalOutcome> {
        self.entries.iter().filter_map(|entry| entry.result.as_ref().ok())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn was_interrupted(&self) -> bool {
        self.failures().any(|(_, err)| err.is_interrupted())
    }
}

/// Drives one endpoint at a time through
/// resolve → evaluate → issue → upload → rebind → retire.
///
/// Steps run strictly in order and the first failure ends the run. Nothing
/// already done is rolled back; the error carries whatever was left behind.
pub struct Renewer<'a> {
    directory: &'a CdnDirectory,
    store: &'a CertificateStore,
    authority: &'a dyn CertificateAuthority,
    interrupt: Interrupt,
}

impl<'a> Renewer<'a> {
    pub fn new(
        directory: &'a CdnDirectory,
        store: &'a CertificateStore,
        authority: &'a dyn CertificateAuthority,
    ) -> Self {
        Self {
            directory,
            store,
            authority,
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn renew_id(&self, endpoint_id: &str) -> Result<RenewalOutcome, RenewalError> {
        let mut progress = Progress::new(endpoint_id, &self.interrupt);

        progress.enter(RenewalStep::ResolveEndpoint)?;
        let endpoint = self
            .directory
            .find_by_id(endpoint_id)
            .map_err(|err| progress.fail(RenewalStep::ResolveEndpoint, err))?;
        let Some(old_certificate_id) = endpoint.bound_certificate().map(str::to_string) else {
            return Ok(unmanaged(endpoint_id, "no certificate bound"));
        };
        let Some(domain) = endpoint.custom_domain().map(str::to_string) else {
            return Ok(unmanaged(endpoint_id, "no custom domain"));
        };
        let slug = certificate_slug(&domain).map_err(|err| {
            progress.fail(RenewalStep::ResolveEndpoint, StepError::Naming(err.to_string()))
        })?;

        progress.enter(RenewalStep::Evaluate)?;
        let current = self
            .store
            .get(&old_certificate_id)
            .map_err(|err| progress.fail(RenewalStep::Evaluate, err))?;
        let decision = evaluate(current.not_after, Utc::now());
        if let RenewalDecision::Skip { seconds_remaining } = decision {
            info!(
                "[renew] {}: {} valid until {}, skipping",
                endpoint_id, old_certificate_id, current.not_after
            );
            return Ok(RenewalOutcome::Skipped {
                endpoint_id: endpoint_id.to_string(),
                certificate_id: old_certificate_id,
                not_after: current.not_after,
                seconds_remaining,
            });
        }
        info!(
            "[renew] {}: {} expires {} ({}s left), renewing {}",
            endpoint_id,
            old_certificate_id,
            current.not_after,
            decision.seconds_remaining(),
            domain
        );

        progress.enter(RenewalStep::Issue)?;
        let issued = self
            .authority
            .issue(&domain)
            .map_err(|err| progress.fail(RenewalStep::Issue, err))?;

        progress.enter(RenewalStep::Upload)?;
        let material = issued
            .read()
            .map_err(|err| progress.fail(RenewalStep::Upload, StepError::Material(err)))?;
        let name = slugged_name(&slug, &material.leaf);
        let uploaded = self
            .store
            .upload(&name, &material)
            .map_err(|err| progress.fail(RenewalStep::Upload, err))?;
        drop(material);
        progress.leftover = Some(Leftover::UnboundCertificate {
            certificate_id: uploaded.id.clone(),
        });

        progress.enter(RenewalStep::Rebind)?;
        let rebound = self
            .directory
            .rebind(endpoint_id, &uploaded.id)
            .map_err(|err| progress.fail(RenewalStep::Rebind, err))?;
        if rebound.bound_certificate() != Some(uploaded.id.as_str()) {
            return Err(progress.fail(
                RenewalStep::Rebind,
                StepError::RebindMismatch {
                    expected: uploaded.id.clone(),
                    actual: rebound.bound_certificate().map(str::to_string),
                },
            ));
        }

        if uploaded.id == old_certificate_id {
            warn!(
                "[renew] {}: store returned the existing id {}, keeping it",
                endpoint_id, uploaded.id
            );
        } else {
            progress.leftover = Some(Leftover::SupersededCertificate {
                certificate_id: old_certificate_id.clone(),
            });
            progress.enter(RenewalStep::RetireOld)?;
            self.store
                .delete(&old_certificate_id)
                .map_err(|err| progress.fail(RenewalStep::RetireOld, err))?;
        }

        let outcome = RenewalOutcome::Renewed {
            endpoint_id: endpoint_id.to_string(),
            domain,
            old_certificate_id,
            new_certificate_id: uploaded.id,
            new_certificate_name: name,
        };
        info!("[renew] {outcome}");
        Ok(outcome)
    }

    pub fn renew_domain(&self, domain: &str) -> Result<RenewalOutcome, RenewalError> {
        let progress = Progress::new(domain, &self.interrupt);
        progress.enter(RenewalStep::ResolveEndpoint)?;
        let endpoint_id = self
            .directory
            .find_by_domain(domain)
            .map_err(|err| progress.fail(RenewalStep::ResolveEndpoint, err))?;
        debug!("[renew] {domain} is served by {endpoint_id}");
        self.renew_id(&endpoint_id)
    }

    /// Runs every listed endpoint in listing order. An interrupt always stops
    /// the batch; other failures stop it only under
    /// [`BatchPolicy::HaltOnFailure`].
    pub fn renew_all(&self, policy: BatchPolicy) -> Result<BatchReport, RenewalError> {
        let endpoints = self.directory.list_all().map_err(RenewalError::Listing)?;
        info!("[renew] {} endpoint(s) to check", endpoints.len());

        let mut report = BatchReport::default();
        let mut remaining = endpoints.into_iter().map(|endpoint| endpoint.id);
        for endpoint_id in remaining.by_ref() {
            let result = self.renew_id(&endpoint_id);
            let stop = match &result {
                Ok(_) => false,
                Err(err) if err.is_interrupted() => true,
                Err(err) => {
                    warn!("[renew] {err}");
                    policy == BatchPolicy::HaltOnFailure
                }
            };
            report.entries.push(BatchEntry { endpoint_id, result });
            if stop {
                break;
            }
        }
        report.not_attempted = remaining.collect();
        if !report.not_attempted.is_empty() {
            warn!(
                "[renew] batch stopped early; {} endpoint(s) not attempted",
                report.not_attempted.len()
            );
        }
        Ok(report)
    }
}

fn unmanaged(endpoint_id: &str, reason: &str) -> RenewalOutcome {
    info!("[renew] {endpoint_id}: {reason}, nothing to renew");
    RenewalOutcome::Unmanaged {
        endpoint_id: endpoint_id.to_string(),
        reason: reason.to_string(),
    }
}

struct Progress<'a> {
    endpoint_id: &'a str,
    interrupt: &'a Interrupt,
    leftover: Option<Leftover>,
}

impl<'a> Progress<'a> {
    fn new(endpoint_id: &'a str, interrupt: &'a Interrupt) -> Self {
        Self {
            endpoint_id,
            interrupt,
            leftover: None,
        }
    }

    fn enter(&self, step: RenewalStep) -> Result<(), RenewalError> {
        if self.interrupt.is_set() {
            self.report_leftover();
            return Err(RenewalError::Interrupted {
                endpoint_id: self.endpoint_id.to_string(),
                step,
                leftover: self.leftover.clone(),
            });
        }
        debug!("[renew] {}: {}", self.endpoint_id, step);
        Ok(())
    }

    fn fail(&self, step: RenewalStep, source: impl Into<StepError>) -> RenewalError {
        self.report_leftover();
        RenewalError::StepFailed {
            endpoint_id: self.endpoint_id.to_string(),
            step,
            source: source.into(),
            leftover: self.leftover.clone(),
        }
    }

    fn report_leftover(&self) {
        if let Some(leftover) = &self.leftover {
            warn!("[renew] {}: {}", self.endpoint_id, leftover);
        }
    }
}
