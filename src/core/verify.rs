//! Verification pipeline
//!
//! text → MetricsExtractor → DegeneracyDetector → PhaseClassifier
//! → ThermodynamicKernel → VerificationResult
//!
//! Stateless parts live on `Verifier`; the kernel and the degeneracy window
//! live on `Session`, one per conversation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::core::canon::{AdjacencyValidator, CANON};
use crate::core::degeneracy::DegeneracyDetector;
use crate::core::kernel::ThermodynamicKernel;
use crate::core::metrics::{sequence_to_bytes, MetricsExtractor};
use crate::core::phase::PhaseClassifier;
use crate::core::tokens::parse_tokens;
use crate::types::{
    BatchEntry, BatchReport, CheckReport, CodexError, EventMetrics, GrayEvent, ParsedSequence,
    ThermodynamicState, VerificationResult, VerifyConfig,
};

/// Stateful part of verification: kernel plus degeneracy window
#[derive(Debug, Clone)]
pub struct Session {
    kernel: ThermodynamicKernel,
    detector: DegeneracyDetector,
    created_at: DateTime<Utc>,
    verifications: usize,
}

impl Session {
    pub fn new(config: &VerifyConfig) -> Self {
        Self {
            kernel: ThermodynamicKernel::new(config.kernel),
            detector: DegeneracyDetector::new(config.degeneracy),
            created_at: Utc::now(),
            verifications: 0,
        }
    }

    pub fn kernel(&self) -> &ThermodynamicKernel {
        &self.kernel
    }

    pub fn state(&self) -> &ThermodynamicState {
        self.kernel.state()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn verifications(&self) -> usize {
        self.verifications
    }

    pub fn reset(&mut self) {
        self.kernel.reset();
        self.detector.reset();
        self.verifications = 0;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&VerifyConfig::default())
    }
}

/// Verification entry point
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    config: VerifyConfig,
    extractor: MetricsExtractor,
    classifier: PhaseClassifier,
    validator: AdjacencyValidator<'static>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(VerifyConfig::default())
    }
}

impl Verifier {
    pub fn new(config: VerifyConfig) -> Self {
        Self {
            config,
            extractor: MetricsExtractor::new(),
            classifier: PhaseClassifier::new(),
            validator: AdjacencyValidator::new(&CANON),
        }
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Fresh session using this verifier's kernel and detector settings
    pub fn new_session(&self) -> Session {
        Session::new(&self.config)
    }

    /// Verify one text in a fresh session
    pub fn verify(&self, text: &str) -> VerificationResult {
        self.verify_in(&mut self.new_session(), text)
    }

    /// Verify raw bytes in a fresh session; non-UTF-8 input is rejected
    pub fn verify_bytes(&self, bytes: &[u8]) -> Result<VerificationResult, CodexError> {
        self.verify_bytes_in(&mut self.new_session(), bytes)
    }

    pub fn verify_bytes_in(
        &self,
        session: &mut Session,
        bytes: &[u8],
    ) -> Result<VerificationResult, CodexError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(self.verify_in(session, text))
    }

    /// Verify one text, advancing the session's kernel
    pub fn verify_in(&self, session: &mut Session, text: &str) -> VerificationResult {
        let bytes = text.as_bytes();
        let metrics = self.extractor.measure(bytes);

        let mut gray_events = Vec::new();
        if let Some(event) = session.detector.observe(bytes, &metrics) {
            gray_events.push(event);
        }

        let phase = self.classifier.classify_metrics(&metrics);
        let step = session
            .kernel
            .advance(metrics.entropy_bits, metrics.compression_ratio);
        gray_events.extend(step.gray_events);
        session.verifications += 1;

        let threshold = self.config.threshold;
        let verified = phase.rank() <= threshold.rank() && !gray_events.iter().any(GrayEvent::is_error);

        debug!(
            phase = %phase.phase,
            rank = phase.rank(),
            threshold = %threshold,
            verified,
            events = gray_events.len(),
            "text verified"
        );

        VerificationResult {
            verified,
            detected_phase: phase.phase,
            phase_rank: phase.rank(),
            confidence: phase.confidence,
            metrics: self.extractor.summarize(text, &metrics),
            thermodynamic_state: step.state,
            dominant_operator: step.dominant_operator,
            regime: step.regime,
            lawfulness: step.lawfulness,
            gray_events,
            threshold_phase: threshold,
            fingerprint: fingerprint(bytes),
            timestamp: Utc::now(),
        }
    }

    /// Verify independent texts in parallel, each in its own session
    ///
    /// A failing entry never aborts the batch.
    pub fn batch<T: AsRef<[u8]> + Sync>(&self, texts: &[T]) -> BatchReport {
        if texts.is_empty() {
            return aggregate(Vec::new());
        }
        let workers = std::thread::available_parallelism()
            .map_or(1, |n| n.get())
            .min(texts.len());
        let chunk = texts.len().div_ceil(workers);

        let entries: Vec<BatchEntry> = std::thread::scope(|scope| {
            let handles: Vec<_> = texts
                .chunks(chunk)
                .enumerate()
                .map(|(c, slice)| {
                    scope.spawn(move || {
                        slice
                            .iter()
                            .enumerate()
                            .map(|(i, text)| {
                                self.entry(c * chunk + i, &mut self.new_session(), text.as_ref())
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(entries) => entries,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let report = aggregate(entries);
        info!(total = report.total, verified = report.verified, failed = report.failed, "batch complete");
        report
    }

    /// Verify texts in order through one shared session
    pub fn batch_in_session<T: AsRef<[u8]>>(&self, session: &mut Session, texts: &[T]) -> BatchReport {
        let entries = texts
            .iter()
            .enumerate()
            .map(|(i, text)| self.entry(i, session, text.as_ref()))
            .collect();
        aggregate(entries)
    }

    fn entry(&self, index: usize, session: &mut Session, bytes: &[u8]) -> BatchEntry {
        match self.verify_bytes_in(session, bytes) {
            Ok(result) => BatchEntry { index, result: Some(result), error: None },
            Err(e) => BatchEntry { index, result: None, error: Some(e.to_string()) },
        }
    }

    /// Adjacency check plus step trace and window degeneracy of a parsed sequence
    pub fn check_sequence(&self, parsed: &ParsedSequence) -> CheckReport {
        let (_, mut gray_events) = self.validator.validate_items(&parsed.items);
        let known = parsed.known_indices();

        let trace = self.validator.trace(&known);
        let degeneracy = if known.is_empty() {
            None
        } else {
            let detector = DegeneracyDetector::new(self.config.degeneracy);
            let report = detector.inspect(&sequence_to_bytes(&known));
            if report.is_degenerate {
                gray_events.push(GrayEvent::degeneracy_detected(
                    report.plateau_start.unwrap_or(0),
                    EventMetrics {
                        entropy_bits: Some(report.entropy_bits),
                        compression_ratio: Some(report.compression_ratio),
                        ncd: report.min_ncd(),
                        ..EventMetrics::default()
                    },
                ));
            }
            Some(report)
        };

        let is_valid = !gray_events.iter().any(GrayEvent::is_error);
        CheckReport {
            is_valid,
            sequence_length: parsed.len(),
            gray_events,
            trace: Some(trace),
            degeneracy,
        }
    }

    /// Parse sequence content (JSON, symbols or names) and check it
    pub fn check_content(&self, content: &str) -> Result<CheckReport, CodexError> {
        let parsed = parse_tokens(content, &CANON)?;
        Ok(self.check_sequence(&parsed))
    }
}

/// SHA-256 of the input, lowercase hex
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let hash: [u8; 32] = hasher.finalize().into();
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

fn aggregate(entries: Vec<BatchEntry>) -> BatchReport {
    let results: Vec<&VerificationResult> = entries.iter().filter_map(|e| e.result.as_ref()).collect();
    let verified = results.iter().filter(|r| r.verified).count();

    let mut phase_histogram = BTreeMap::new();
    for r in &results {
        *phase_histogram.entry(r.detected_phase.name().to_string()).or_insert(0) += 1;
    }

    let n = results.len().max(1) as f64;
    let mean_entropy_bits = results.iter().map(|r| r.metrics.entropy_bits).sum::<f64>() / n;
    let mean_compression_ratio = results.iter().map(|r| r.metrics.compression_ratio).sum::<f64>() / n;

    BatchReport {
        total: entries.len(),
        verified,
        failed: entries.len() - verified,
        mean_entropy_bits,
        mean_compression_ratio,
        phase_histogram,
        entries,
    }
}

// =============================================================================
// TESTS
// =============================================================================
