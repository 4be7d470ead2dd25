//! Gray events: structured records of canon-law and degeneracy violations
//!
//! Kind codes follow the reason-code idiom: `code()` for logs and wire,
//! `description()` for humans.

use serde::{Deserialize, Serialize};

/// Kind of a Gray event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrayKind {
    /// Transition delta not in the valid set
    AdjacencyViolation,
    /// Low entropy, high reduction and repeating windows at once
    DegeneracyDetected,
    /// Token outside the canon table
    UnknownToken,
    /// Kernel step that added no entropy and no potential
    CostlessOperation,
    /// RETURN selected on consecutive kernel steps without action
    InfiniteMirroring,
}

impl GrayKind {
    /// Wire code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AdjacencyViolation => "adjacency_violation",
            Self::DegeneracyDetected => "degeneracy_detected",
            Self::UnknownToken => "unknown_token",
            Self::CostlessOperation => "costless_operation",
            Self::InfiniteMirroring => "infinite_mirroring",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AdjacencyViolation => "Illegal jump on the canon cycle",
            Self::DegeneracyDetected => "Mimic loop or degenerate content",
            Self::UnknownToken => "Token not in the canonical sequence",
            Self::CostlessOperation => "Operation without entropy cost",
            Self::InfiniteMirroring => "Mirror without return to action",
        }
    }

    /// Severity is fixed per kind
    pub fn severity(&self) -> Severity {
        match self {
            Self::AdjacencyViolation | Self::UnknownToken => Severity::Error,
            Self::DegeneracyDetected | Self::CostlessOperation | Self::InfiniteMirroring => {
                Severity::Warning
            }
        }
    }
}

impl std::fmt::Display for GrayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// Measurements attached to degeneracy and kernel events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entropy_bits: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<f64>,
    /// Lowest window NCD inside the detected plateau
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ncd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accumulated_potential: Option<f64>,
    /// Consecutive RETURN selections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
}

/// A Gray event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrayEvent {
    #[serde(rename = "type")]
    pub kind: GrayKind,
    /// Sequence position, byte offset or kernel step, depending on kind
    #[serde(rename = "index", skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<u8>,
    pub reason: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EventMetrics>,
}

impl GrayEvent {
    fn bare(kind: GrayKind, position: Option<usize>, reason: String) -> Self {
        Self {
            kind,
            position,
            from: None,
            to: None,
            delta: None,
            reason,
            severity: kind.severity(),
            metrics: None,
        }
    }

    /// Illegal transition `from → to` at pair position `position`
    pub fn adjacency_violation(
        position: usize,
        from: u8,
        to: u8,
        delta: u8,
        valid_deltas: [u8; 2],
    ) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            delta: Some(delta),
            ..Self::bare(
                GrayKind::AdjacencyViolation,
                Some(position),
                format!("Illegal jump: delta {} not in {:?}", delta, valid_deltas),
            )
        }
    }

    pub fn unknown_token(position: usize, token: &str) -> Self {
        Self::bare(
            GrayKind::UnknownToken,
            Some(position),
            format!("Encountered unknown token '{}' not in canonical sequence", token),
        )
    }

    pub fn degeneracy_detected(position: usize, metrics: EventMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::bare(
                GrayKind::DegeneracyDetected,
                Some(position),
                "Compression/entropy indicates mimic loop or degeneracy".to_string(),
            )
        }
    }

    pub fn costless_operation(step: usize, metrics: EventMetrics) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::bare(
                GrayKind::CostlessOperation,
                Some(step),
                "Kernel step added no entropy and no potential".to_string(),
            )
        }
    }

    pub fn infinite_mirroring(step: usize, streak: u32) -> Self {
        Self {
            metrics: Some(EventMetrics {
                streak: Some(streak),
                ..EventMetrics::default()
            }),
            ..Self::bare(
                GrayKind::InfiniteMirroring,
                Some(step),
                format!("RETURN dominated {} consecutive steps without action", streak),
            )
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for GrayEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(p) => write!(f, "[{}] {} at {}: {}", self.severity, self.kind.code(), p, self.reason),
            None => write!(f, "[{}] {}: {}", self.severity, self.kind.code(), self.reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_only_on_adjacency_violation() {
        let adj = GrayEvent::adjacency_violation(0, 0, 2, 2, [1, 6]);
        assert_eq!(adj.delta, Some(2));

        let unknown = GrayEvent::unknown_token(3, "Gray");
        assert!(unknown.delta.is_none());
        assert!(unknown.from.is_none());

        let degenerate = GrayEvent::degeneracy_detected(0, EventMetrics::default());
        assert!(degenerate.delta.is_none());
    }

    #[test]
    fn test_severity_by_kind() {
        assert_eq!(GrayKind::AdjacencyViolation.severity(), Severity::Error);
        assert_eq!(GrayKind::UnknownToken.severity(), Severity::Error);
        assert_eq!(GrayKind::DegeneracyDetected.severity(), Severity::Warning);
        assert_eq!(GrayKind::CostlessOperation.severity(), Severity::Warning);
        assert_eq!(GrayKind::InfiniteMirroring.severity(), Severity::Warning);
    }

    #[test]
    fn test_wire_format() {
        let event = GrayEvent::adjacency_violation(4, 1, 5, 4, [1, 6]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "adjacency_violation");
        assert_eq!(json["index"], 4);
        assert_eq!(json["from"], 1);
        assert_eq!(json["to"], 5);
        assert_eq!(json["delta"], 4);
        assert_eq!(json["severity"], "ERROR");
        assert!(json.get("metrics").is_none());
    }

    #[test]
    fn test_warning_wire_format() {
        let event = GrayEvent::infinite_mirroring(2, 3);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["severity"], "WARNING");
        assert_eq!(json["metrics"]["streak"], 3);
        assert!(json.get("delta").is_none());
    }
}
