//! Non-fatal findings collected while resolving a build.

use serde::Serialize;

/// Whether a compatibility finding blocks resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single compatibility finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Identifier of the rule that produced the finding.
    pub rule: &'static str,
    pub severity: Severity,
    /// Human-readable cause.
    pub cause: String,
    /// Corrected invocation or configuration change.
    pub remediation: String,
}

impl Violation {
    pub fn error(
        rule: &'static str,
        cause: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            cause: cause.into(),
            remediation: remediation.into(),
        }
    }

    pub fn warning(
        rule: &'static str,
        cause: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity: Severity::Warning,
            cause: cause.into(),
            remediation: remediation.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    Compatibility,
    EmulatedPlatform,
    RegistryUnreachable,
    RegistryCheckSkipped,
    DegradedReproducibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

/// Ordered warnings accumulated by one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(kind = ?kind, "{message}");
        self.warnings.push(Warning { kind, message });
    }

    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
