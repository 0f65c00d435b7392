//! Phase names, descriptors, and the standard phase table.
//!
//! A phase is one independently-executable unit of the research pipeline,
//! invoked as `<script> <symbol> --work-dir <path> [flags]` and judged solely
//! by its exit code. The descriptor table is defined once and never mutated
//! at runtime; tests build their own tables to point at fake scripts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ResearchError, Result};

/// Default per-phase wall-clock timeout.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for the deep research phase, which calls slow external AI services.
pub const DEEP_PHASE_TIMEOUT: Duration = Duration::from_secs(1800);

/// The fixed set of research phases, in canonical pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseName {
    /// Price history, indicators, and peer list generation. Always runs first.
    Technical,
    /// Financial statements and peer comparison.
    Fundamental,
    /// Web research via a search API.
    Research,
    /// AI-generated analysis of gathered data.
    Analysis,
    /// SEC filing retrieval and extraction.
    Sec,
    /// Wikipedia company background.
    Wikipedia,
    /// Initial report assembly from upstream outputs.
    Report,
    /// Deep research pass over the initial report.
    Deep,
    /// Final multi-format report conversion.
    Final,
}

impl PhaseName {
    /// All phases in canonical pipeline order.
    pub const ALL: [Self; 9] = [
        Self::Technical,
        Self::Fundamental,
        Self::Research,
        Self::Analysis,
        Self::Sec,
        Self::Wikipedia,
        Self::Report,
        Self::Deep,
        Self::Final,
    ];

    /// Returns the phase name as a lowercase string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
            Self::Research => "research",
            Self::Analysis => "analysis",
            Self::Sec => "sec",
            Self::Wikipedia => "wikipedia",
            Self::Report => "report",
            Self::Deep => "deep",
            Self::Final => "final",
        }
    }

    /// Returns true for the sequential tail phases (report, deep, final),
    /// which run strictly in order after every data phase has finished.
    #[must_use]
    pub const fn is_sequential_tail(self) -> bool {
        matches!(self, Self::Report | Self::Deep | Self::Final)
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseName {
    type Err = ResearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "technical" => Ok(Self::Technical),
            "fundamental" => Ok(Self::Fundamental),
            "research" => Ok(Self::Research),
            "analysis" => Ok(Self::Analysis),
            "sec" => Ok(Self::Sec),
            "wikipedia" => Ok(Self::Wikipedia),
            "report" => Ok(Self::Report),
            "deep" => Ok(Self::Deep),
            "final" => Ok(Self::Final),
            other => Err(ResearchError::InvalidPhase(other.to_string())),
        }
    }
}

/// Static description of one phase: the script that implements it, the
/// credentials it needs, and how long it may run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseDescriptor {
    /// Phase identity.
    pub name: PhaseName,
    /// Script file name, resolved relative to the skills directory.
    pub script: String,
    /// Environment variable names that must be present before this phase runs.
    /// Presence only is checked, never validity.
    pub credentials: Vec<String>,
    /// Wall-clock timeout for the child process.
    pub timeout: Duration,
}

impl PhaseDescriptor {
    /// Creates a descriptor with an explicit timeout.
    #[must_use]
    pub fn new(
        name: PhaseName,
        script: impl Into<String>,
        credentials: &[&str],
        timeout: Duration,
    ) -> Self {
        Self {
            name,
            script: script.into(),
            credentials: credentials.iter().map(|c| (*c).to_string()).collect(),
            timeout,
        }
    }
}

/// Returns the standard phase table in canonical pipeline order.
#[must_use]
pub fn standard_phases() -> Vec<PhaseDescriptor> {
    use PhaseName::*;
    vec![
        PhaseDescriptor::new(
            Technical,
            "research_technical.py",
            &["OPENBB_PAT"],
            DEFAULT_PHASE_TIMEOUT,
        ),
        PhaseDescriptor::new(
            Fundamental,
            "research_fundamental.py",
            &["OPENBB_PAT"],
            DEFAULT_PHASE_TIMEOUT,
        ),
        PhaseDescriptor::new(
            Research,
            "research_perplexity.py",
            &["PERPLEXITY_API_KEY"],
            DEFAULT_PHASE_TIMEOUT,
        ),
        PhaseDescriptor::new(
            Analysis,
            "research_analysis.py",
            &["PERPLEXITY_API_KEY"],
            DEFAULT_PHASE_TIMEOUT,
        ),
        // SEC requires a firm name and contact email for its user agent
        PhaseDescriptor::new(
            Sec,
            "research_sec.py",
            &["SEC_FIRM", "SEC_USER"],
            DEFAULT_PHASE_TIMEOUT,
        ),
        PhaseDescriptor::new(Wikipedia, "research_wikipedia.py", &[], DEFAULT_PHASE_TIMEOUT),
        PhaseDescriptor::new(Report, "research_report.py", &[], DEFAULT_PHASE_TIMEOUT),
        PhaseDescriptor::new(
            Deep,
            "research_deep.py",
            &["ANTHROPIC_API_KEY"],
            DEEP_PHASE_TIMEOUT,
        ),
        PhaseDescriptor::new(Final, "research_final.py", &[], DEFAULT_PHASE_TIMEOUT),
    ]
}

/// Parses a `--phases` argument: `"all"` or a comma-separated phase list.
///
/// Order is preserved; unknown names are rejected.
pub fn parse_phase_list(list: &str) -> Result<Vec<PhaseName>> {
    if list.trim().eq_ignore_ascii_case("all") {
        return Ok(PhaseName::ALL.to_vec());
    }
    list.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}
