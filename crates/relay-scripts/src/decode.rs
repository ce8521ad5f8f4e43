//! Decoding of the one-line status protocol printed by the scripts.
//!
//! Messaging scripts print a `", "`-joined list of integer status codes.
//! Setup and ContactSync print a single bare integer.

use relay_core::types::StatusCode;
use serde::Serialize;

use crate::error::ActionError;

const SEPARATOR: &str = ", ";

// ─── ExecutionResult ──────────────────────────────────────────────────────

/// Decoded outcome of one messaging action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionResult {
    Single(StatusCode),
    /// Several codes, in the order the script printed them.
    Multiple(Vec<StatusCode>),
    /// The line held only separators.
    NoResult,
}

impl ExecutionResult {
    pub fn codes(&self) -> &[StatusCode] {
        match self {
            ExecutionResult::Single(code) => std::slice::from_ref(code),
            ExecutionResult::Multiple(codes) => codes,
            ExecutionResult::NoResult => &[],
        }
    }

    pub fn contains(&self, status: StatusCode) -> bool {
        self.codes().contains(&status)
    }

    /// True when at least one code was returned and every code is
    /// `ActionPerformed`.
    pub fn is_success(&self) -> bool {
        let codes = self.codes();
        !codes.is_empty() && codes.iter().all(|c| *c == StatusCode::ActionPerformed)
    }

    pub fn is_unknown_error(&self) -> bool {
        matches!(self, ExecutionResult::Single(StatusCode::UnknownError))
    }
}

// ─── UtilityOutcome ───────────────────────────────────────────────────────

/// Outcome of the Setup and ContactSync scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityOutcome {
    Performed,
    VersionMismatch,
    /// Any other code; `-1` when the script printed nothing.
    Failed(i64),
}

impl UtilityOutcome {
    pub fn is_success(self) -> bool {
        self == UtilityOutcome::Performed
    }
}

impl From<UtilityOutcome> for ExecutionResult {
    fn from(outcome: UtilityOutcome) -> Self {
        let status = match outcome {
            UtilityOutcome::Performed => StatusCode::ActionPerformed,
            UtilityOutcome::VersionMismatch => StatusCode::VersionMismatch,
            UtilityOutcome::Failed(code) => {
                StatusCode::from_code(code).unwrap_or(StatusCode::UnknownError)
            }
        };
        ExecutionResult::Single(status)
    }
}

// ─── Decoders ─────────────────────────────────────────────────────────────

/// Decode the final line of a messaging script.
///
/// An absent or blank line is `Single(UnknownError)`. A line that holds
/// nothing but separators is `NoResult`. Every remaining token must be an
/// integer with a known [`StatusCode`].
pub fn decode(line: Option<&str>) -> Result<ExecutionResult, ActionError> {
    let line = match line {
        Some(l) if !l.trim().is_empty() => l.trim_end_matches(['\r', '\n']),
        _ => return Ok(ExecutionResult::Single(StatusCode::UnknownError)),
    };

    let mut tokens: Vec<&str> = line.split(SEPARATOR).collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    let mut codes = tokens
        .into_iter()
        .map(parse_status)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(match codes.len() {
        0 => ExecutionResult::NoResult,
        1 => ExecutionResult::Single(codes.remove(0)),
        _ => ExecutionResult::Multiple(codes),
    })
}

/// Decode the final line of the Setup or ContactSync script.
pub fn decode_bare(line: Option<&str>) -> Result<UtilityOutcome, ActionError> {
    let Some(line) = line.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(UtilityOutcome::Failed(-1));
    };
    let code: i64 = line
        .parse()
        .map_err(|_| ActionError::InvalidStatusCode(line.to_string()))?;

    Ok(match StatusCode::from_code(code) {
        Some(StatusCode::ActionPerformed) => UtilityOutcome::Performed,
        Some(StatusCode::VersionMismatch) => UtilityOutcome::VersionMismatch,
        _ => UtilityOutcome::Failed(code),
    })
}

fn parse_status(token: &str) -> Result<StatusCode, ActionError> {
    token
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(StatusCode::from_code)
        .ok_or_else(|| ActionError::InvalidStatusCode(token.to_string()))
}

// ─── Tests ────────────────────────────────────────────────────────────────
