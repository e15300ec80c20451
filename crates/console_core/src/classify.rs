//! Maps raw diagnostics from failed retrieval jobs to something a user can act on.
//!
//! Rules are evaluated in declaration order and the first matching pattern wins.
//! Specific signatures (bad credentials, empty periods) sit above generic ones
//! (internal errors) so that a message matching both resolves to the specific one.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The caller's input or credentials are wrong.
    User,
    /// Transient failure; waiting and retrying should help.
    Temporary,
    /// The government portal changed or misbehaved.
    Upstream,
    /// Internal or unclassified fault.
    System,
}

/// Display tone for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Warning,
    Info,
    External,
    Critical,
}

impl ErrorCategory {
    pub fn tone(self) -> Tone {
        match self {
            ErrorCategory::User => Tone::Warning,
            ErrorCategory::Temporary => Tone::Info,
            ErrorCategory::Upstream => Tone::External,
            ErrorCategory::System => Tone::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::User => "user",
            ErrorCategory::Temporary => "temporary",
            ErrorCategory::Upstream => "upstream",
            ErrorCategory::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendlyError {
    pub category: ErrorCategory,
    pub headline: &'static str,
    pub remedy: &'static str,
}

struct Rule {
    patterns: Vec<Regex>,
    error: FriendlyError,
}

const DEFAULT_ERROR: FriendlyError = FriendlyError {
    category: ErrorCategory::System,
    headline: "Unexpected error",
    remedy: "Retry or contact support",
};

// (patterns, category, headline, remedy). Order is significant.
const RULE_TABLE: &[(&[&str], ErrorCategory, &str, &str)] = &[
    (
        &[
            r"invalid credentials",
            r"login failed",
            r"credenciales.*inv[aá]lid",
            r"usuario.*incorrecto",
            r"clave.*incorrecta",
            r"autenticaci[oó]n.*fall",
        ],
        ErrorCategory::User,
        "Invalid portal credentials",
        "Check the user and password registered for the company",
    ),
    (
        &[
            r"no.*data.*found",
            r"0 comprobantes",
            r"sin.*comprobantes",
            r"no se encontr",
            r"empty.*result",
        ],
        ErrorCategory::User,
        "No documents in this period",
        "Check that the period and categories are correct",
    ),
    (
        &[
            r"timeout",
            r"timed?\s*out",
            r"tiempo.*agotado",
            r"no respond",
            r"ETIMEDOUT",
        ],
        ErrorCategory::Temporary,
        "The portal did not respond in time",
        "Try again in a few minutes",
    ),
    (
        &[r"captcha", r"verificaci[oó]n.*humana", r"robot"],
        ErrorCategory::Upstream,
        "The portal requires manual verification",
        "Sign in to the portal manually, then retry",
    ),
    (
        &[
            r"session.*expir",
            r"sesi[oó]n.*expir",
            r"sesi[oó]n.*cerr",
            r"logged.*out",
        ],
        ErrorCategory::Temporary,
        "The portal session expired",
        "Retry the download",
    ),
    (
        &[
            r"connection.*refused",
            r"ECONNREFUSED",
            r"network",
            r"sin.*conexi[oó]n",
            r"ENOTFOUND",
            r"DNS",
        ],
        ErrorCategory::Temporary,
        "Connection error",
        "Check the network connection and retry",
    ),
    (
        &[
            r"element.*not.*found",
            r"selector.*not.*found",
            r"elemento.*no.*encontr",
            r"page.*structure",
            r"iframe",
        ],
        ErrorCategory::Upstream,
        "The portal changed its pages",
        "Contact technical support",
    ),
    (
        &[
            r"browser.*closed",
            r"page.*closed",
            r"context.*closed",
            r"target.*closed",
        ],
        ErrorCategory::Temporary,
        "The retrieval process was interrupted",
        "Retry the download",
    ),
    (
        &[
            r"errno\s*22",
            r"invalid.*argument",
            r"worker.*error",
            r"subprocess",
            r"internal.*error",
        ],
        ErrorCategory::System,
        "Internal system error",
        "If it persists, contact support",
    ),
];

#[allow(clippy::expect_used)] // Static patterns that are guaranteed to be valid
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .map(|(patterns, category, headline, remedy)| Rule {
            patterns: patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .expect("valid classifier pattern")
                })
                .collect(),
            error: FriendlyError {
                category: *category,
                headline,
                remedy,
            },
        })
        .collect()
});

/// Classify a raw diagnostic. Total: absent, empty and unknown input all map to
/// the default `System` classification.
pub fn classify(raw: Option<&str>) -> FriendlyError {
    let Some(raw) = raw.filter(|text| !text.is_empty()) else {
        return DEFAULT_ERROR;
    };

    for rule in RULES.iter() {
        if rule.patterns.iter().any(|pattern| pattern.is_match(raw)) {
            return rule.error.clone();
        }
    }

    DEFAULT_ERROR
}

pub fn default_error() -> FriendlyError {
    DEFAULT_ERROR
}
