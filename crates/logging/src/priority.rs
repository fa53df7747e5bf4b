//! crates/logging/src/priority.rs
//! Priority masks and severity levels for log scopes.
//!
//! A [`Priority`] combines two unrelated concerns in one word: the `SCOPE` bit
//! enables enter/exit tracing, while the remaining bits select a severity
//! threshold. The two are queried differently, through
//! [`Priority::has_flag`] and [`Priority::meets_severity`].

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};
use std::str::FromStr;

use thiserror::Error;

/// Severity of a text log record, ordered from least to most verbose.
///
/// Each severity owns one bit of a [`Priority`]. More verbose levels use
/// larger bits so that enabling a level implicitly admits every less verbose
/// one.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
#[repr(u32)]
pub enum Severity {
    /// Unrecoverable condition.
    Fatal = 1 << 1,
    /// Recoverable error.
    Error = 1 << 2,
    /// Unexpected but tolerated condition.
    Warning = 1 << 3,
    /// Informational message.
    Info = 1 << 4,
    /// Developer diagnostics.
    Debug = 1 << 5,
}

impl Severity {
    /// Every severity, least verbose first.
    pub const ALL: [Self; 5] = [
        Self::Fatal,
        Self::Error,
        Self::Warning,
        Self::Info,
        Self::Debug,
    ];

    /// Returns the priority bit owned by this severity.
    #[must_use]
    #[inline]
    pub const fn as_priority(self) -> Priority {
        Priority::from_bits(self as u32)
    }

    /// Returns the lower-case mnemonic used in configuration documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// Maps a single priority bit back to its severity.
    #[must_use]
    pub const fn from_priority(priority: Priority) -> Option<Self> {
        match priority.bits() {
            0b00_0010 => Some(Self::Fatal),
            0b00_0100 => Some(Self::Error),
            0b00_1000 => Some(Self::Warning),
            0b01_0000 => Some(Self::Info),
            0b10_0000 => Some(Self::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitmask describing which records a scope currently admits.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct Priority {
    bits: u32,
}

impl Priority {
    /// Scope disabled; nothing is recorded.
    pub const UNSET: Self = Self::from_bits(0);
    /// Enter/exit tracing of scope sessions.
    pub const SCOPE: Self = Self::from_bits(1 << 0);
    /// Admit fatal records.
    pub const FATAL: Self = Severity::Fatal.as_priority();
    /// Admit error records and above.
    pub const ERROR: Self = Severity::Error.as_priority();
    /// Admit warning records and above.
    pub const WARNING: Self = Severity::Warning.as_priority();
    /// Admit info records and above.
    pub const INFO: Self = Severity::Info.as_priority();
    /// Admit every severity.
    pub const DEBUG: Self = Severity::Debug.as_priority();

    /// Bits that participate in the severity threshold.
    pub const SEVERITY_MASK: u32 = 0b11_1110;

    /// Every bit defined by this crate.
    pub const ALL: Self = Self::from_bits(Self::SEVERITY_MASK | Self::SCOPE.bits);

    /// Builds a mask from raw bits without validation.
    #[must_use]
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Builds a mask from raw bits, discarding bits this crate does not define.
    #[must_use]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self::from_bits(bits & Self::ALL.bits)
    }

    /// Returns the raw bit representation.
    #[must_use]
    #[inline]
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Reports whether no bit is set.
    #[must_use]
    #[inline]
    pub const fn is_unset(self) -> bool {
        self.bits == 0
    }

    /// Exact bit test, used for the independent `SCOPE` flag.
    #[must_use]
    #[inline]
    pub const fn has_flag(self, flag: Self) -> bool {
        flag.bits != 0 && self.bits & flag.bits == flag.bits
    }

    /// Threshold test: the severity bits of `self` are at least `severity`.
    ///
    /// `DEBUG` therefore admits every severity while `ERROR` admits `Error`
    /// and `Fatal` only. The `SCOPE` bit never participates.
    #[must_use]
    #[inline]
    pub const fn meets_severity(self, severity: Severity) -> bool {
        (self.bits & Self::SEVERITY_MASK) >= severity as u32
    }

    /// Returns a copy with the bits of `other` added.
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self::from_bits(self.bits | other.bits)
    }

    /// Returns a copy with the bits of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self::from_bits(self.bits & !other.bits)
    }

    /// Returns the most verbose severity admitted by this mask, if any.
    #[must_use]
    pub fn most_verbose(self) -> Option<Severity> {
        Severity::ALL
            .into_iter()
            .rev()
            .find(|severity| self.meets_severity(*severity))
    }

    fn flag_names(self) -> impl Iterator<Item = &'static str> {
        const NAMED: [(Priority, &str); 6] = [
            (Priority::SCOPE, "scope"),
            (Priority::DEBUG, "debug"),
            (Priority::INFO, "info"),
            (Priority::WARNING, "warning"),
            (Priority::ERROR, "error"),
            (Priority::FATAL, "fatal"),
        ];
        NAMED
            .into_iter()
            .filter(move |(flag, _)| self.has_flag(*flag))
            .map(|(_, name)| name)
    }
}

impl fmt::Debug for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Priority({self} = {:#08b})", self.bits)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            return f.write_str("unset");
        }
        let mut first = true;
        for name in self.flag_names() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(name)?;
            first = false;
        }
        let unknown = self.bits & !Self::ALL.bits;
        if unknown != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{unknown:#x}")?;
        }
        Ok(())
    }
}

/// Error returned when parsing a priority expression fails.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unknown priority flag \"{token}\"")]
pub struct ParsePriorityError {
    token: String,
}

impl ParsePriorityError {
    /// Returns the token that failed to parse.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    /// Parses flag names separated by `|`, `,` or whitespace.
    ///
    /// Empty input and the word `unset` both yield [`Priority::UNSET`].
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut priority = Self::UNSET;
        for token in input
            .split(|c: char| c == '|' || c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
        {
            let flag = match token.to_ascii_lowercase().as_str() {
                "unset" | "none" => Self::UNSET,
                "scope" => Self::SCOPE,
                "debug" => Self::DEBUG,
                "info" => Self::INFO,
                "warning" | "warn" => Self::WARNING,
                "error" => Self::ERROR,
                "fatal" => Self::FATAL,
                "all" => Self::ALL,
                _ => {
                    return Err(ParsePriorityError {
                        token: token.to_owned(),
                    });
                }
            };
            priority |= flag;
        }
        Ok(priority)
    }
}

impl BitOr for Priority {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.with(rhs)
    }
}

impl BitOrAssign for Priority {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl BitAnd for Priority {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.bits & rhs.bits)
    }
}

impl BitAndAssign for Priority {
    fn bitand_assign(&mut self, rhs: Self) {
        self.bits &= rhs.bits;
    }
}

impl Not for Priority {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::from_bits(!self.bits & Self::ALL.bits)
    }
}

impl From<Severity> for Priority {
    fn from(severity: Severity) -> Self {
        severity.as_priority()
    }
}
