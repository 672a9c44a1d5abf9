//! Silence duration tokens.
//!
//! The card dropdown and the default "Silence" button both map to a fixed
//! vocabulary of tokens. [`DurationToken`] is the single table translating a
//! token to an offset, used both for the silence end time and for the expiry
//! shown to the user.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, Result};

/// Offset added to expiry times shown in chat (UTC to WIB).
pub const DISPLAY_OFFSET: Duration = Duration::hours(7);

/// Suffix appended to displayed expiry times.
pub const DISPLAY_ZONE: &str = "WIB";

/// A supported silence duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationToken {
    /// `""` or `"default"`: six hours.
    Default,
    /// `30m`
    ThirtyMinutes,
    /// `1h`
    OneHour,
    /// `3h`
    ThreeHours,
    /// `6h`
    SixHours,
    /// `12h`
    TwelveHours,
    /// `1d`
    OneDay,
    /// `3d`
    ThreeDays,
    /// `1w`
    OneWeek,
    /// `3w`
    ThreeWeeks,
    /// `1M`, thirty days.
    OneMonth,
    /// `1Y`, 365 days.
    OneYear,
}

impl DurationToken {
    /// Tokens offered in the card dropdown, in display order.
    pub const SELECTABLE: [Self; 11] = [
        Self::ThirtyMinutes,
        Self::OneHour,
        Self::ThreeHours,
        Self::SixHours,
        Self::TwelveHours,
        Self::OneDay,
        Self::ThreeDays,
        Self::OneWeek,
        Self::ThreeWeeks,
        Self::OneMonth,
        Self::OneYear,
    ];

    /// Parses a token.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidDuration` for anything outside the vocabulary.
    pub fn parse(token: &str) -> Result<Self> {
        let parsed = match token {
            "" | "default" => Self::Default,
            "30m" => Self::ThirtyMinutes,
            "1h" => Self::OneHour,
            "3h" => Self::ThreeHours,
            "6h" => Self::SixHours,
            "12h" => Self::TwelveHours,
            "1d" => Self::OneDay,
            "3d" => Self::ThreeDays,
            "1w" => Self::OneWeek,
            "3w" => Self::ThreeWeeks,
            "1M" => Self::OneMonth,
            "1Y" => Self::OneYear,
            other => {
                return Err(CoreError::InvalidDuration {
                    token: other.to_string(),
                });
            }
        };
        Ok(parsed)
    }

    /// Returns the wire value of this token.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::ThreeHours => "3h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::OneDay => "1d",
            Self::ThreeDays => "3d",
            Self::OneWeek => "1w",
            Self::ThreeWeeks => "3w",
            Self::OneMonth => "1M",
            Self::OneYear => "1Y",
        }
    }

    /// Returns the human-readable label shown in the dropdown.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Default | Self::SixHours => "6 hours",
            Self::ThirtyMinutes => "30 Minutes",
            Self::OneHour => "1 hour",
            Self::ThreeHours => "3 hours",
            Self::TwelveHours => "12 hours",
            Self::OneDay => "1 day",
            Self::ThreeDays => "3 days",
            Self::OneWeek => "1 week",
            Self::ThreeWeeks => "3 weeks",
            Self::OneMonth => "1 month",
            Self::OneYear => "1 year",
        }
    }

    /// Returns how long a silence with this token lasts.
    #[must_use]
    pub const fn offset(&self) -> Duration {
        match self {
            Self::Default | Self::SixHours => Duration::hours(6),
            Self::ThirtyMinutes => Duration::minutes(30),
            Self::OneHour => Duration::hours(1),
            Self::ThreeHours => Duration::hours(3),
            Self::TwelveHours => Duration::hours(12),
            Self::OneDay => Duration::hours(24),
            Self::ThreeDays => Duration::hours(24 * 3),
            Self::OneWeek => Duration::hours(24 * 7),
            Self::ThreeWeeks => Duration::hours(24 * 7 * 3),
            Self::OneMonth => Duration::hours(24 * 30),
            Self::OneYear => Duration::hours(24 * 365),
        }
    }

    /// Returns `now + offset + extra`.
    ///
    /// Pass `Duration::zero()` for the silence end time and
    /// [`DISPLAY_OFFSET`] for the expiry shown in chat.
    #[must_use]
    pub fn deadline(&self, now: DateTime<Utc>, extra: Duration) -> DateTime<Utc> {
        now + self.offset() + extra
    }

    /// Formats the expiry shown to users for a silence starting at `now`.
    #[must_use]
    pub fn display_expiry(&self, now: DateTime<Utc>) -> String {
        format!(
            "{} {DISPLAY_ZONE}",
            self.deadline(now, DISPLAY_OFFSET).format("%Y-%m-%d %H:%M:%S")
        )
    }
}

impl FromStr for DurationToken {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
