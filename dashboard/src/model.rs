use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Latest soil moisture sample as reported by the remote source.
///
/// `value` is a percentage but is passed through unclamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoistureReading {
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl MoistureReading {
    pub fn level(&self) -> MoistureLevel {
        MoistureLevel::classify(self.value)
    }
}

/// Coarse moisture band used by the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoistureLevel {
    VeryDry,
    Moderate,
    Optimal,
    Wet,
}

impl MoistureLevel {
    pub fn classify(value: f64) -> Self {
        if value < 30.0 {
            Self::VeryDry
        } else if value < 50.0 {
            Self::Moderate
        } else if value < 70.0 {
            Self::Optimal
        } else {
            Self::Wet
        }
    }
}

impl fmt::Display for MoistureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::VeryDry => "Very Dry",
            Self::Moderate => "Moderate",
            Self::Optimal => "Optimal",
            Self::Wet => "Wet",
        };
        f.write_str(label)
    }
}

/// Pump status and override countdown, always taken from one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PumpState {
    pub is_on: bool,
    /// `0` automatic, `-1` indefinite override, `>0` seconds left.
    pub override_remaining: i64,
}

impl PumpState {
    pub fn override_mode(&self) -> OverrideMode {
        OverrideMode::from_remaining(self.override_remaining)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "seconds", rename_all = "snake_case")]
pub enum OverrideMode {
    Automatic,
    Indefinite,
    Remaining(u64),
}

impl OverrideMode {
    pub fn from_remaining(remaining: i64) -> Self {
        match remaining {
            -1 => Self::Indefinite,
            secs if secs > 0 => Self::Remaining(secs as u64),
            _ => Self::Automatic,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Automatic)
    }
}

impl fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Automatic => f.write_str("No override"),
            Self::Indefinite => f.write_str("Indefinite override"),
            Self::Remaining(secs) => {
                let hours = secs / 3600;
                let minutes = (secs % 3600) / 60;
                let seconds = secs % 60;

                if hours > 0 {
                    write!(f, "{}h {}m", hours, minutes)
                } else if minutes > 0 {
                    write!(f, "{}m {}s", minutes, seconds)
                } else {
                    write!(f, "{}s", seconds)
                }
            }
        }
    }
}

/// Operator intent sent to the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    pub desired_status: bool,
    pub override_seconds: Option<i64>,
}

impl CommandRequest {
    pub fn new(desired_status: bool, override_seconds: Option<i64>) -> Self {
        Self {
            desired_status,
            override_seconds,
        }
    }

    /// Override duration to put on the wire; non-positive values defer to
    /// the remote source's default policy.
    pub fn explicit_override(&self) -> Option<i64> {
        self.override_seconds.filter(|secs| *secs > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moisture_levels() {
        assert_eq!(MoistureLevel::classify(12.0), MoistureLevel::VeryDry);
        assert_eq!(MoistureLevel::classify(30.0), MoistureLevel::Moderate);
        assert_eq!(MoistureLevel::classify(49.9), MoistureLevel::Moderate);
        assert_eq!(MoistureLevel::classify(50.0), MoistureLevel::Optimal);
        assert_eq!(MoistureLevel::classify(70.0), MoistureLevel::Wet);
        // Out of range values are not clamped
        assert_eq!(MoistureLevel::classify(130.0), MoistureLevel::Wet);
        assert_eq!(MoistureLevel::classify(-4.0), MoistureLevel::VeryDry);
    }

    #[test]
    fn test_override_mode_from_remaining() {
        assert_eq!(OverrideMode::from_remaining(0), OverrideMode::Automatic);
        assert_eq!(OverrideMode::from_remaining(-1), OverrideMode::Indefinite);
        assert_eq!(OverrideMode::from_remaining(-7), OverrideMode::Automatic);
        assert_eq!(OverrideMode::from_remaining(300), OverrideMode::Remaining(300));
        assert!(!OverrideMode::Automatic.is_active());
        assert!(OverrideMode::Indefinite.is_active());
    }

    #[test]
    fn test_override_mode_display() {
        assert_eq!(OverrideMode::Automatic.to_string(), "No override");
        assert_eq!(OverrideMode::Indefinite.to_string(), "Indefinite override");
        assert_eq!(OverrideMode::Remaining(42).to_string(), "42s");
        assert_eq!(OverrideMode::Remaining(300).to_string(), "5m 0s");
        assert_eq!(OverrideMode::Remaining(3661).to_string(), "1h 1m");
    }

    #[test]
    fn test_explicit_override() {
        assert_eq!(CommandRequest::new(true, None).explicit_override(), None);
        assert_eq!(CommandRequest::new(true, Some(0)).explicit_override(), None);
        assert_eq!(CommandRequest::new(true, Some(-5)).explicit_override(), None);
        assert_eq!(CommandRequest::new(false, Some(60)).explicit_override(), Some(60));
    }
}
