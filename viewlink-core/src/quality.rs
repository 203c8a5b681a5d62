//! Quality profiles and the controller that negotiates them.
//!
//! A quality level is a name for a fixed bundle of parameters the
//! producer honors: resolution cap, target frame rate, and compression
//! strength. Exactly one profile is active at a time; unknown names
//! fail loudly instead of silently defaulting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::message::ControlMessage;

// ── QualityProfile ───────────────────────────────────────────────

/// Negotiated streaming parameters for one quality level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    /// Resolution cap, width.
    pub max_width: u32,
    /// Resolution cap, height.
    pub max_height: u32,
    /// Requested frames per second.
    pub target_fps: u32,
    /// zstd compression level (0..=22, higher = smaller and slower).
    pub compression_level: u32,
}

// ── QualityLevel ─────────────────────────────────────────────────

/// The fixed set of named quality levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityLevel {
    #[default]
    High,
    Medium,
    Low,
}

impl QualityLevel {
    /// The fixed parameters this level maps to.
    pub const fn profile(self) -> QualityProfile {
        match self {
            QualityLevel::High => QualityProfile {
                max_width: 1920,
                max_height: 1080,
                target_fps: 60,
                compression_level: 3,
            },
            QualityLevel::Medium => QualityProfile {
                max_width: 1280,
                max_height: 720,
                target_fps: 30,
                compression_level: 8,
            },
            QualityLevel::Low => QualityProfile {
                max_width: 854,
                max_height: 480,
                target_fps: 15,
                compression_level: 15,
            },
        }
    }
}

impl FromStr for QualityLevel {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(QualityLevel::High),
            "medium" => Ok(QualityLevel::Medium),
            "low" => Ok(QualityLevel::Low),
            other => Err(ViewError::Config(other.to_string())),
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityLevel::High => write!(f, "high"),
            QualityLevel::Medium => write!(f, "medium"),
            QualityLevel::Low => write!(f, "low"),
        }
    }
}

// ── QualityController ────────────────────────────────────────────

/// Tracks the active quality level and builds the control message
/// that announces it to the producer.
#[derive(Debug, Clone, Default)]
pub struct QualityController {
    active: QualityLevel,
}

impl QualityController {
    pub fn new(initial: QualityLevel) -> Self {
        Self { active: initial }
    }

    /// Switch to the named level.
    ///
    /// Unknown names return [`ViewError::Config`] and leave the active
    /// profile untouched.
    pub fn set_quality(&mut self, name: &str) -> Result<QualityProfile, ViewError> {
        let level = name.parse::<QualityLevel>()?;
        self.active = level;
        Ok(level.profile())
    }

    /// Switch to an already-validated level.
    pub fn set_level(&mut self, level: QualityLevel) {
        self.active = level;
    }

    pub fn active_level(&self) -> QualityLevel {
        self.active
    }

    pub fn active_profile(&self) -> QualityProfile {
        self.active.profile()
    }

    /// The control message announcing the active profile.
    pub fn control_message(&self) -> ControlMessage {
        ControlMessage::Quality {
            config: self.active.profile(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_levels_parse() {
        assert_eq!("high".parse::<QualityLevel>().unwrap(), QualityLevel::High);
        assert_eq!(
            "medium".parse::<QualityLevel>().unwrap(),
            QualityLevel::Medium
        );
        assert_eq!("low".parse::<QualityLevel>().unwrap(), QualityLevel::Low);
    }

    #[test]
    fn unknown_level_is_config_error() {
        let err = "ultra".parse::<QualityLevel>().unwrap_err();
        assert!(matches!(err, ViewError::Config(name) if name == "ultra"));
    }

    #[test]
    fn set_quality_failure_keeps_active_profile() {
        let mut controller = QualityController::new(QualityLevel::Medium);
        assert!(controller.set_quality("ultra").is_err());
        assert_eq!(controller.active_level(), QualityLevel::Medium);
    }

    #[test]
    fn set_quality_switches_profile() {
        let mut controller = QualityController::default();
        let profile = controller.set_quality("low").unwrap();
        assert_eq!(profile.target_fps, 15);
        assert_eq!(controller.active_level(), QualityLevel::Low);
    }

    #[test]
    fn compression_levels_within_zstd_range() {
        for level in [QualityLevel::High, QualityLevel::Medium, QualityLevel::Low] {
            assert!(level.profile().compression_level <= 22);
        }
    }

    #[test]
    fn control_message_carries_active_profile() {
        let controller = QualityController::new(QualityLevel::Low);
        match controller.control_message() {
            ControlMessage::Quality { config } => {
                assert_eq!(config, QualityLevel::Low.profile());
            }
            other => panic!("expected quality message, got {other:?}"),
        }
    }
}
