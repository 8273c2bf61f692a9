use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Generates `as_str`, `Display` and `FromStr` for a snake_case vocabulary enum.
macro_rules! vocabulary {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// --- Therapist vocabulary ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    #[default]
    Active,
    Paused,
    Discharged,
}
vocabulary!(PatientStatus { Active => "active", Paused => "paused", Discharged => "discharged" });

/// Clinical intensity scale used for anxiety and depression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
}
vocabulary!(Severity { None => "none", Mild => "mild", Moderate => "moderate", Severe => "severe" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepQuality {
    Good,
    Fair,
    Poor,
    VeryPoor,
}
vocabulary!(SleepQuality { Good => "good", Fair => "fair", Poor => "poor", VeryPoor => "very_poor" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDepth {
    Brief,
    #[default]
    Moderate,
    Detailed,
}
vocabulary!(ResponseDepth { Brief => "brief", Moderate => "moderate", Detailed => "detailed" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    VeryLow,
    Low,
    #[default]
    Neutral,
    Good,
    Great,
}
vocabulary!(Mood { VeryLow => "very_low", Low => "low", Neutral => "neutral", Good => "good", Great => "great" });

// --- Chat / library ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}
vocabulary!(ChatRole { User => "user", Assistant => "assistant" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LibraryTab {
    #[default]
    Favorites,
    History,
}
vocabulary!(LibraryTab { Favorites => "favorites", History => "history" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    System,
    Light,
    Dark,
}
vocabulary!(Theme { System => "system", Light => "light", Dark => "dark" });

// --- Admin ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtlStatus {
    Success,
    Failed,
    Running,
    Pending,
}
vocabulary!(EtlStatus { Success => "success", Failed => "failed", Running => "running", Pending => "pending" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}
vocabulary!(AlertLevel { Info => "info", Warning => "warning", Error => "error", Critical => "critical" });
