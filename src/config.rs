//! Application-level configuration loading: unlock date, board prompts, reward catalog and
//! palette persistence settings.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::datetime};
use tracing::{info, warn};

use crate::state::{
    board::CELL_COUNT,
    rewards::{Reward, RewardCatalog},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCRAPBOOK_CONFIG_PATH";
const DEFAULT_UNLOCK_AT: OffsetDateTime = datetime!(2026-02-14 00:00:00 +07:00);
const DEFAULT_GATE_MESSAGE: &str = "The Exhibition opens in…";
const DEFAULT_MAX_EDGE: u32 = 300;
const DEFAULT_QUALITY: f32 = 0.7;
const DEFAULT_PALETTE_PATH: &str = "data/palette.json";
const DEFAULT_PALETTE_QUOTA: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
/// Lock screen settings.
pub struct GateConfig {
    /// When set, gated routes answer `423 Locked` before the unlock instant.
    pub enforce: bool,
    /// Teaser shown above the countdown.
    pub message: String,
    /// Rotating replies to a knock on the lock screen.
    pub knock_messages: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
/// Downscaler settings applied to every stored photo.
pub struct ImageConfig {
    /// Longest side of a stored photo, in pixels.
    pub max_edge: u32,
    /// JPEG quality in `[0, 1]`.
    pub quality: f32,
}

#[derive(Debug, Clone)]
/// Where the palette is persisted; `path: None` keeps it in memory only.
pub struct PaletteConfig {
    /// Preference file holding the swatches.
    pub path: Option<PathBuf>,
    /// Largest serialized palette accepted by the preference store.
    pub quota_bytes: usize,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    unlock_at: OffsetDateTime,
    gate: GateConfig,
    image: ImageConfig,
    labels: Vec<String>,
    rewards: RewardCatalog,
    palette: PaletteConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        milestones = app_config.rewards.milestones().len(),
                        "loaded scrapbook config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Instant the scrapbook opens.
    pub fn unlock_at(&self) -> OffsetDateTime {
        self.unlock_at
    }

    /// Countdown gate behavior.
    pub fn gate(&self) -> &GateConfig {
        &self.gate
    }

    /// Photo downscaler settings.
    pub fn image(&self) -> ImageConfig {
        self.image
    }

    /// Prompt for each of the nine board cells, in grid order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Milestone rewards and the grand prize.
    pub fn rewards(&self) -> &RewardCatalog {
        &self.rewards
    }

    /// Palette persistence settings.
    pub fn palette(&self) -> &PaletteConfig {
        &self.palette
    }

    /// Copy of this configuration with the gate switched on or off.
    pub fn with_gate_enforced(mut self, enforce: bool) -> Self {
        self.gate.enforce = enforce;
        self
    }

    /// Copy of this configuration with a different unlock instant.
    pub fn with_unlock_at(mut self, unlock_at: OffsetDateTime) -> Self {
        self.unlock_at = unlock_at;
        self
    }

    /// Copy of this configuration keeping the palette in memory only.
    pub fn without_palette_file(mut self) -> Self {
        self.palette.path = None;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            unlock_at: DEFAULT_UNLOCK_AT,
            gate: GateConfig {
                enforce: false,
                message: DEFAULT_GATE_MESSAGE.to_owned(),
                knock_messages: default_knock_messages(),
            },
            image: ImageConfig {
                max_edge: DEFAULT_MAX_EDGE,
                quality: DEFAULT_QUALITY,
            },
            labels: default_labels(),
            rewards: RewardCatalog::default(),
            palette: PaletteConfig {
                path: Some(PathBuf::from(DEFAULT_PALETTE_PATH)),
                quota_bytes: DEFAULT_PALETTE_QUOTA,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every section is optional; missing pieces keep their defaults.
struct RawConfig {
    unlock_at: Option<String>,
    #[serde(default)]
    gate: RawGate,
    #[serde(default)]
    image: RawImage,
    #[serde(default)]
    board: RawBoard,
    #[serde(default)]
    rewards: RawRewards,
    palette: Option<RawPalette>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGate {
    enforce: Option<bool>,
    message: Option<String>,
    knock_messages: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawImage {
    max_edge: Option<u32>,
    quality: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBoard {
    labels: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRewards {
    milestones: Option<Vec<Reward>>,
    grand_prize: Option<Reward>,
}

#[derive(Debug, Deserialize)]
struct RawPalette {
    /// `null` disables the preference file.
    #[serde(default = "default_palette_path")]
    path: Option<PathBuf>,
    quota_bytes: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let unlock_at = match raw.unlock_at {
            Some(text) => OffsetDateTime::parse(&text, &Rfc3339).unwrap_or_else(|err| {
                warn!(value = %text, error = %err, "invalid unlock_at; using default");
                defaults.unlock_at
            }),
            None => defaults.unlock_at,
        };

        let labels = match raw.board.labels {
            Some(labels) if labels.len() == CELL_COUNT => labels,
            Some(labels) => {
                warn!(
                    count = labels.len(),
                    expected = CELL_COUNT,
                    "board labels must list every cell; using defaults"
                );
                defaults.labels
            }
            None => defaults.labels,
        };

        let knock_messages = raw
            .gate
            .knock_messages
            .filter(|messages| !messages.is_empty())
            .unwrap_or(defaults.gate.knock_messages);

        let rewards = RewardCatalog::new(
            raw.rewards
                .milestones
                .unwrap_or_else(|| defaults.rewards.milestones().to_vec()),
            raw.rewards
                .grand_prize
                .unwrap_or_else(|| defaults.rewards.grand_prize().clone()),
        );

        let palette = match raw.palette {
            Some(palette) => PaletteConfig {
                path: palette.path,
                quota_bytes: palette.quota_bytes.unwrap_or(defaults.palette.quota_bytes),
            },
            None => defaults.palette,
        };

        Self {
            unlock_at,
            gate: GateConfig {
                enforce: raw.gate.enforce.unwrap_or(defaults.gate.enforce),
                message: raw.gate.message.unwrap_or(defaults.gate.message),
                knock_messages,
            },
            image: ImageConfig {
                max_edge: raw.image.max_edge.unwrap_or(defaults.image.max_edge),
                quality: raw
                    .image
                    .quality
                    .map(|q| q.clamp(0.0, 1.0))
                    .unwrap_or(defaults.image.quality),
            },
            labels,
            rewards,
            palette,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_palette_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_PALETTE_PATH))
}

fn default_labels() -> Vec<String> {
    [
        "Most Useless Item",
        "Best Zoning-Out Spot",
        "Round Mirror Selfie",
        "Your Favorite Color",
        "Shark / Dino Plushie",
        "Future Home Showroom",
        "Aesthetic Night Lamp",
        "Plastic Plant",
        "Meatballs / Ice Cream",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_knock_messages() -> Vec<String> {
    [
        "Patience, still setting things up… 🔨",
        "Not open yet, stop peeking! 👀",
        "Just a little longer…",
        "Knock knock! Not time yet ♡",
        "Shh, it's a surprise~",
        "Wait in line, the door isn't open yet!",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
