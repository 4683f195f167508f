//! Configuration loading and the immutable [`ConfigSnapshot`].
//!
//! Operators edit a YAML file whose layout mirrors [`Settings`]. Loading is
//! two steps: serde fills a raw [`Settings`] tree (every field has a named
//! default), then [`ConfigSnapshot::from_settings`] validates it. Invalid
//! values are corrected to safe defaults with a warning rather than
//! rejected, so the processing core only ever sees a valid snapshot.
//!
//! A reload builds a whole new snapshot and swaps it into the
//! [`ConfigCell`]; snapshots are never patched in place.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::messages::MessageCatalog;

/// Fallback reward range when the configured one is not positive.
const DEFAULT_RANGE: f64 = 16.0;

/// Shortest auto-save interval accepted, in seconds.
const MIN_AUTO_SAVE_INTERVAL_SECS: u64 = 10;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Raw settings (as written by the operator)
// ---------------------------------------------------------------------------

/// Raw configuration as read from YAML, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Master switch for reward processing.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum distance between a reward and its recipient.
    #[serde(default = "default_range")]
    pub range: f64,

    /// Global reward multiplier.
    #[serde(default = "default_multiplier", rename = "xp-multiplier")]
    pub multiplier: f64,

    /// Lifetime statistics settings.
    #[serde(default)]
    pub stats: StatsSettings,

    /// Pickup sound settings.
    #[serde(default)]
    pub sound: SoundSection,

    /// Pickup particle settings.
    #[serde(default)]
    pub particles: ParticleSection,

    /// Minimum milliseconds between feedback effects for one recipient.
    #[serde(default = "default_effect_cooldown_ms")]
    pub effect_cooldown_ms: i64,

    /// Per-world enablement.
    #[serde(default)]
    pub world_filter: WorldFilterSection,

    /// Log every granted reward.
    #[serde(default)]
    pub debug: bool,

    /// Message template overrides.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            range: default_range(),
            multiplier: default_multiplier(),
            stats: StatsSettings::default(),
            sound: SoundSection::default(),
            particles: ParticleSection::default(),
            effect_cooldown_ms: default_effect_cooldown_ms(),
            world_filter: WorldFilterSection::default(),
            debug: false,
            messages: BTreeMap::new(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file at the given path.
    ///
    /// The `XPSTREAM_STATS_PATH` environment variable overrides
    /// `stats.file` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        let mut settings: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        settings.stats.apply_env_overrides();
        Ok(settings)
    }
}

/// Statistics section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatsSettings {
    /// Whether lifetime totals are recorded.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seconds between automatic saves (0 disables auto-save).
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval: i64,

    /// Path of the stats file.
    #[serde(default = "default_stats_file")]
    pub file: PathBuf,
}

impl StatsSettings {
    /// Override the stats file path from `XPSTREAM_STATS_PATH` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("XPSTREAM_STATS_PATH") {
            self.file = PathBuf::from(val);
        }
    }
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_save_interval: default_auto_save_interval(),
            file: default_stats_file(),
        }
    }
}

/// Sound section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SoundSection {
    /// Whether a sound plays on pickup.
    #[serde(default)]
    pub enabled: bool,

    /// Namespaced sound key, e.g. `entity.experience_orb.pickup`.
    #[serde(default = "default_sound_type", rename = "type")]
    pub kind: String,

    /// Playback volume, clamped to `[0, 2]`.
    #[serde(default = "default_sound_volume")]
    pub volume: f64,

    /// Playback pitch, clamped to `[0.5, 2]`.
    #[serde(default = "default_sound_pitch")]
    pub pitch: f64,
}

impl Default for SoundSection {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: default_sound_type(),
            volume: default_sound_volume(),
            pitch: default_sound_pitch(),
        }
    }
}

/// Particle section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParticleSection {
    /// Whether particles spawn on pickup.
    #[serde(default)]
    pub enabled: bool,

    /// Particle type name, e.g. `HAPPY_VILLAGER`.
    #[serde(default = "default_particle_type", rename = "type")]
    pub kind: String,

    /// Particles per pickup.
    #[serde(default = "default_particle_count")]
    pub count: i64,
}

impl Default for ParticleSection {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: default_particle_type(),
            count: default_particle_count(),
        }
    }
}

/// World filter section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorldFilterSection {
    /// `DISABLED`, `WHITELIST` or `BLACKLIST` (case-insensitive).
    #[serde(default = "default_world_filter_mode")]
    pub mode: String,

    /// World names the mode applies to.
    #[serde(default)]
    pub worlds: Vec<String>,
}

impl Default for WorldFilterSection {
    fn default() -> Self {
        Self {
            mode: default_world_filter_mode(),
            worlds: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validated snapshot
// ---------------------------------------------------------------------------

/// How the world filter treats its world list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorldFilterMode {
    /// Every world is allowed.
    #[default]
    Disabled,
    /// Only listed worlds are allowed.
    Whitelist,
    /// Listed worlds are excluded.
    Blacklist,
}

impl WorldFilterMode {
    /// Parse a mode name case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "DISABLED" => Some(Self::Disabled),
            "WHITELIST" => Some(Self::Whitelist),
            "BLACKLIST" => Some(Self::Blacklist),
            _ => None,
        }
    }
}

/// Validated world filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorldFilter {
    mode: WorldFilterMode,
    worlds: BTreeSet<String>,
}

impl WorldFilter {
    /// Create a filter from a mode and world list.
    pub fn new(mode: WorldFilterMode, worlds: impl IntoIterator<Item = String>) -> Self {
        Self {
            mode,
            worlds: worlds.into_iter().collect(),
        }
    }

    /// The filter mode.
    pub const fn mode(&self) -> WorldFilterMode {
        self.mode
    }

    /// Whether rewards in `world` are processed.
    pub fn allows(&self, world: &str) -> bool {
        match self.mode {
            WorldFilterMode::Disabled => true,
            WorldFilterMode::Whitelist => self.worlds.contains(world),
            WorldFilterMode::Blacklist => !self.worlds.contains(world),
        }
    }
}

/// Validated sound settings. Present only when sound is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundSettings {
    /// Lower-cased namespaced sound key.
    pub sound: String,
    /// Volume in `[0, 2]`.
    pub volume: f32,
    /// Pitch in `[0.5, 2]`.
    pub pitch: f32,
}

/// Validated particle settings. Present only when particles are enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticleSettings {
    /// Particle type name.
    pub particle: String,
    /// Particles per pickup, at least 1.
    pub count: u32,
}

/// Immutable, validated configuration for one processing generation.
///
/// `range_squared` is always exactly `range * range`; the only way to build
/// a snapshot is through validation, which computes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    enabled: bool,
    range: f64,
    range_squared: f64,
    multiplier: f64,
    stats_enabled: bool,
    stats_file: PathBuf,
    auto_save_interval: Duration,
    effect_cooldown: Duration,
    sound: Option<SoundSettings>,
    particles: Option<ParticleSettings>,
    world_filter: WorldFilter,
    debug: bool,
    log_level: String,
    messages: MessageCatalog,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ConfigSnapshot {
    /// Validate raw settings into a snapshot, correcting invalid values.
    ///
    /// Every correction is logged at `warn` level.
    #[allow(clippy::too_many_lines)]
    pub fn from_settings(settings: &Settings) -> Self {
        let range = if settings.range > 0.0 && settings.range.is_finite() {
            settings.range
        } else {
            warn!(range = settings.range, "Invalid range, using default {DEFAULT_RANGE}");
            DEFAULT_RANGE
        };

        let multiplier = if settings.multiplier >= 0.0 && settings.multiplier.is_finite() {
            settings.multiplier
        } else {
            warn!(
                multiplier = settings.multiplier,
                "Invalid xp-multiplier, using default 1.0"
            );
            1.0
        };

        let auto_save_secs = match u64::try_from(settings.stats.auto_save_interval) {
            Ok(0) | Err(_) => 0,
            Ok(secs) if secs < MIN_AUTO_SAVE_INTERVAL_SECS => {
                warn!(
                    interval = secs,
                    "stats.auto-save-interval too low, clamping to {MIN_AUTO_SAVE_INTERVAL_SECS}"
                );
                MIN_AUTO_SAVE_INTERVAL_SECS
            }
            Ok(secs) => secs,
        };

        let effect_cooldown = u64::try_from(settings.effect_cooldown_ms).map_or_else(
            |_| {
                warn!(
                    effect_cooldown_ms = settings.effect_cooldown_ms,
                    "effect-cooldown-ms cannot be negative, using 0"
                );
                Duration::ZERO
            },
            Duration::from_millis,
        );

        let mode = WorldFilterMode::parse(&settings.world_filter.mode).unwrap_or_else(|| {
            warn!(
                mode = settings.world_filter.mode,
                "Invalid world-filter.mode, using DISABLED"
            );
            WorldFilterMode::Disabled
        });

        let range_squared = range * range;

        Self {
            enabled: settings.enabled,
            range,
            range_squared,
            multiplier,
            stats_enabled: settings.stats.enabled,
            stats_file: settings.stats.file.clone(),
            auto_save_interval: Duration::from_secs(auto_save_secs),
            effect_cooldown,
            sound: validate_sound(&settings.sound),
            particles: validate_particles(&settings.particles),
            world_filter: WorldFilter::new(mode, settings.world_filter.worlds.iter().cloned()),
            debug: settings.debug,
            log_level: settings.logging.level.clone(),
            messages: MessageCatalog::with_overrides(&settings.messages),
        }
    }

    /// Whether reward processing is enabled at all.
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Maximum reward distance.
    pub const fn range(&self) -> f64 {
        self.range
    }

    /// `range * range`, cached.
    pub const fn range_squared(&self) -> f64 {
        self.range_squared
    }

    /// Global reward multiplier.
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Whether lifetime totals are recorded.
    pub const fn stats_enabled(&self) -> bool {
        self.stats_enabled
    }

    /// Where the stats file lives.
    pub fn stats_file(&self) -> &Path {
        &self.stats_file
    }

    /// Interval between automatic saves; zero disables auto-save.
    pub const fn auto_save_interval(&self) -> Duration {
        self.auto_save_interval
    }

    /// Minimum wall-clock time between feedback effects per recipient.
    pub const fn effect_cooldown(&self) -> Duration {
        self.effect_cooldown
    }

    /// Sound settings, when sound is enabled.
    pub const fn sound(&self) -> Option<&SoundSettings> {
        self.sound.as_ref()
    }

    /// Particle settings, when particles are enabled.
    pub const fn particles(&self) -> Option<&ParticleSettings> {
        self.particles.as_ref()
    }

    /// The world filter.
    pub const fn world_filter(&self) -> &WorldFilter {
        &self.world_filter
    }

    /// Whether rewards in `world` are processed.
    pub fn is_world_allowed(&self, world: &str) -> bool {
        self.world_filter.allows(world)
    }

    /// Whether every grant is logged.
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Configured log level.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Message templates.
    pub const fn messages(&self) -> &MessageCatalog {
        &self.messages
    }
}

/// Load and validate a snapshot from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed. Value
/// errors never fail; they are corrected during validation.
pub fn load_snapshot(path: &Path) -> Result<ConfigSnapshot, ConfigError> {
    let settings = Settings::from_file(path)?;
    Ok(ConfigSnapshot::from_settings(&settings))
}

#[allow(clippy::cast_possible_truncation)]
fn validate_sound(section: &SoundSection) -> Option<SoundSettings> {
    if !section.enabled {
        return None;
    }
    let sound = section.kind.trim().to_ascii_lowercase();
    if !is_valid_sound_key(&sound) {
        warn!(sound = section.kind, "Invalid sound type, disabling sound effects");
        return None;
    }
    let volume = if (0.0..=2.0).contains(&section.volume) {
        section.volume
    } else {
        warn!(volume = section.volume, "sound.volume out of range [0, 2.0], clamping");
        if section.volume.is_nan() {
            default_sound_volume()
        } else {
            section.volume.clamp(0.0, 2.0)
        }
    };
    let pitch = if (0.5..=2.0).contains(&section.pitch) {
        section.pitch
    } else {
        warn!(pitch = section.pitch, "sound.pitch out of range [0.5, 2.0], clamping");
        if section.pitch.is_nan() {
            default_sound_pitch()
        } else {
            section.pitch.clamp(0.5, 2.0)
        }
    };
    Some(SoundSettings {
        sound,
        volume: volume as f32,
        pitch: pitch as f32,
    })
}

fn validate_particles(section: &ParticleSection) -> Option<ParticleSettings> {
    if !section.enabled {
        return None;
    }
    let particle = section.kind.trim();
    if !is_valid_particle_name(particle) {
        warn!(particle = section.kind, "Invalid particle type, disabling particles");
        return None;
    }
    let count = match u32::try_from(section.count) {
        Ok(count) if count > 0 => count,
        _ => {
            warn!(count = section.count, "particles.count must be > 0, using default 5");
            5
        }
    };
    Some(ParticleSettings {
        particle: particle.to_owned(),
        count,
    })
}

/// Namespaced keys: `[a-z0-9_.-]` with an optional single `namespace:`.
fn is_valid_sound_key(key: &str) -> bool {
    let path = match key.split_once(':') {
        Some((namespace, path)) => {
            if namespace.is_empty() || !namespace.chars().all(is_key_char) {
                return false;
            }
            path
        }
        None => key,
    };
    !path.is_empty() && path.chars().all(|c| is_key_char(c) || c == '/')
}

const fn is_key_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

/// Particle names are upper-case identifiers, e.g. `HAPPY_VILLAGER`.
fn is_valid_particle_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

// ---------------------------------------------------------------------------
// Config cell
// ---------------------------------------------------------------------------

/// Holder for the current snapshot.
///
/// Readers take an [`Arc`] to one snapshot and keep using it for the rest
/// of their work, so a concurrent [`replace`](Self::replace) is never
/// observed halfway through an event.
#[derive(Debug)]
pub struct ConfigCell {
    current: RwLock<Arc<ConfigSnapshot>>,
}

impl ConfigCell {
    /// Create a cell holding `snapshot`.
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new snapshot, returning the previous one.
    pub fn replace(&self, snapshot: ConfigSnapshot) -> Arc<ConfigSnapshot> {
        let next = Arc::new(snapshot);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        core::mem::replace(&mut *guard, next)
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new(ConfigSnapshot::default())
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_range() -> f64 {
    DEFAULT_RANGE
}

const fn default_multiplier() -> f64 {
    1.0
}

const fn default_auto_save_interval() -> i64 {
    300
}

fn default_stats_file() -> PathBuf {
    PathBuf::from("stats.json")
}

fn default_sound_type() -> String {
    "entity.experience_orb.pickup".to_owned()
}

const fn default_sound_volume() -> f64 {
    0.5
}

const fn default_sound_pitch() -> f64 {
    1.0
}

fn default_particle_type() -> String {
    "HAPPY_VILLAGER".to_owned()
}

const fn default_particle_count() -> i64 {
    5
}

const fn default_effect_cooldown_ms() -> i64 {
    200
}

fn default_world_filter_mode() -> String {
    "DISABLED".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
