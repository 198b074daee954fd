//! Conversion configuration.
//!
//! Settings arrive from the host's settings store as raw, possibly
//! out-of-range values ([`ConversionSettings`]). They are clamped exactly once,
//! when turned into a [`ConversionConfig`]; the pipeline only ever sees the
//! clamped form.

use std::env;

use serde::{Deserialize, Serialize};

use crate::decode::FilterType;
use crate::replace::ReplacePolicy;

/// Default WebP quality.
pub const DEFAULT_QUALITY: u8 = 80;

/// Default memory ceiling for the resource guard (256 MiB).
pub const DEFAULT_MEMORY_LIMIT: &str = "256M";

/// Default share of the memory ceiling a single decode may claim.
pub const DEFAULT_GUARD_FRACTION: f64 = 0.8;

/// Accepted range for the guard fraction.
pub const GUARD_FRACTION_RANGE: (f64, f64) = (0.6, 0.8);

const ENV_PREFIX: &str = "WEBPIFY_";

/// Raw settings as stored by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// WebP quality (clamped to 0-100)
    pub quality: i64,
    /// Maximum output width in pixels, 0 = unlimited
    pub max_width: i64,
    /// Maximum output height in pixels, 0 = unlimited
    pub max_height: i64,
    /// Resampling filter used when shrinking
    pub resize_filter: FilterType,
    /// Whether the WebP file should replace the original upload
    pub replace_original: bool,
    /// Deployed replacement policy
    pub replace_policy: ReplacePolicy,
    /// Memory ceiling, e.g. "256M", "1G", "134217728" or "-1" for unlimited
    pub memory_limit: String,
    /// Share of the memory ceiling a decode may use (clamped to 0.6-0.8)
    pub guard_fraction: f64,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY as i64,
            max_width: 0,
            max_height: 0,
            resize_filter: FilterType::default(),
            replace_original: true,
            replace_policy: ReplacePolicy::default(),
            memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            guard_fraction: DEFAULT_GUARD_FRACTION,
        }
    }
}

impl ConversionSettings {
    /// Read settings from `WEBPIFY_*` environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            quality: env_parse("QUALITY").unwrap_or(defaults.quality),
            max_width: env_parse("MAX_WIDTH").unwrap_or(defaults.max_width),
            max_height: env_parse("MAX_HEIGHT").unwrap_or(defaults.max_height),
            resize_filter: env_var("RESIZE_FILTER")
                .and_then(|v| FilterType::parse(&v))
                .unwrap_or(defaults.resize_filter),
            replace_original: env_var("REPLACE_ORIGINAL")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.replace_original),
            replace_policy: env_var("REPLACE_POLICY")
                .and_then(|v| ReplacePolicy::parse(&v))
                .unwrap_or(defaults.replace_policy),
            memory_limit: env_var("MEMORY_LIMIT").unwrap_or(defaults.memory_limit),
            guard_fraction: env_parse("GUARD_FRACTION").unwrap_or(defaults.guard_fraction),
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{key}"))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_var(key).and_then(|v| v.parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Clamp a raw quality value into 0-100.
pub fn clamp_quality(quality: i64) -> u8 {
    quality.clamp(0, 100) as u8
}

/// Clamp a raw dimension limit; negative values mean "unlimited".
pub fn clamp_dimension(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

/// Clamp the guard fraction into [`GUARD_FRACTION_RANGE`].
///
/// NaN falls back to [`DEFAULT_GUARD_FRACTION`].
pub fn clamp_guard_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return DEFAULT_GUARD_FRACTION;
    }
    fraction.clamp(GUARD_FRACTION_RANGE.0, GUARD_FRACTION_RANGE.1)
}

/// Parse a human-readable memory size such as `"128M"`.
///
/// Suffixes `K`, `M` and `G` (case-insensitive) are binary multiples.
/// Returns `None` for "unlimited" (`-1`, `0`) and for anything unparsable,
/// which disables the resource guard.
pub fn parse_memory_limit(value: &str) -> Option<u64> {
    let value = value.trim();
    let (digits, multiplier) = match value.chars().last()?.to_ascii_uppercase() {
        'K' => (&value[..value.len() - 1], 1u64 << 10),
        'M' => (&value[..value.len() - 1], 1u64 << 20),
        'G' => (&value[..value.len() - 1], 1u64 << 30),
        _ => (value, 1),
    };

    let amount: i64 = digits.trim().parse().ok()?;
    if amount <= 0 {
        return None;
    }
    (amount as u64).checked_mul(multiplier)
}

/// Clamped, immutable configuration for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    quality: u8,
    max_width: u32,
    max_height: u32,
    resize_filter: FilterType,
    replace_original: bool,
    replace_policy: ReplacePolicy,
    memory_limit: Option<u64>,
    guard_fraction: f64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self::from(ConversionSettings::default())
    }
}

impl From<ConversionSettings> for ConversionConfig {
    fn from(settings: ConversionSettings) -> Self {
        Self {
            quality: clamp_quality(settings.quality),
            max_width: clamp_dimension(settings.max_width),
            max_height: clamp_dimension(settings.max_height),
            resize_filter: settings.resize_filter,
            replace_original: settings.replace_original,
            replace_policy: settings.replace_policy,
            memory_limit: parse_memory_limit(&settings.memory_limit),
            guard_fraction: clamp_guard_fraction(settings.guard_fraction),
        }
    }
}

impl ConversionConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `WEBPIFY_*` environment variables.
    pub fn from_env() -> Self {
        Self::from(ConversionSettings::from_env())
    }

    pub fn with_quality(mut self, quality: i64) -> Self {
        self.quality = clamp_quality(quality);
        self
    }

    pub fn with_max_dimensions(mut self, max_width: i64, max_height: i64) -> Self {
        self.max_width = clamp_dimension(max_width);
        self.max_height = clamp_dimension(max_height);
        self
    }

    pub fn with_resize_filter(mut self, filter: FilterType) -> Self {
        self.resize_filter = filter;
        self
    }

    pub fn with_replace_original(mut self, replace: bool) -> Self {
        self.replace_original = replace;
        self
    }

    pub fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    /// Set the memory ceiling in bytes; `None` disables the resource guard.
    pub fn with_memory_limit(mut self, limit: Option<u64>) -> Self {
        self.memory_limit = limit.filter(|&l| l > 0);
        self
    }

    pub fn with_guard_fraction(mut self, fraction: f64) -> Self {
        self.guard_fraction = clamp_guard_fraction(fraction);
        self
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn max_height(&self) -> u32 {
        self.max_height
    }

    /// Check whether any maximum dimension is configured
    pub fn has_size_limit(&self) -> bool {
        self.max_width > 0 || self.max_height > 0
    }

    pub fn resize_filter(&self) -> FilterType {
        self.resize_filter
    }

    pub fn replace_original(&self) -> bool {
        self.replace_original
    }

    pub fn replace_policy(&self) -> ReplacePolicy {
        self.replace_policy
    }

    pub fn memory_limit(&self) -> Option<u64> {
        self.memory_limit
    }

    pub fn guard_fraction(&self) -> f64 {
        self.guard_fraction
    }
}
