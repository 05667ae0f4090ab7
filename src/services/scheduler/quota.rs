use crate::models::bytes_to_gb;

/// Parses a size ceiling such as `"500GB"` or `"2TB"` into gigabytes
///
/// A bare number is read as gigabytes. Empty or unparseable input yields `0`,
/// which means unlimited.
pub fn parse_max_quota(raw: &str) -> f64 {
    let normalized = raw.trim().to_ascii_uppercase();
    let (number, multiplier) = if let Some(tb) = normalized.strip_suffix("TB") {
        (tb, 1024.0)
    } else if let Some(gb) = normalized.strip_suffix("GB") {
        (gb, 1.0)
    } else {
        (normalized.as_str(), 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value * multiplier,
        _ => 0.0,
    }
}

/// Running total of downloaded size against the configured ceiling, in GB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaTracker {
    size_so_far_gb: f64,
    limit_gb: f64,
}

impl QuotaTracker {
    pub fn new(limit_gb: f64, size_so_far_gb: f64) -> Self {
        Self {
            size_so_far_gb,
            limit_gb,
        }
    }

    /// Tracker for a settings value, seeded with sizes already downloaded
    pub fn from_setting(max_quota: &str, known_sizes: impl IntoIterator<Item = u64>) -> Self {
        let size_so_far_gb = known_sizes.into_iter().map(bytes_to_gb).sum();
        Self::new(parse_max_quota(max_quota), size_so_far_gb)
    }

    pub fn record_bytes(&mut self, bytes: u64) {
        self.size_so_far_gb += bytes_to_gb(bytes);
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit_gb <= 0.0
    }

    pub fn is_exhausted(&self) -> bool {
        !self.is_unlimited() && self.size_so_far_gb >= self.limit_gb
    }

    pub fn size_so_far_gb(&self) -> f64 {
        self.size_so_far_gb
    }

    pub fn limit_gb(&self) -> f64 {
        self.limit_gb
    }
}
