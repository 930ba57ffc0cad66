use serde::{Deserialize, Serialize};

/// Byte boundaries between small, medium and large logs (decimal KB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeThresholds {
    /// Logs strictly below this are small.
    pub small_bytes: u64,
    /// Logs strictly above this are large.
    pub large_bytes: u64,
}

impl Default for SizeThresholds {
    fn default() -> Self {
        Self {
            small_bytes: 50_000,
            large_bytes: 200_000,
        }
    }
}

impl SizeThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.small_bytes == 0 {
            return Err("small_bytes must be > 0".to_string());
        }
        if self.small_bytes > self.large_bytes {
            return Err(format!(
                "small_bytes ({}) cannot exceed large_bytes ({})",
                self.small_bytes, self.large_bytes
            ));
        }
        Ok(())
    }

    /// Pure function of the stored size; never cached.
    #[must_use]
    pub fn classify(&self, size_bytes: u64) -> SizeClass {
        if size_bytes < self.small_bytes {
            SizeClass::Small
        } else if size_bytes > self.large_bytes {
            SizeClass::Large
        } else {
            SizeClass::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Small => "safe to read fully",
            Self::Medium => "read with caution, consider stats first",
            Self::Large => "too large, use search, not full read",
        }
    }

    /// Whether `read_full` without `max_lines` is permitted.
    pub fn allows_unbounded_read(self) -> bool {
        !matches!(self, Self::Large)
    }
}

impl std::fmt::Display for SizeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `250000` -> `"250.0"` (decimal kilobytes, one decimal place).
pub fn format_kb(size_bytes: u64) -> String {
    format!("{:.1}", size_bytes as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_exact() {
        let t = SizeThresholds::default();
        assert_eq!(t.classify(0), SizeClass::Small);
        assert_eq!(t.classify(49_999), SizeClass::Small);
        assert_eq!(t.classify(50_000), SizeClass::Medium);
        assert_eq!(t.classify(200_000), SizeClass::Medium);
        assert_eq!(t.classify(200_001), SizeClass::Large);
    }

    #[test]
    fn classification_is_deterministic() {
        let t = SizeThresholds::default();
        for size in [0, 1, 49_999, 50_000, 123_456, 200_000, 200_001, u64::MAX] {
            assert_eq!(t.classify(size), t.classify(size));
        }
    }

    #[test]
    fn thresholds_validate_ordering() {
        assert!(SizeThresholds::default().validate().is_ok());
        let bad = SizeThresholds {
            small_bytes: 300_000,
            large_bytes: 200_000,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn kb_formatting_uses_decimal_units() {
        assert_eq!(format_kb(250_000), "250.0");
        assert_eq!(format_kb(49_000), "49.0");
        assert_eq!(format_kb(1_560), "1.6");
    }
}
