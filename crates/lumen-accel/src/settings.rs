//! BVH build parameters.

use serde::{Deserialize, Serialize};

use crate::error::{AccelError, Result};

/// Capacity of the traversal stack, and so the deepest tree that can be
/// built.
pub const MAX_DEPTH: usize = 64;

/// Largest number of SAH bins accepted.
pub const MAX_BIN_COUNT: usize = 256;

/// Parameters controlling BVH construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BvhSettings {
    /// Below this many primitives a node becomes a leaf unless splitting
    /// is estimated to be cheaper.
    pub leaf_size_threshold: usize,
    /// Number of buckets candidate split planes are evaluated between.
    pub bin_count: usize,
    /// Depth budget; nodes at this depth become leaves unconditionally.
    pub max_depth: usize,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            leaf_size_threshold: 4,
            bin_count: 12,
            max_depth: 32,
        }
    }
}

impl BvhSettings {
    /// Parse settings from TOML, filling unspecified fields with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.leaf_size_threshold == 0 {
            return Err(AccelError::InvalidSettings(
                "leaf_size_threshold must be positive".into(),
            ));
        }
        if self.bin_count < 2 || self.bin_count > MAX_BIN_COUNT {
            return Err(AccelError::InvalidSettings(format!(
                "bin_count must be between 2 and {MAX_BIN_COUNT}"
            )));
        }
        if self.max_depth == 0 || self.max_depth > MAX_DEPTH {
            return Err(AccelError::InvalidSettings(format!(
                "max_depth must be between 1 and {MAX_DEPTH}"
            )));
        }
        Ok(())
    }
}
