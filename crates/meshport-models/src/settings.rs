use serde::{Deserialize, Serialize};

/// What happens to mesh records a reimport no longer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Destroy them.
    #[default]
    Destroy,
    /// Leave them alive, detached from the model's mesh list.
    Keep,
}

/// How a reimport pairs new meshes with existing mesh records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// The k-th mesh in traversal order reuses the k-th record.
    #[default]
    Position,
    /// Meshes reuse the first unclaimed record with the same name, in
    /// traversal order.
    Name,
}

/// Import engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Timeout in seconds given to requests created by the front end.
    pub default_timeout: f32,
    pub orphans: OrphanPolicy,
    pub identity: IdentityStrategy,
}

impl ImportSettings {
    pub const DEFAULT_TIMEOUT: f32 = 5.0;

    /// Parse settings from TOML. Missing keys keep their defaults.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            default_timeout: Self::DEFAULT_TIMEOUT,
            orphans: OrphanPolicy::default(),
            identity: IdentityStrategy::default(),
        }
    }
}
