//! Editor configuration.
//!
//! Loaded via the `config` crate from environment variables prefixed with
//! `FLOWCANVAS`, using `__` as the nesting separator
//! (e.g. `FLOWCANVAS__NODE__WIDTH=120`). Every field has a default.

use crate::geometry::Size;
use serde::Deserialize;

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct EditorConfig {
    /// Rendered node dimensions.
    #[serde(default)]
    pub node: NodeConfig,

    /// Pointer hit-testing.
    #[serde(default)]
    pub probe: ProbeConfig,
}

/// Dimensions shared by step nodes and dropzone markers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_node_width")]
    pub width: f64,

    #[serde(default = "default_node_height")]
    pub height: f64,
}

/// Pointer probe used during drag-to-insert.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeConfig {
    /// Side length of the square probe, in canvas units.
    #[serde(default = "default_probe_size")]
    pub size: f64,

    /// Whether partially overlapping a dropzone counts as a hit.
    #[serde(default = "default_allow_partial")]
    pub allow_partial: bool,
}

fn default_node_width() -> f64 {
    100.0
}

fn default_node_height() -> f64 {
    34.0
}

fn default_probe_size() -> f64 {
    10.0
}

fn default_allow_partial() -> bool {
    true
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            width: default_node_width(),
            height: default_node_height(),
        }
    }
}

impl NodeConfig {
    /// Returns the node dimensions as a [`Size`].
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            size: default_probe_size(),
            allow_partial: default_allow_partial(),
        }
    }
}

impl EditorConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_builder(config::Config::builder().add_source(
            config::Environment::with_prefix("FLOWCANVAS")
                .separator("__")
                .try_parsing(true),
        ))
    }

    /// Builds configuration from an arbitrary set of sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be merged or deserialized.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}
