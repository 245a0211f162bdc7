use std::path::Path;

use room::SyncConfig;
use serde::{Deserialize, Serialize};
use types::DeckConfig;

/// One simulated table, usually loaded from YAML.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub players: Vec<String>,
    /// Falls back to the suggested deck for the player count.
    pub deck: Option<DeckConfig>,
    pub day_seconds: Option<u64>,
    /// The game is force-ended once the night counter passes this.
    pub max_nights: u32,
    pub games: usize,
    pub step_delay_ms: Option<u64>,
    pub store_url: Option<String>,
    pub sync: SyncConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            players: (1..=8).map(|i| format!("P{i}")).collect(),
            deck: None,
            day_seconds: None,
            max_nights: 20,
            games: 1,
            step_delay_ms: None,
            store_url: None,
            sync: SyncConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::SimulationError> {
        let yaml = std::fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&yaml)?)
    }
}
