use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation towards `other`; `t` is clamped to `0..=1`.
    pub fn lerp(&self, other: &Position, t: f64) -> Position {
        if t >= 1.0 {
            return *other;
        }
        let t = t.max(0.0);
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StockyardConfig {
    pub name: String,
    pub position: Position,
    pub materials: BTreeMap<String, u32>,
    #[serde(default = "default_loading_capacity")]
    pub loading_capacity: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DestinationConfig {
    pub name: String,
    pub position: Position,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub enabled: bool,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
    pub min_quantity: u32,
    pub max_quantity: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_ms: 5_000,
            max_interval_ms: 15_000,
            min_quantity: 80,
            max_quantity: 120,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub dispatch_ms: u64,
    pub move_to_load_ms: u64,
    pub min_loading_ms: u64,
    pub max_loading_ms: u64,
    pub departure_ms: u64,
    pub min_transit_ms: u64,
    pub max_transit_ms: u64,
    pub delay_probability: f64,
    pub max_delay_ms: u64,
    pub unloading_ms: u64,
    pub return_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            dispatch_ms: 500,
            move_to_load_ms: 2_000,
            min_loading_ms: 3_000,
            max_loading_ms: 8_000,
            departure_ms: 500,
            min_transit_ms: 8_000,
            max_transit_ms: 20_000,
            delay_probability: 0.2,
            max_delay_ms: 5_000,
            unloading_ms: 2_000,
            return_ms: 3_000,
        }
    }
}

pub const MIN_DELAY_MS: u64 = 1_000;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CostConfig {
    pub transport_per_unit: f64,
    pub penalty_per_late_unit: f64,
    pub target_delivery_ms: u64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            transport_per_unit: 12.0,
            penalty_per_late_unit: 25.0,
            target_delivery_ms: 30 * 60 * 1_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub event_log_capacity: usize,
    pub recent_events: usize,
    pub active_orders: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            event_log_capacity: 50,
            recent_events: 20,
            active_orders: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyConfig {
    #[default]
    FirstFit,
    NearestRake,
    LargestStock,
}

impl StrategyConfig {
    pub const ALL: [StrategyConfig; 3] = [
        StrategyConfig::FirstFit,
        StrategyConfig::NearestRake,
        StrategyConfig::LargestStock,
    ];
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StrategyConfig::FirstFit => "first-fit",
            StrategyConfig::NearestRake => "nearest-rake",
            StrategyConfig::LargestStock => "largest-stock",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub rake_count: usize,
    pub rake_capacity: u32,
    pub depot: Position,
    pub stockyards: Vec<StockyardConfig>,
    pub destinations: Vec<DestinationConfig>,
    pub materials: Vec<String>,
    pub generation: GenerationConfig,
    pub timing: TimingConfig,
    pub costs: CostConfig,
    pub view: ViewConfig,
    pub strategy: StrategyConfig,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rake_count: 5,
            rake_capacity: 4_000,
            depot: Position::new(50.0, 50.0),
            stockyards: default_stockyards(),
            destinations: default_destinations(),
            materials: default_materials(),
            generation: GenerationConfig::default(),
            timing: TimingConfig::default(),
            costs: CostConfig::default(),
            view: ViewConfig::default(),
            strategy: StrategyConfig::default(),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    pub url: String,
    pub heartbeat_interval_ms: u64,
    pub request_positions_on_open: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            heartbeat_interval_ms: 30_000,
            request_positions_on_open: true,
        }
    }
}

/// Top-level shape of a config file: both sections are optional.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimConfig,
    pub connection: ConnectionConfig,
}

fn default_loading_capacity() -> usize {
    2
}

fn stockyard(name: &str, x: f64, y: f64, materials: &[(&str, u32)]) -> StockyardConfig {
    StockyardConfig {
        name: name.to_string(),
        position: Position::new(x, y),
        materials: materials
            .iter()
            .map(|(material, quantity)| (material.to_string(), *quantity))
            .collect(),
        loading_capacity: default_loading_capacity(),
    }
}

fn default_stockyards() -> Vec<StockyardConfig> {
    vec![
        stockyard(
            "Stockyard-A",
            20.0,
            30.0,
            &[("Iron Ore", 800), ("Coal", 500), ("Limestone", 300)],
        ),
        stockyard(
            "Stockyard-B",
            60.0,
            20.0,
            &[("Coal", 900), ("Iron Ore", 400), ("Dolomite", 350)],
        ),
        stockyard(
            "Stockyard-C",
            40.0,
            70.0,
            &[("Limestone", 600), ("Dolomite", 500), ("Iron Ore", 300)],
        ),
    ]
}

fn default_destinations() -> Vec<DestinationConfig> {
    [
        ("Bokaro Steel Plant", 80.0, 50.0),
        ("Bhilai Steel Plant", 10.0, 80.0),
        ("Rourkela Steel Plant", 90.0, 85.0),
        ("Durgapur Steel Plant", 85.0, 15.0),
    ]
    .iter()
    .map(|(name, x, y)| DestinationConfig {
        name: name.to_string(),
        position: Position::new(*x, *y),
    })
    .collect()
}

fn default_materials() -> Vec<String> {
    ["Iron Ore", "Coal", "Limestone", "Dolomite"]
        .iter()
        .map(|material| material.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
[simulation]
rake_count = 2
seed = 9

[simulation.generation]
enabled = false

[connection]
url = "ws://example.test/ws"
"#,
        )
        .expect("settings should parse");

        assert_eq!(settings.simulation.rake_count, 2);
        assert_eq!(settings.simulation.seed, Some(9));
        assert!(!settings.simulation.generation.enabled);
        assert_eq!(settings.simulation.generation.min_quantity, 80);
        assert_eq!(settings.simulation.stockyards.len(), 3);
        assert_eq!(settings.connection.url, "ws://example.test/ws");
        assert_eq!(settings.connection.heartbeat_interval_ms, 30_000);
    }

    #[test]
    fn strategy_names_are_kebab_case() {
        let parsed: StrategyConfig = serde_json::from_str("\"nearest-rake\"").unwrap();
        assert_eq!(parsed, StrategyConfig::NearestRake);
        assert_eq!(StrategyConfig::LargestStock.to_string(), "largest-stock");
    }

    #[test]
    fn priority_weights_rank_high_first() {
        assert!(Priority::High.weight() > Priority::Medium.weight());
        assert!(Priority::Medium.weight() > Priority::Low.weight());
    }

    #[test]
    fn lerp_clamps_progress() {
        let from = Position::new(0.0, 0.0);
        let to = Position::new(10.0, 20.0);
        assert_eq!(from.lerp(&to, 0.5), Position::new(5.0, 10.0));
        assert_eq!(from.lerp(&to, 2.0), to);
        assert_eq!(from.distance_to(&Position::new(3.0, 4.0)), 5.0);
    }
}
