use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Drawable-area margins around the layout, in layout units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 40.0,
            bottom: 60.0,
            left: 40.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub base_link_distance: f32,
    pub charge_strength: f32,
    pub charge_distance_max: f32,
    pub charge_theta: f32,
    pub collision_radius: f32,
    pub collision_strength: f32,
    pub center_strength: f32,
    pub time_x_strength: f32,
    pub time_y_strength: f32,
    pub free_pull_strength: f32,
    pub timeline_band: f32,
    pub boundary_margin: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub velocity_decay: f32,
    pub drag_alpha_target: f32,
    pub margins: Margins,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            base_link_distance: 50.0,
            charge_strength: -200.0,
            charge_distance_max: 200.0,
            charge_theta: 0.9,
            collision_radius: 30.0,
            collision_strength: 1.0,
            center_strength: 1.0,
            time_x_strength: 0.8,
            time_y_strength: 0.3,
            free_pull_strength: 0.1,
            timeline_band: 0.7,
            boundary_margin: 20.0,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            margins: Margins::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Falls back to `AI_PROVIDER`, then `deepseek`.
    pub provider: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub layout: LayoutConfig,
    pub assistant: AssistantConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config in {}", path.display()))
    }
}
