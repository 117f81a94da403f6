use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub scoring: Scoring,
    pub report: Report,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scoring {
    /// Additive bonus applied per matched facet (material, zone) on top of the
    /// base weight. With the strict match gate both facets are always matched,
    /// so every counted pair contributes weight * (1 + 2 * facet_bonus).
    pub facet_bonus: f32,
    pub weight_min: f32,
    pub weight_max: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub max_contributions: usize,
    pub bar_width: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: Database {
                url: "insid.db".to_string(),
                pool_size: 5,
            },
            scoring: Scoring {
                facet_bonus: 0.5,
                weight_min: 0.0,
                weight_max: 10.0,
            },
            report: Report {
                max_contributions: 20,
                bar_width: 30,
            },
        }
    }
}

impl Settings {
    pub fn load() -> &'static Settings {
        SETTINGS.get_or_init(Self::load_from_files)
    }

    fn load_from_files() -> Settings {
        let default_path = Path::new("settings.default.ron");
        let override_path = Path::new("settings.ron");

        let mut settings = if default_path.exists() {
            fs::read_to_string(default_path)
                .ok()
                .and_then(|content| ron::from_str(&content).ok())
                .unwrap_or_default()
        } else {
            Settings::default()
        };

        if override_path.exists() {
            if let Ok(content) = fs::read_to_string(override_path) {
                if let Ok(overrides) = ron::from_str::<Settings>(&content) {
                    settings = overrides;
                }
            }
        }

        settings
    }
}

pub fn settings() -> &'static Settings {
    Settings::load()
}
