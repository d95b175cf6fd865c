//! Jet catalog - read-only `jet id -> mechanics` lookup
//!
//! The catalog is content owned elsewhere; the server only reads it once at
//! startup. Missing mechanics fields fall back to conservative defaults so
//! older catalog files keep loading, but a field that is present and not a
//! usable number rejects the whole catalog.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

const BUILTIN_CATALOG: &str = include_str!("../../data/jets.json");

/// Cannon constants for a jet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CannonSpec {
    /// Shots per second
    pub rate: f64,
    /// Forced pause after a burst is exhausted (ms)
    pub cooldown_ms: f64,
    /// Sustained fire allowed before cooldown (ms, 0 = unlimited)
    pub burst_ms: f64,
    /// Rounds carried
    pub ammo: u32,
}

/// Validated per-jet mechanics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JetMechanics {
    pub max_health: f64,
    pub max_fuel: f64,
    /// Milliseconds to burn one fuel unit at `max_speed`
    pub fuel_rate_ms: f64,
    pub max_speed: f64,
    pub radar_distance: f64,
    pub rwr_distance: f64,
    pub cannon: CannonSpec,
}

impl JetMechanics {
    /// Build mechanics from a raw catalog `Mechanics` object.
    pub fn from_raw(jet_id: &str, raw: &Map<String, Value>) -> Result<Self, CatalogError> {
        let field = |name: &'static str, fallback: f64| read_number(jet_id, raw, name, fallback);

        let radar_distance = field("radarDistance", 0.0)?;
        let rwr_distance = if raw.contains_key("RWRDistance") {
            field("RWRDistance", radar_distance)?
        } else {
            field("rwrDistance", radar_distance)?
        };

        Ok(Self {
            max_health: field("maxHealth", 100.0)?,
            max_fuel: field("maxFuel", 100.0)?,
            fuel_rate_ms: field("fuelRate", 1000.0)?,
            max_speed: field("maxSpeed", 1.0)?,
            radar_distance,
            rwr_distance,
            cannon: CannonSpec {
                rate: field("cannonRate", 0.0)?.max(1.0),
                cooldown_ms: field("cannonCooldown", 0.0)?,
                burst_ms: field("cannonBurst", 0.0)?,
                ammo: field("cannonAmmo", 0.0)?.floor() as u32,
            },
        })
    }
}

fn read_number(
    jet_id: &str,
    raw: &Map<String, Value>,
    name: &'static str,
    fallback: f64,
) -> Result<f64, CatalogError> {
    match raw.get(name) {
        None | Some(Value::Null) => Ok(fallback),
        Some(value) => match value.as_f64() {
            Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
            _ => Err(CatalogError::InvalidMechanic {
                jet: jet_id.to_string(),
                field: name,
            }),
        },
    }
}

/// A catalog entry: the raw detail echoed to clients plus parsed mechanics
#[derive(Debug, Clone)]
pub struct Jet {
    pub id: String,
    pub detail: Value,
    pub mechanics: JetMechanics,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(rename = "Jets", default)]
    jets: Vec<Value>,
}

/// Read-only jet lookup shared by every connection
#[derive(Debug, Default)]
pub struct JetCatalog {
    jets: HashMap<String, Arc<Jet>>,
}

impl JetCatalog {
    /// Load from a file, or the built-in catalog when no path is configured
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_json(&raw)
            }
            None => Self::from_json(BUILTIN_CATALOG),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        let mut jets = HashMap::new();

        for detail in file.jets {
            let Some(id) = detail.get("ID").and_then(Value::as_str).map(str::to_owned) else {
                continue;
            };
            let empty = Map::new();
            let raw_mechanics = detail
                .get("Mechanics")
                .and_then(Value::as_object)
                .unwrap_or(&empty);
            let mechanics = JetMechanics::from_raw(&id, raw_mechanics)?;

            if jets.contains_key(&id) {
                return Err(CatalogError::DuplicateJet(id));
            }
            jets.insert(id.clone(), Arc::new(Jet { id, detail, mechanics }));
        }

        Ok(Self { jets })
    }

    pub fn get(&self, id: &str) -> Option<Arc<Jet>> {
        self.jets.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.jets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jets.is_empty()
    }
}

/// Catalog loading errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read jet catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed jet catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Jet {jet} has an invalid mechanics field: {field}")]
    InvalidMechanic { jet: String, field: &'static str },

    #[error("Jet id listed twice: {0}")]
    DuplicateJet(String),
}
