//! Location catalog: the immutable set of places that carry weather.
//!
//! Catalogs are loaded once at startup from TOML (the built-in Hoenn
//! catalog is embedded in the binary) and validated before any resolution
//! runs. A location whose default condition is not among its possible
//! conditions aborts the load.

use hoenn_core::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::types::{Condition, Coordinates};

const BUILTIN_CATALOG: &str = include_str!("../data/hoenn.toml");

/// Cosmetic classification used by renderers for grouping and icons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocationCategory {
    MajorCity,
    Town,
    Landmark,
}

impl LocationCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MajorCity => "Major City",
            Self::Town => "Towns and Villages",
            Self::Landmark => "Landmarks and Locations",
        }
    }
}

/// A named place on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique key, e.g. "petalburg-city"
    pub name: String,
    pub category: LocationCategory,
    pub default_condition: Condition,
    /// Ordered, non-empty, contains `default_condition`
    pub possible_conditions: Vec<Condition>,
    pub proxy: Coordinates,
    /// Marker position in map pixel space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_position: Option<[f64; 2]>,
}

impl Location {
    pub fn allows(&self, condition: Condition) -> bool {
        self.possible_conditions.contains(&condition)
    }

    /// Human-readable name: "petalburg-city" becomes "Petalburg City"
    pub fn display_name(&self) -> String {
        self.name
            .split('-')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.possible_conditions.is_empty() {
            return Err(CatalogError::NoConditions(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for condition in &self.possible_conditions {
            if !seen.insert(*condition) {
                return Err(CatalogError::DuplicateCondition {
                    location: self.name.clone(),
                    condition: condition.to_string(),
                });
            }
        }

        if !self.allows(self.default_condition) {
            return Err(CatalogError::DefaultNotAllowed {
                location: self.name.clone(),
                default: self.default_condition.to_string(),
            });
        }

        if !self.proxy.is_valid() {
            return Err(CatalogError::InvalidCoordinates {
                location: self.name.clone(),
                lat: self.proxy.lat,
                lon: self.proxy.lon,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    locations: Vec<Location>,
}

/// Validated, read-only sequence of locations in declaration order
#[derive(Debug, Clone)]
pub struct Catalog {
    locations: Vec<Location>,
}

impl Catalog {
    /// Build a catalog, enforcing every location invariant.
    pub fn new(locations: Vec<Location>) -> Result<Self, CatalogError> {
        if locations.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut names = HashSet::new();
        for location in &locations {
            if !names.insert(location.name.as_str()) {
                return Err(CatalogError::DuplicateName(location.name.clone()));
            }
            location.validate()?;
        }

        Ok(Self { locations })
    }

    /// The embedded Hoenn catalog
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    pub fn from_toml(contents: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(contents).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(file.locations)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml(&contents)?;
        tracing::info!(
            "Loaded {} locations from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Load from `path` if given, otherwise the built-in catalog
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
