//! Persisted models and the research-resources variant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SERVICE_MANUAL_KEY: &str = "serviceManual";
pub const SERVICE_BULLETIN_KEY: &str = "serviceBulletin";

/// Keys that mark the sectioned research-resources form
const SECTION_KEYS: [&str; 2] = ["sections", "categories"];
/// Keys that mark the flat research-resources form
const FLAT_KEYS: [&str; 2] = [SERVICE_MANUAL_KEY, SERVICE_BULLETIN_KEY];

/// Which authored research-resources form a value looks like.
///
/// Informational only; values of every shape are stored as authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceShape {
    /// `{serviceManual, serviceBulletin}`
    Flat,
    /// Richer form grouped into sections/categories
    Sectioned,
    /// Neither known form
    Other,
}

impl ResourceShape {
    /// Classify a mapping by its keys. Section keys win over flat keys.
    pub fn detect<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut flat = false;
        for key in keys {
            if SECTION_KEYS.contains(&key) {
                return ResourceShape::Sectioned;
            }
            if FLAT_KEYS.contains(&key) {
                flat = true;
            }
        }
        if flat {
            ResourceShape::Flat
        } else {
            ResourceShape::Other
        }
    }
}

/// Research resources as read back from a stored document
#[derive(Debug, Clone, PartialEq)]
pub enum ResearchResources {
    Flat {
        service_manual: Option<String>,
        service_bulletin: Option<String>,
    },
    Sectioned {
        body: Map<String, Value>,
    },
    /// Authored in neither known form, kept verbatim
    Other(Value),
}

impl ResearchResources {
    /// The shape filled in when a document carries no research resources
    pub fn empty() -> Self {
        ResearchResources::Flat {
            service_manual: Some(String::new()),
            service_bulletin: Some(String::new()),
        }
    }

    /// Parse a stored value. Anything outside the two known forms is `Other`.
    pub fn from_json(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return ResearchResources::Other(value.clone());
        };
        match ResourceShape::detect(map.keys().map(String::as_str)) {
            ResourceShape::Flat => ResearchResources::Flat {
                service_manual: map.get(SERVICE_MANUAL_KEY).and_then(Value::as_str).map(str::to_string),
                service_bulletin: map.get(SERVICE_BULLETIN_KEY).and_then(Value::as_str).map(str::to_string),
            },
            ResourceShape::Sectioned => ResearchResources::Sectioned { body: map.clone() },
            ResourceShape::Other => ResearchResources::Other(value.clone()),
        }
    }

    pub fn shape(&self) -> ResourceShape {
        match self {
            ResearchResources::Flat { .. } => ResourceShape::Flat,
            ResearchResources::Sectioned { .. } => ResourceShape::Sectioned,
            ResearchResources::Other(_) => ResourceShape::Other,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ResearchResources::Flat { service_manual, service_bulletin } => {
                let mut map = Map::new();
                if let Some(manual) = service_manual {
                    map.insert(SERVICE_MANUAL_KEY.to_string(), Value::String(manual.clone()));
                }
                if let Some(bulletin) = service_bulletin {
                    map.insert(SERVICE_BULLETIN_KEY.to_string(), Value::String(bulletin.clone()));
                }
                Value::Object(map)
            }
            ResearchResources::Sectioned { body } => Value::Object(body.clone()),
            ResearchResources::Other(value) => value.clone(),
        }
    }
}

/// Address of one engine page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSlug {
    pub brand: String,
    pub engine_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandSummary {
    pub id: String,
    pub display_name: String,
    pub engine_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSummary {
    pub id: String,
    pub display_name: String,
}

/// Enriched engine document as served to the page layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnginePageData {
    pub brand: String,
    pub engine_code: String,
    /// Stored document, with default research resources filled in when absent
    pub data: Value,
    #[serde(skip)]
    pub research_resources: ResearchResources,
    pub created_at: DateTime<Utc>,
}

/// Human-readable brand name from its key: `mercedes-benz` → `Mercedes Benz`
pub fn brand_display_name(id: &str) -> String {
    id.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
