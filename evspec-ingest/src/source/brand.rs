//! Brand records extracted from a module's brand mapping

use super::value::SourceValue;
use evspec_common::ResourceShape;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

pub const HERO_IMAGE_KEY: &str = "heroImage";
pub const RESEARCH_RESOURCES_KEY: &str = "researchResources";
pub const ENGINES_KEY: &str = "engines";

/// Brand entry that cannot be used at all
#[derive(Debug, Error, PartialEq)]
pub enum BrandShapeError {
    #[error("brand entry is {0}, expected a mapping")]
    NotAMapping(&'static str),

    #[error("engines is {0}, expected a mapping")]
    EnginesNotAMapping(&'static str),
}

/// Brand-level research resources with their detected shape
#[derive(Debug, Clone, PartialEq)]
pub struct SharedResources {
    pub shape: ResourceShape,
    pub value: SourceValue,
}

impl SharedResources {
    /// Tag `value` with its shape. The value itself is kept as authored.
    pub fn classify(value: SourceValue) -> Self {
        let shape = match value.as_mapping() {
            Some(map) => ResourceShape::detect(map.keys().map(String::as_str)),
            None => ResourceShape::Other,
        };
        Self { shape, value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrandRecord {
    pub id: String,
    /// Hero image descriptor, kept as authored
    pub hero_image: Option<SourceValue>,
    pub research_resources: Option<SharedResources>,
    /// Engine code → engine document. Null entries are kept so they can be reported.
    pub engines: BTreeMap<String, SourceValue>,
}

impl BrandRecord {
    pub fn from_value(id: &str, value: SourceValue) -> Result<Self, BrandShapeError> {
        let mut fields = match value {
            SourceValue::Mapping(fields) => fields,
            other => return Err(BrandShapeError::NotAMapping(other.kind())),
        };

        let engines = match fields.remove(ENGINES_KEY) {
            Some(SourceValue::Mapping(engines)) => engines,
            None | Some(SourceValue::Null) => {
                warn!(brand = id, "Brand has no engines");
                BTreeMap::new()
            }
            Some(other) => return Err(BrandShapeError::EnginesNotAMapping(other.kind())),
        };

        let hero_image = fields.remove(HERO_IMAGE_KEY).filter(|v| !v.is_null());

        let research_resources = match fields.remove(RESEARCH_RESOURCES_KEY) {
            None | Some(SourceValue::Null) => None,
            Some(value) => {
                let shared = SharedResources::classify(value);
                if shared.shape == ResourceShape::Other {
                    debug!(
                        brand = id,
                        kind = shared.value.kind(),
                        "Research resources in neither known form, keeping as authored"
                    );
                }
                Some(shared)
            }
        };

        Ok(Self {
            id: id.to_string(),
            hero_image,
            research_resources,
            engines,
        })
    }
}
