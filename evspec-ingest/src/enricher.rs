//! Brand-level defaults merged into engine records
//!
//! Fills `researchResources` and `hero.image` from the brand when the engine
//! leaves them out. Values the engine defines are never replaced.

use crate::source::{BrandRecord, SourceValue};
use std::collections::BTreeMap;
use thiserror::Error;

pub const RESEARCH_RESOURCES_KEY: &str = "researchResources";
pub const HERO_KEY: &str = "hero";
pub const IMAGE_KEY: &str = "image";

/// Engine record with brand defaults applied; the unit handed to the sanitizer
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub fields: BTreeMap<String, SourceValue>,
}

impl EnrichedRecord {
    pub fn into_value(self) -> SourceValue {
        SourceValue::Mapping(self.fields)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EnrichError {
    #[error("engine record is null")]
    Missing,

    #[error("engine record is {0}, expected a mapping")]
    NotAMapping(&'static str),
}

/// Merge brand defaults into a copy of `engine`.
///
/// The brand is only read; everything taken from it is cloned.
pub fn enrich(engine: &SourceValue, brand: &BrandRecord) -> Result<EnrichedRecord, EnrichError> {
    let mut fields = match engine {
        SourceValue::Mapping(fields) => fields.clone(),
        SourceValue::Null => return Err(EnrichError::Missing),
        other => return Err(EnrichError::NotAMapping(other.kind())),
    };

    if let Some(shared) = &brand.research_resources {
        if is_absent(fields.get(RESEARCH_RESOURCES_KEY)) {
            fields.insert(RESEARCH_RESOURCES_KEY.to_string(), shared.value.clone());
        }
    }

    if let Some(image) = &brand.hero_image {
        // Hero is only created to carry the brand image
        if is_absent(fields.get(HERO_KEY)) {
            fields.insert(HERO_KEY.to_string(), SourceValue::Mapping(BTreeMap::new()));
        }
        if let Some(SourceValue::Mapping(hero)) = fields.get_mut(HERO_KEY) {
            if is_absent(hero.get(IMAGE_KEY)) {
                hero.insert(IMAGE_KEY.to_string(), image.clone());
            }
        }
    }

    Ok(EnrichedRecord { fields })
}

fn is_absent(value: Option<&SourceValue>) -> bool {
    value.map(SourceValue::is_null).unwrap_or(true)
}
