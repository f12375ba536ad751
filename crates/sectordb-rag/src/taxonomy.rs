//! Classification code -> reporting sector tag.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use sectordb_core::error::Error;
use sectordb_core::types::AGNOSTIC;

/// Loaded once at startup from a flat JSON object (`{"B06.1": "Oil & Gas Company", ...}`).
#[derive(Debug, Clone, Default)]
pub struct SectorTaxonomy {
    codes: HashMap<String, String>,
}

impl SectorTaxonomy {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Taxonomy(format!("cannot read {}: {}", path.display(), e)))?;
        let taxonomy = Self::from_json(&text)?;
        info!(path = %path.display(), codes = taxonomy.len(), "🏷️ sector taxonomy loaded");
        Ok(taxonomy)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| Error::Taxonomy(e.to_string()))?;
        let obj = value.as_object().ok_or_else(|| Error::Taxonomy("expected a JSON object".into()))?;
        let mut codes = HashMap::with_capacity(obj.len());
        for (code, tag) in obj {
            let tag = tag
                .as_str()
                .ok_or_else(|| Error::Taxonomy(format!("tag for '{}' is not a string", code)))?;
            codes.insert(code.clone(), tag.to_string());
        }
        Ok(Self { codes })
    }

    pub fn from_pairs<I, C, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, T)>,
        C: Into<String>,
        T: Into<String>,
    {
        Self { codes: pairs.into_iter().map(|(c, t)| (c.into(), t.into())).collect() }
    }

    /// Exact-match lookup; anything unmapped is `Agnostic`.
    pub fn tag_for(&self, code: &str) -> &str {
        self.codes.get(code).map(String::as_str).unwrap_or(AGNOSTIC)
    }

    pub fn len(&self) -> usize { self.codes.len() }

    pub fn is_empty(&self) -> bool { self.codes.is_empty() }
}
