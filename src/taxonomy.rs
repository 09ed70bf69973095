// 🗂️ Taxonomy Resolver - archives, categories and their historical names
//
// Resolves an archive or category token into every category identifier
// that should be listed under it. A category has at most one alternate
// name: either an alias (old ⇄ new) or the name of the archive it
// subsumed.

use crate::error::{ListingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::debug;

const BUILTIN_TAXONOMY: &str = include_str!("../data/taxonomy.json");

// ============================================================================
// DEFINITIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDef {
    /// Display name (e.g., "Mathematics")
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Display name (e.g., "Geometric Topology")
    pub name: String,

    /// Archive this category belongs to (e.g., "math")
    pub in_archive: String,
}

// ============================================================================
// TAXONOMY
// ============================================================================

/// Static archive/category tables, read-only for the process lifetime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub archives: BTreeMap<String, ArchiveDef>,

    #[serde(default)]
    pub categories: BTreeMap<String, CategoryDef>,

    /// old name → new name
    #[serde(default)]
    pub category_aliases: BTreeMap<String, String>,

    /// subsumed archive → category that replaced it
    #[serde(default)]
    pub archives_subsumed: BTreeMap<String, String>,
}

impl Taxonomy {
    /// Taxonomy compiled into the crate
    pub fn builtin() -> Result<Self> {
        Ok(serde_json::from_str(BUILTIN_TAXONOMY)?)
    }

    /// Load taxonomy tables from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let taxonomy: Taxonomy = serde_json::from_str(&content)?;
        debug!(
            archives = taxonomy.archives.len(),
            categories = taxonomy.categories.len(),
            "loaded taxonomy from {:?}",
            path.as_ref()
        );
        Ok(taxonomy)
    }

    pub fn is_archive(&self, token: &str) -> bool {
        self.archives.contains_key(token)
    }

    pub fn is_category(&self, token: &str) -> bool {
        self.categories.contains_key(token)
    }

    /// Categories whose containing archive is `archive`, in identifier order
    pub fn categories_in_archive<'a>(&'a self, archive: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.categories
            .iter()
            .filter(move |(_, def)| def.in_archive == archive)
            .map(|(id, _)| id.as_str())
    }

    /// The single alternate name of a category, if any
    ///
    /// Aliases match on either side. Otherwise a category that replaced a
    /// subsumed archive yields the old archive name, and the old archive
    /// name yields its replacement.
    pub fn alternate_name(&self, category: &str) -> Option<&str> {
        for (old, new) in &self.category_aliases {
            if category == old {
                return Some(new.as_str());
            }
            if category == new {
                return Some(old.as_str());
            }
        }

        for (old_archive, new_category) in &self.archives_subsumed {
            if category == new_category {
                return Some(old_archive.as_str());
            }
            if category == old_archive {
                return Some(new_category.as_str());
            }
        }

        None
    }

    /// Every category identifier equivalent to an archive or category token
    ///
    /// Fails with `InvalidArgument` when the token is neither.
    pub fn resolve_equivalent_categories(&self, token: &str) -> Result<BTreeSet<String>> {
        let mut resolved = BTreeSet::new();

        if self.is_archive(token) {
            for category in self.categories_in_archive(token) {
                resolved.insert(category.to_string());
                if let Some(alternate) = self.alternate_name(category) {
                    resolved.insert(alternate.to_string());
                }
            }
        } else if self.is_category(token) {
            resolved.insert(token.to_string());
            if let Some(alternate) = self.alternate_name(token) {
                resolved.insert(alternate.to_string());
            }
        } else {
            return Err(ListingError::InvalidArgument(format!(
                "unknown archive or category: {}",
                token
            )));
        }

        debug!(token, resolved = resolved.len(), "resolved equivalent categories");
        Ok(resolved)
    }
}

// ============================================================================
// TESTS
// ============================================================================
