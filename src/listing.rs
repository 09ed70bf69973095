// 📰 Listing types and the Listing Item Assembler
//
// Listing items are ephemeral views built per query; nothing here is
// persisted.

use crate::store::MetadataRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// ARTICLE VIEW
// ============================================================================

/// Raw author string as stored in metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorList(pub String);

/// Source-format flags of a version (e.g., "D" for pdflatex, "1" for single file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlag {
    pub code: String,
}

impl SourceFlag {
    pub fn new(code: Option<String>) -> Self {
        SourceFlag {
            code: code.unwrap_or_default(),
        }
    }

    pub fn has(&self, flag: char) -> bool {
        self.code.contains(flag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: i64,
    pub raw: String,
    /// Not needed by listing views; always None there
    pub submitted_date: Option<DateTime<Utc>>,
    pub size_kilobytes: i64,
    pub source_flag: SourceFlag,
}

/// Article metadata trimmed to what a listing page displays
///
/// Submission dates and the submitter are intentionally left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub arxiv_id: String,
    pub arxiv_id_v: String,
    pub title: String,
    pub authors: AuthorList,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub categories: String,
    pub primary_category: String,
    pub secondary_categories: Vec<String>,
    pub comments: Option<String>,
    pub journal_ref: Option<String>,
    pub version: i64,
    pub version_history: Vec<VersionEntry>,
    pub submitter: Option<String>,
}

// ============================================================================
// LISTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    /// Primary in the requested categories
    New,
    /// Secondary only
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingItem {
    pub id: String,
    #[serde(rename = "listingType")]
    pub listing_type: ListingType,
    pub primary: String,
    pub article: ArticleMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// New items first, then cross-lists
    pub listings: Vec<ListingItem>,
    /// Display month only; yearly listings use January
    pub pubdates: Vec<(NaiveDate, u32)>,
    /// Total matching rows, independent of skip/show
    pub count: usize,
    pub expires: DateTime<Utc>,
}

// ============================================================================
// YEARLY COUNTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub year: i32,
    pub month: u32,
    pub new: i64,
    pub cross: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearCount {
    pub year: i32,
    pub new_count: i64,
    pub cross_count: i64,
    pub by_month: Vec<MonthCount>,
}

impl YearCount {
    /// Twelve zeroed months
    pub fn empty(year: i32) -> Self {
        YearCount {
            year,
            new_count: 0,
            cross_count: 0,
            by_month: (1..=12)
                .map(|month| MonthCount { year, month, new: 0, cross: 0 })
                .collect(),
        }
    }

    /// Element-wise sum of two years; the result carries `self.year`
    pub fn combine(&self, other: &YearCount) -> YearCount {
        let by_month: Vec<MonthCount> = self
            .by_month
            .iter()
            .zip(other.by_month.iter())
            .map(|(a, b)| MonthCount {
                year: self.year,
                month: a.month,
                new: a.new + b.new,
                cross: a.cross + b.cross,
            })
            .collect();

        YearCount {
            year: self.year,
            new_count: by_month.iter().map(|m| m.new).sum(),
            cross_count: by_month.iter().map(|m| m.cross).sum(),
            by_month,
        }
    }
}

// ============================================================================
// ITEM ASSEMBLER
// ============================================================================

fn article_view(meta: &MetadataRecord) -> ArticleMetadata {
    let mut tokens = meta.abs_categories.split_whitespace().map(str::to_string);
    let primary_category = tokens.next().unwrap_or_default();
    let secondary_categories: Vec<String> = tokens.collect();

    ArticleMetadata {
        arxiv_id: meta.paper_id.clone(),
        arxiv_id_v: format!("{}v{}", meta.paper_id, meta.version),
        title: meta.title.clone(),
        authors: AuthorList(meta.authors.clone()),
        abstract_text: meta.abstract_text.clone(),
        categories: meta.abs_categories.clone(),
        primary_category,
        secondary_categories,
        comments: meta.comments.clone(),
        journal_ref: meta.journal_ref.clone(),
        version: meta.version,
        version_history: vec![VersionEntry {
            version: meta.version,
            raw: String::new(),
            submitted_date: None,
            size_kilobytes: meta.source_size,
            source_flag: SourceFlag::new(meta.source_flags.clone()),
        }],
        submitter: None,
    }
}

/// Split rows into (new, cross) items, preserving input order in each
///
/// The flag is whether any requested category is the document's primary.
/// Callers concatenate new before cross.
pub fn to_listing_items(rows: &[(MetadataRecord, bool)]) -> (Vec<ListingItem>, Vec<ListingItem>) {
    let mut new_listings = Vec::new();
    let mut cross_listings = Vec::new();

    for (meta, is_primary) in rows {
        let article = article_view(meta);
        let item = ListingItem {
            id: meta.paper_id.clone(),
            listing_type: if *is_primary { ListingType::New } else { ListingType::Cross },
            primary: article.primary_category.clone(),
            article,
        };

        if *is_primary {
            new_listings.push(item);
        } else {
            cross_listings.push(item);
        }
    }

    (new_listings, cross_listings)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(paper_id: &str, categories: &str) -> MetadataRecord {
        MetadataRecord {
            paper_id: paper_id.to_string(),
            version: 2,
            title: format!("Title of {}", paper_id),
            authors: "A. Author, B. Author".to_string(),
            abstract_text: "Abstract".to_string(),
            abs_categories: categories.to_string(),
            comments: Some("10 pages".to_string()),
            journal_ref: None,
            source_size: 120,
            source_flags: Some("D".to_string()),
        }
    }

    #[test]
    fn test_partition_preserves_order() {
        let rows = vec![
            (record("0903.0001", "cs.AI cs.LG"), true),
            (record("0903.0002", "cs.LG cs.AI"), false),
            (record("0903.0003", "cs.AI"), true),
            (record("0903.0004", "stat.ML cs.AI"), false),
        ];

        let (new, cross) = to_listing_items(&rows);

        let new_ids: Vec<&str> = new.iter().map(|i| i.id.as_str()).collect();
        let cross_ids: Vec<&str> = cross.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(new_ids, vec!["0903.0001", "0903.0003"]);
        assert_eq!(cross_ids, vec!["0903.0002", "0903.0004"]);

        assert!(new.iter().all(|i| i.listing_type == ListingType::New));
        assert!(cross.iter().all(|i| i.listing_type == ListingType::Cross));
    }

    #[test]
    fn test_article_view() {
        let rows = vec![(record("0903.0002", "cs.LG cs.AI stat.ML"), false)];
        let (_, cross) = to_listing_items(&rows);
        let item = &cross[0];

        assert_eq!(item.primary, "cs.LG");
        assert_eq!(item.article.arxiv_id_v, "0903.0002v2");
        assert_eq!(item.article.secondary_categories, vec!["cs.AI", "stat.ML"]);
        assert_eq!(item.article.version_history.len(), 1);
        assert_eq!(item.article.version_history[0].size_kilobytes, 120);
        assert!(item.article.version_history[0].source_flag.has('D'));
        assert!(item.article.version_history[0].submitted_date.is_none());
        assert!(item.article.submitter.is_none());
    }

    #[test]
    fn test_listing_type_serializes_lowercase() {
        let json = serde_json::to_string(&ListingType::Cross).unwrap();
        assert_eq!(json, "\"cross\"");
    }

    #[test]
    fn test_combine_sums_months() {
        let mut a = YearCount::empty(2007);
        let mut b = YearCount::empty(2007);
        a.by_month[0].new = 3;
        a.by_month[4].cross = 2;
        b.by_month[0].new = 1;
        b.by_month[11].cross = 5;

        let merged = a.combine(&b);

        assert_eq!(merged.year, 2007);
        assert_eq!(merged.by_month[0].new, 4);
        assert_eq!(merged.by_month[4].cross, 2);
        assert_eq!(merged.by_month[11].cross, 5);
        assert_eq!(merged.new_count, 4);
        assert_eq!(merged.cross_count, 7);
        assert_eq!(merged.by_month.len(), 12);
    }
}
