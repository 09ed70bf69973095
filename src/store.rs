// 🗄️ Metadata store - SQLite schema, import, and typed listing queries
//
// Tables:
//   documents          one row per paper id
//   document_category  (document_id, category, is_primary)
//   metadata           one row per version, exactly one flagged current
//
// The listing engine only talks to the store through `ListingStore`.

use crate::era::{year_prefix, EraPredicate, IdFormat};
use crate::error::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// ROW TYPES
// ============================================================================

/// Current-version metadata fields needed for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub paper_id: String,
    pub version: i64,
    pub title: String,
    pub authors: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Space-separated, primary first (e.g., "cs.AI cs.LG")
    pub abs_categories: String,
    pub comments: Option<String>,
    pub journal_ref: Option<String>,
    pub source_size: i64,
    pub source_flags: Option<String>,
}

/// One metadata version as it appears in an import CSV
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaperRow {
    pub paper_id: String,

    #[serde(default = "default_version")]
    pub version: i64,

    #[serde(default = "default_current")]
    pub is_current: bool,

    pub title: String,
    pub authors: String,

    #[serde(rename = "abstract", default)]
    pub abstract_text: String,

    pub categories: String,

    #[serde(default)]
    pub comments: Option<String>,

    #[serde(default)]
    pub journal_ref: Option<String>,

    #[serde(default)]
    pub source_size: i64,

    #[serde(default)]
    pub source_flags: Option<String>,
}

fn default_version() -> i64 {
    1
}

fn default_current() -> bool {
    true
}

/// Raw per-month tally from a yearly count query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTally {
    /// Two digits extracted from the paper id; not validated here
    pub month: String,
    pub count_new: i64,
    pub count_cross: i64,
}

// ============================================================================
// STORE SEAM
// ============================================================================

/// Typed read operations the listing engine needs from a metadata store
pub trait ListingStore {
    /// One row per matching document with its current metadata and whether
    /// any of `categories` is its primary, ordered primary-first then by
    /// paper id, after skipping `skip` and keeping at most `show`.
    fn find_listing_rows(
        &self,
        categories: &BTreeSet<String>,
        era: &EraPredicate,
        skip: usize,
        show: usize,
    ) -> Result<Vec<(MetadataRecord, bool)>>;

    /// Unpaginated size of the `find_listing_rows` result
    fn count_listing_rows(&self, categories: &BTreeSet<String>, era: &EraPredicate) -> Result<usize>;

    /// Distinct new/cross paper counts per id-encoded month for one id format
    fn count_by_category_and_era(&self, token: &str, year: i32, format: IdFormat) -> Result<Vec<MonthTally>>;
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for file-backed databases
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            document_id INTEGER PRIMARY KEY AUTOINCREMENT,
            paper_id TEXT UNIQUE NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS document_category (
            document_id INTEGER NOT NULL REFERENCES documents(document_id),
            category TEXT NOT NULL,
            is_primary INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (document_id, category)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS metadata (
            metadata_id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL REFERENCES documents(document_id),
            paper_id TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            is_current INTEGER NOT NULL DEFAULT 1,
            title TEXT NOT NULL,
            authors TEXT NOT NULL,
            abstract TEXT NOT NULL,
            abs_categories TEXT NOT NULL,
            comments TEXT,
            journal_ref TEXT,
            source_size INTEGER NOT NULL DEFAULT 0,
            source_flags TEXT,
            UNIQUE (paper_id, version)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_document_category_category ON document_category(category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_metadata_document ON metadata(document_id, is_current)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_metadata_paper_id ON metadata(paper_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// IMPORT
// ============================================================================

pub fn load_csv(csv_path: &Path) -> Result<Vec<PaperRow>> {
    let mut rdr = csv::Reader::from_path(csv_path)?;

    let mut papers = Vec::new();
    for result in rdr.deserialize() {
        let paper: PaperRow = result?;
        papers.push(paper);
    }

    debug!("loaded {} rows from {:?}", papers.len(), csv_path);
    Ok(papers)
}

fn ensure_document(conn: &Connection, paper_id: &str) -> Result<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO documents (paper_id) VALUES (?1)",
        params![paper_id],
    )?;

    let document_id = conn.query_row(
        "SELECT document_id FROM documents WHERE paper_id = ?1",
        params![paper_id],
        |row| row.get(0),
    )?;

    Ok(document_id)
}

/// Insert metadata versions; returns how many were new
///
/// A current row newer than the stored current version demotes it and
/// replaces the paper's category associations from its categories string
/// (first token primary). Re-importing an existing version is a no-op.
pub fn insert_papers(conn: &Connection, papers: &[PaperRow]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for paper in papers {
        let document_id = ensure_document(conn, &paper.paper_id)?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT metadata_id FROM metadata WHERE paper_id = ?1 AND version = ?2",
                params![paper.paper_id, paper.version],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            duplicates += 1;
            continue;
        }

        // An older version arriving after a newer one is history, never current
        let latest_current: Option<i64> = conn.query_row(
            "SELECT MAX(version) FROM metadata WHERE document_id = ?1 AND is_current = 1",
            params![document_id],
            |row| row.get(0),
        )?;
        let make_current = paper.is_current && latest_current.map_or(true, |v| paper.version > v);

        if make_current {
            conn.execute(
                "UPDATE metadata SET is_current = 0 WHERE document_id = ?1",
                params![document_id],
            )?;
        }

        conn.execute(
            "INSERT INTO metadata (
                document_id, paper_id, version, is_current, title, authors, abstract,
                abs_categories, comments, journal_ref, source_size, source_flags
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                document_id,
                paper.paper_id,
                paper.version,
                make_current,
                paper.title,
                paper.authors,
                paper.abstract_text,
                paper.categories,
                paper.comments,
                paper.journal_ref,
                paper.source_size,
                paper.source_flags,
            ],
        )?;

        if make_current {
            conn.execute(
                "DELETE FROM document_category WHERE document_id = ?1",
                params![document_id],
            )?;
            for (position, category) in paper.categories.split_whitespace().enumerate() {
                conn.execute(
                    "INSERT OR IGNORE INTO document_category (document_id, category, is_primary)
                     VALUES (?1, ?2, ?3)",
                    params![document_id, category, position == 0],
                )?;
            }
        }

        inserted += 1;
    }

    info!(inserted, duplicates, "imported metadata rows");
    Ok(inserted)
}

pub fn count_papers(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// LISTING QUERIES
// ============================================================================

/// Per-document max(is_primary) over the requested categories, restricted
/// to documents whose paper id falls in the era
fn primary_flag_subquery(categories: &BTreeSet<String>, era: &EraPredicate) -> (String, Vec<Value>) {
    let (era_sql, mut params) = era.sql_condition("d.paper_id");
    let placeholders = vec!["?"; categories.len()].join(", ");

    let sql = format!(
        "SELECT dc.document_id AS document_id, MAX(dc.is_primary) AS is_primary
         FROM document_category dc
         WHERE dc.document_id IN (SELECT d.document_id FROM documents d WHERE {})
           AND dc.category IN ({})
         GROUP BY dc.document_id",
        era_sql, placeholders
    );

    params.extend(categories.iter().map(|c| Value::Text(c.clone())));
    (sql, params)
}

fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<MetadataRecord> {
    Ok(MetadataRecord {
        paper_id: row.get(0)?,
        version: row.get(1)?,
        title: row.get(2)?,
        authors: row.get(3)?,
        abstract_text: row.get(4)?,
        abs_categories: row.get(5)?,
        comments: row.get(6)?,
        journal_ref: row.get(7)?,
        source_size: row.get(8)?,
        source_flags: row.get(9)?,
    })
}

/// Month digits of a new-style id (`YYMM.NNNNN`)
const NEW_ID_MONTH: &str = "substr(paper_id, 3, 2)";

/// Month digits of an old-style id (`archive/YYMMNNN`), read after the last `/`
///
/// `rtrim` with every non-slash character of the id strips back to the final slash.
const OLD_ID_MONTH: &str =
    "substr(substr(paper_id, length(rtrim(paper_id, replace(paper_id, '/', ''))) + 1), 3, 2)";

impl ListingStore for Connection {
    fn find_listing_rows(
        &self,
        categories: &BTreeSet<String>,
        era: &EraPredicate,
        skip: usize,
        show: usize,
    ) -> Result<Vec<(MetadataRecord, bool)>> {
        let (subquery, mut params) = primary_flag_subquery(categories, era);
        let sql = format!(
            "SELECT m.paper_id, m.version, m.title, m.authors, m.abstract, m.abs_categories,
                    m.comments, m.journal_ref, m.source_size, m.source_flags, cat.is_primary
             FROM ({}) AS cat
             JOIN metadata m ON m.document_id = cat.document_id
             WHERE m.is_current = 1
             ORDER BY cat.is_primary DESC, m.paper_id
             LIMIT ? OFFSET ?",
            subquery
        );
        params.push(Value::Integer(show as i64));
        params.push(Value::Integer(skip as i64));

        let mut stmt = self.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                let is_primary: i64 = row.get(10)?;
                Ok((metadata_from_row(row)?, is_primary == 1))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(rows = rows.len(), skip, show, "listing page fetched");
        Ok(rows)
    }

    fn count_listing_rows(&self, categories: &BTreeSet<String>, era: &EraPredicate) -> Result<usize> {
        let (subquery, params) = primary_flag_subquery(categories, era);
        let sql = format!(
            "SELECT COUNT(*)
             FROM ({}) AS cat
             JOIN metadata m ON m.document_id = cat.document_id
             WHERE m.is_current = 1",
            subquery
        );

        let count: i64 = self.query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(count as usize)
    }

    fn count_by_category_and_era(&self, token: &str, year: i32, format: IdFormat) -> Result<Vec<MonthTally>> {
        let (month_expr, era_filter) = match format {
            IdFormat::New => (NEW_ID_MONTH, "substr(paper_id, 1, 2) = ?2"),
            IdFormat::Old => (OLD_ID_MONTH, "instr(paper_id, '/' || ?2) > 0"),
        };

        // Primary when the categories string starts with the token, cross
        // when the token appears after a space
        let sql = format!(
            "SELECT {month} AS month,
                    COUNT(DISTINCT CASE
                        WHEN substr(abs_categories, 1, length(?1)) = ?1 THEN paper_id
                    END) AS count_new,
                    COUNT(DISTINCT CASE
                        WHEN substr(abs_categories, 1, length(?1)) = ?1 THEN NULL
                        WHEN instr(abs_categories, ' ' || ?1) > 0 THEN paper_id
                    END) AS count_cross
             FROM metadata
             WHERE is_current = 1 AND {filter}
             GROUP BY month
             ORDER BY month",
            month = month_expr,
            filter = era_filter
        );

        let mut stmt = self.prepare(&sql)?;
        let tallies = stmt
            .query_map(params![token, year_prefix(year)], |row| {
                Ok(MonthTally {
                    month: row.get(0)?,
                    count_new: row.get(1)?,
                    count_cross: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(token, year, ?format, months = tallies.len(), "yearly tallies fetched");
        Ok(tallies)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Helper to build an import row with the fields tests care about
    pub(crate) fn paper(paper_id: &str, categories: &str) -> PaperRow {
        PaperRow {
            paper_id: paper_id.to_string(),
            version: 1,
            is_current: true,
            title: format!("Paper {}", paper_id),
            authors: "Test Author".to_string(),
            abstract_text: "An abstract.".to_string(),
            categories: categories.to_string(),
            comments: None,
            journal_ref: None,
            source_size: 42,
            source_flags: None,
        }
    }

    pub(crate) fn store_with(papers: &[PaperRow]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        insert_papers(&conn, papers).unwrap();
        conn
    }

    fn cats(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_import_is_idempotent() {
        let papers = vec![paper("0903.0001", "cs.AI cs.LG"), paper("0903.0002", "cs.LG")];
        let conn = store_with(&papers);

        let inserted_again = insert_papers(&conn, &papers).unwrap();
        assert_eq!(inserted_again, 0);
        assert_eq!(count_papers(&conn).unwrap(), 2);
    }

    #[test]
    fn test_category_rows_derived_from_string() {
        let conn = store_with(&[paper("0903.0001", "cs.AI cs.LG stat.ML")]);

        let mut stmt = conn
            .prepare("SELECT category, is_primary FROM document_category ORDER BY category")
            .unwrap();
        let rows: Vec<(String, bool)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(
            rows,
            vec![
                ("cs.AI".to_string(), true),
                ("cs.LG".to_string(), false),
                ("stat.ML".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_new_version_replaces_current() {
        let mut v2 = paper("0903.0001", "cs.LG cs.AI");
        v2.version = 2;
        v2.title = "Revised".to_string();
        let conn = store_with(&[paper("0903.0001", "cs.AI"), v2]);

        let rows = conn
            .find_listing_rows(&cats(&["cs.AI"]), &EraPredicate::new(2009, Some(3)), 0, 10)
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.title, "Revised");
        assert_eq!(rows[0].0.version, 2);
        // cs.AI is secondary in the current version
        assert!(!rows[0].1);
    }

    #[test]
    fn test_older_version_imported_later_stays_history() {
        let mut v2 = paper("0903.0001", "cs.LG cs.AI");
        v2.version = 2;
        v2.title = "Revised".to_string();
        let conn = store_with(&[v2, paper("0903.0001", "cs.AI")]);

        let rows = conn
            .find_listing_rows(&cats(&["cs.AI"]), &EraPredicate::new(2009, Some(3)), 0, 10)
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.version, 2);
        assert_eq!(rows[0].0.title, "Revised");
        // Category rows still come from v2, where cs.AI is secondary
        assert!(!rows[0].1);

        let current: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM metadata WHERE paper_id = '0903.0001' AND is_current = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(current, 1);
    }

    #[test]
    fn test_document_without_current_metadata_is_excluded() {
        let mut stale = paper("0903.0005", "cs.AI");
        stale.is_current = false;
        let conn = store_with(&[paper("0903.0001", "cs.AI")]);
        insert_papers(&conn, &[stale]).unwrap();
        // Category rows for 0903.0005 exist only if a current row created them
        conn.execute(
            "INSERT INTO document_category (document_id, category, is_primary)
             SELECT document_id, 'cs.AI', 1 FROM documents WHERE paper_id = '0903.0005'",
            [],
        )
        .unwrap();

        let era = EraPredicate::new(2009, Some(3));
        let rows = conn.find_listing_rows(&cats(&["cs.AI"]), &era, 0, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0.paper_id, "0903.0001");
        assert_eq!(conn.count_listing_rows(&cats(&["cs.AI"]), &era).unwrap(), 1);
    }

    #[test]
    fn test_any_primary_across_equivalent_categories() {
        // Primary under the old name, secondary under the new one
        let conn = store_with(&[paper("0903.0001", "math.MP math-ph")]);

        let rows = conn
            .find_listing_rows(&cats(&["math-ph", "math.MP"]), &EraPredicate::new(2009, Some(3)), 0, 10)
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert!(rows[0].1);
    }

    #[test]
    fn test_ordering_and_pagination() {
        let conn = store_with(&[
            paper("0903.0004", "cs.LG cs.AI"),
            paper("0903.0003", "cs.AI"),
            paper("0903.0002", "stat.ML cs.AI"),
            paper("0903.0001", "cs.AI cs.LG"),
            paper("0904.0001", "cs.AI"),
        ]);
        let era = EraPredicate::new(2009, Some(3));
        let categories = cats(&["cs.AI"]);

        let all = conn.find_listing_rows(&categories, &era, 0, 100).unwrap();
        let ids: Vec<(&str, bool)> = all.iter().map(|(m, p)| (m.paper_id.as_str(), *p)).collect();
        assert_eq!(
            ids,
            vec![
                ("0903.0001", true),
                ("0903.0003", true),
                ("0903.0002", false),
                ("0903.0004", false),
            ]
        );

        let page = conn.find_listing_rows(&categories, &era, 1, 2).unwrap();
        let page_ids: Vec<&str> = page.iter().map(|(m, _)| m.paper_id.as_str()).collect();
        assert_eq!(page_ids, vec!["0903.0003", "0903.0002"]);

        assert_eq!(conn.count_listing_rows(&categories, &era).unwrap(), 4);
    }

    #[test]
    fn test_count_by_category_new_ids() {
        let conn = store_with(&[
            paper("0901.0001", "math.GT"),
            paper("0901.0002", "math.AG math.GT"),
            paper("0903.0001", "cs.AI math.CO"),
            paper("0903.0002", "math-ph"),
            paper("1001.0001", "math.GT"),
        ]);

        let tallies = conn.count_by_category_and_era("math.", 2009, IdFormat::New).unwrap();
        let by_month: Vec<(&str, i64, i64)> = tallies
            .iter()
            .map(|t| (t.month.as_str(), t.count_new, t.count_cross))
            .collect();

        assert_eq!(by_month, vec![("01", 2, 0), ("03", 0, 1)]);
    }

    #[test]
    fn test_count_by_category_old_ids() {
        let conn = store_with(&[
            paper("math/0605001", "math.AG"),
            paper("math/0605002", "math.AG"),
            paper("hep-th/0611001", "hep-th math.AG"),
            paper("math/0501001", "math.AG"),
        ]);

        let tallies = conn.count_by_category_and_era("math.", 2006, IdFormat::Old).unwrap();
        let by_month: Vec<(&str, i64, i64)> = tallies
            .iter()
            .map(|t| (t.month.as_str(), t.count_new, t.count_cross))
            .collect();

        assert_eq!(by_month, vec![("05", 2, 0), ("11", 0, 1)]);
    }

    #[test]
    fn test_old_id_month_read_after_last_slash() {
        let conn = store_with(&[paper("math/x/0611001", "math.AG")]);

        let tallies = conn.count_by_category_and_era("math.", 2006, IdFormat::Old).unwrap();

        assert_eq!(tallies.len(), 1);
        assert_eq!(tallies[0].month, "11");
        assert_eq!(tallies[0].count_new, 1);
    }
}
