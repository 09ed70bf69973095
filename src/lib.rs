// Paper Listings - Core Library
// Listing queries and yearly counts over a paper metadata store, used by
// the CLI and the API server

pub mod config;
pub mod counts;
pub mod era;
pub mod error;
pub mod expiry;
pub mod listing;
pub mod query;
pub mod store;
pub mod taxonomy;

// Re-export commonly used types
pub use config::Config;
pub use counts::{canonical_archive_token, process_yearly_counts};
pub use era::{EraDispatch, EraPredicate, IdFormat, BOUNDARY_YEAR};
pub use error::{ListingError, Result};
pub use expiry::ExpiryPolicy;
pub use listing::{
    to_listing_items, ArticleMetadata, AuthorList, Listing, ListingItem, ListingType,
    MonthCount, SourceFlag, VersionEntry, YearCount,
};
pub use query::ListingEngine;
pub use store::{
    count_papers, insert_papers, load_csv, setup_database,
    ListingStore, MetadataRecord, MonthTally, PaperRow,
};
pub use taxonomy::{ArchiveDef, CategoryDef, Taxonomy};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
