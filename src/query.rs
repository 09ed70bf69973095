// 🔎 Listing Query Builder
//
// Resolve categories → select by id era → max(is_primary) per document →
// join current metadata → order primary-first by paper id → paginate.

use crate::era::EraPredicate;
use crate::error::{ListingError, Result};
use crate::expiry::ExpiryPolicy;
use crate::listing::{to_listing_items, Listing};
use crate::store::ListingStore;
use crate::taxonomy::Taxonomy;
use chrono::NaiveDate;
use tracing::debug;

// ============================================================================
// LISTING ENGINE
// ============================================================================

/// Read-only listing queries over a metadata store
pub struct ListingEngine<S> {
    taxonomy: Taxonomy,
    store: S,
    expiry: ExpiryPolicy,
}

impl<S: ListingStore> ListingEngine<S> {
    pub fn new(taxonomy: Taxonomy, store: S, expiry: ExpiryPolicy) -> Self {
        ListingEngine {
            taxonomy,
            store,
            expiry,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Listing of an archive or category for one month, or a whole year
    /// when `month` is None
    ///
    /// `count` in the result is the total number of matching papers;
    /// `skip`/`show` only bound the returned page.
    pub fn get_articles_for_period(
        &self,
        archive_or_category: &str,
        year: i32,
        month: Option<u32>,
        skip: usize,
        show: usize,
    ) -> Result<Listing> {
        let categories = self.taxonomy.resolve_equivalent_categories(archive_or_category)?;

        // Yearly listings display January
        let pubdate = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), 1).ok_or_else(|| {
            ListingError::InvalidArgument(format!("invalid period: year {} month {:?}", year, month))
        })?;

        let era = EraPredicate::new(year, month);
        let rows = self.store.find_listing_rows(&categories, &era, skip, show)?;
        let count = self.store.count_listing_rows(&categories, &era)?;

        let (new_listings, cross_listings) = to_listing_items(&rows);
        debug!(
            archive_or_category,
            year,
            ?month,
            new = new_listings.len(),
            cross = cross_listings.len(),
            count,
            "listing assembled"
        );

        let mut listings = new_listings;
        listings.extend(cross_listings);

        Ok(Listing {
            listings,
            pubdates: vec![(pubdate, 1)],
            count,
            expires: self.expiry.gen_expires(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
