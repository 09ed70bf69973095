// 📊 Yearly Count Aggregator
//
// Per-month new/cross totals for an archive over one year. Categories are
// matched on the flat categories string: a prefix match is a new listing,
// a match after a space is a cross-listing.

use crate::era::{EraDispatch, IdFormat};
use crate::error::{ListingError, Result};
use crate::listing::YearCount;
use crate::query::ListingEngine;
use crate::store::{ListingStore, MonthTally};
use tracing::{debug, warn};

/// Token used for string matching; "math" would also match "math-ph"
pub fn canonical_archive_token(archive: &str) -> String {
    if archive == "math" {
        format!("{}.", archive)
    } else {
        archive.to_string()
    }
}

/// Fold raw monthly tallies into twelve months plus totals
pub fn process_yearly_counts(tallies: &[MonthTally], year: i32) -> Result<YearCount> {
    let mut counts = YearCount::empty(year);

    for tally in tallies {
        let month: u32 = tally.month.parse().map_err(|_| {
            ListingError::Data(format!("unparseable month {:?} in paper ids for {}", tally.month, year))
        })?;

        if !(1..=12).contains(&month) {
            warn!(month, year, "skipping tally for out-of-range month");
            continue;
        }

        let entry = &mut counts.by_month[(month - 1) as usize];
        entry.new = tally.count_new;
        entry.cross = tally.count_cross;
        counts.new_count += tally.count_new;
        counts.cross_count += tally.count_cross;
    }

    Ok(counts)
}

impl<S: ListingStore> ListingEngine<S> {
    fn count_for_format(&self, token: &str, year: i32, format: IdFormat) -> Result<YearCount> {
        let tallies = self.store().count_by_category_and_era(token, year, format)?;
        process_yearly_counts(&tallies, year)
    }

    /// Monthly new/cross counts for an archive in `year`
    ///
    /// 2007 contains both id formats, so both are counted and summed.
    pub fn get_yearly_counts(&self, archive: &str, year: i32) -> Result<YearCount> {
        let token = canonical_archive_token(archive);

        let counts = match EraDispatch::for_year(year) {
            EraDispatch::NewEraOnly => self.count_for_format(&token, year, IdFormat::New)?,
            EraDispatch::OldEraOnly => self.count_for_format(&token, year, IdFormat::Old)?,
            EraDispatch::BoundaryMerge => {
                let new_ids = self.count_for_format(&token, year, IdFormat::New)?;
                let old_ids = self.count_for_format(&token, year, IdFormat::Old)?;
                new_ids.combine(&old_ids)
            }
        };

        debug!(archive, year, new = counts.new_count, cross = counts.cross_count, "yearly counts");
        Ok(counts)
    }
}
