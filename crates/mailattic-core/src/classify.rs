//! Effective-date classification.
//!
//! An item is filed by when it was sent; items that never carried a send
//! date (drafts, some imports) fall back to when they were received.
//! Items with neither date cannot be classified and are left alone by
//! every operation.

use chrono::{Datelike, NaiveDateTime};

use crate::provider::MailItem;

/// The date an item is classified by: send date, else receive date.
#[must_use]
pub fn effective_date(item: &dyn MailItem) -> Option<NaiveDateTime> {
    item.sent_at().or_else(|| item.received_at())
}

/// The calendar year an item belongs to, if it can be classified.
#[must_use]
pub fn effective_year(item: &dyn MailItem) -> Option<i32> {
    effective_date(item).map(|date| date.year())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::provider::{MailFolder, ProviderResult};

    struct StubItem {
        sent: Option<NaiveDateTime>,
        received: Option<NaiveDateTime>,
    }

    impl MailItem for StubItem {
        fn sent_at(&self) -> Option<NaiveDateTime> {
            self.sent
        }

        fn received_at(&self) -> Option<NaiveDateTime> {
            self.received
        }

        fn subject(&self) -> String {
            String::new()
        }

        fn move_to(&self, _destination: &dyn MailFolder) -> ProviderResult<()> {
            Ok(())
        }
    }

    fn at(year: i32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, 6, 15).and_then(|d| d.and_hms_opt(12, 0, 0))
    }

    #[test]
    fn send_date_wins_over_receive_date() {
        let item = StubItem { sent: at(2023), received: at(2024) };
        assert_eq!(effective_year(&item), Some(2023));
    }

    #[test]
    fn receive_date_fills_in_for_undated_sends() {
        let item = StubItem { sent: None, received: at(2024) };
        assert_eq!(effective_year(&item), Some(2024));
    }

    #[test]
    fn undatable_items_have_no_year() {
        let item = StubItem { sent: None, received: None };
        assert_eq!(effective_year(&item), None);
    }
}
