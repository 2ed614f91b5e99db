//! Calendar access behind a trait so year-bound logic stays testable.

use chrono::{Datelike, Local, NaiveDate};

/// Supplies the current calendar date.
pub trait Today: Send + Sync {
    /// Today's date in local time.
    fn today(&self) -> NaiveDate;

    /// The current calendar year.
    fn year(&self) -> i32 {
        self.today().year()
    }
}

/// Calendar backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemToday;

impl Today for SystemToday {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Calendar pinned to a fixed date.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use mailattic_core::clock::{FixedToday, Today};
///
/// let clock = FixedToday::new(NaiveDate::from_ymd_opt(2026, 8, 26).unwrap());
/// assert_eq!(clock.year(), 2026);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedToday(NaiveDate);

impl FixedToday {
    /// Pins the calendar to `date`.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Today for FixedToday {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
