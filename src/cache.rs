//! Daily cache
//!
//! Process-lifetime mirror of today's ingested transactions, so the
//! "what have I spent today" view never waits on the tabular service.
//! Populated only by the ingestion path; wiped (never repopulated) when the
//! wall-clock date rolls over. The owner guards it with a mutex — see the
//! dispatcher.

use chrono::NaiveDate;

use crate::models::{Category, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyEntry {
    /// Positive for income-group categories, negative otherwise.
    pub signed_amount: i64,
    pub description: String,
    pub category: Category,
}

#[derive(Debug)]
pub struct DailyCache {
    day: NaiveDate,
    entries: Vec<DailyEntry>,
}

impl DailyCache {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            day: today,
            entries: Vec::new(),
        }
    }

    fn roll(&mut self, today: NaiveDate) {
        if self.day != today {
            self.day = today;
            self.entries.clear();
        }
    }

    /// Mirror a freshly appended transaction. Backdated transactions are
    /// not today's and are ignored.
    pub fn record(&mut self, tx: &Transaction, today: NaiveDate) {
        self.roll(today);
        if tx.date != today {
            return;
        }
        self.entries.push(DailyEntry {
            signed_amount: tx.signed_amount(),
            description: tx.description.clone(),
            category: tx.category,
        });
    }

    /// Today's entries; resets first if the day has changed.
    pub fn entries(&mut self, today: NaiveDate) -> &[DailyEntry] {
        self.roll(today);
        &self.entries
    }

    pub fn is_empty(&mut self, today: NaiveDate) -> bool {
        self.entries(today).is_empty()
    }
}
