//! Core data models for the expense ledger bot

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Sentinel payee used when a message carries no `@person` tag.
pub const SELF_PAYEE: &str = "Bản thân";

//
// ================= Categories =================
//

/// Cash-flow direction, derived from category membership. Never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CashFlow {
    Income,
    Expense,
}

/// Fixed category set. Income-group categories come first; `Khac` is the
/// fallback when no keyword matches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    // Income group
    Luong,
    Thuong,
    // Expense group
    AnUong,
    XangXe,
    MuaSam,
    GiaiTri,
    GiaoDuc,
    SucKhoe,
    NhaCua,
    Khac,
}

impl Category {
    /// Label as written into the ledger (and shown to the user).
    pub fn label(&self) -> &'static str {
        match self {
            Category::Luong => "Lương",
            Category::Thuong => "Thưởng",
            Category::AnUong => "Ăn uống",
            Category::XangXe => "Xăng xe",
            Category::MuaSam => "Mua sắm",
            Category::GiaiTri => "Giải trí",
            Category::GiaoDuc => "Giáo dục",
            Category::SucKhoe => "Sức khỏe",
            Category::NhaCua => "Nhà cửa",
            Category::Khac => "Khác",
        }
    }

    pub fn cash_flow(&self) -> CashFlow {
        match self {
            Category::Luong | Category::Thuong => CashFlow::Income,
            _ => CashFlow::Expense,
        }
    }

    /// All categories, income group first.
    pub fn all() -> &'static [Category] {
        &[
            Category::Luong,
            Category::Thuong,
            Category::AnUong,
            Category::XangXe,
            Category::MuaSam,
            Category::GiaiTri,
            Category::GiaoDuc,
            Category::SucKhoe,
            Category::NhaCua,
            Category::Khac,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

//
// ================= Transaction =================
//

/// The atomic ledger record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Creation wall-clock in Unix milliseconds. Unique across the whole
    /// ledger and the sole external handle for edit/delete.
    pub id: i64,
    /// Calendar date the transaction is attributed to (may be backdated).
    pub date: NaiveDate,
    /// Time-of-day of creation, informational only.
    pub time: NaiveTime,
    pub payee: String,
    pub category: Category,
    /// Whole currency units, always non-negative; sign is derived from
    /// `category.cash_flow()`.
    pub amount: i64,
    pub description: String,
}

impl Transaction {
    /// Amount signed by category group: positive for income, negative
    /// otherwise.
    pub fn signed_amount(&self) -> i64 {
        match self.category.cash_flow() {
            CashFlow::Income => self.amount,
            CashFlow::Expense => -self.amount,
        }
    }
}

/// Parser output: a transaction before classification and id assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftTransaction {
    pub amount: i64,
    pub description: String,
    pub payee: String,
    /// Target date, already resolved against the delivery time.
    pub date: NaiveDate,
}

//
// ================= Partitions =================
//

/// Key of a monthly partition. The home partition of a transaction is
/// determined by its `date`, not by when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Partition title. `YYYY-MM` sorts lexicographically in chronological
    /// order, which the query layer relies on.
    pub fn title(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn parse_title(title: &str) -> Option<Self> {
        let (y, m) = title.split_once('-')?;
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    /// First and last calendar day of this month.
    pub fn date_range(&self) -> DateRange {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("month key holds a valid month");
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        }
        .expect("month key holds a valid month");
        DateRange {
            start,
            end: next.pred_opt().expect("first of month has a predecessor"),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether any day of `key`'s month falls inside this range.
    pub fn overlaps_month(&self, key: MonthKey) -> bool {
        let month = key.date_range();
        self.start <= month.end && month.start <= self.end
    }
}

//
// ================= Summaries =================
//

/// Per-category totals for one calendar month. Absent entirely (`None` from
/// `monthly_summary`) when the filtered set is empty — distinct from a
/// summary with all-zero categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthlySummary {
    pub month: u32,
    pub year: i32,
    pub payee: Option<String>,
    pub categories: Vec<(Category, i64)>,
    pub total: i64,
}

//
// ================= Chat I/O =================
//

/// Inbound chat event, as delivered by the (external) transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Unique per delivery attempt; re-delivery of a seen id is a no-op.
    pub event_id: Uuid,
    pub user_id: i64,
    pub text: String,
    /// Local wall-clock time of delivery.
    pub timestamp: NaiveDateTime,
}

/// Input for the stats chart renderer (an external collaborator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartSpec {
    pub title: String,
    pub slices: Vec<(String, i64)>,
}

/// Reply keyed to the triggering event. Rendering and file delivery are
/// handled by external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundReply {
    pub text: String,
    pub chart: Option<ChartSpec>,
    /// Raw current-month rows for the export command.
    pub export: Option<Vec<Vec<String>>>,
}

impl OutboundReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chart: None,
            export: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amount_follows_category_group() {
        let mut tx = Transaction {
            id: 1,
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            payee: SELF_PAYEE.to_string(),
            category: Category::AnUong,
            amount: 100_000,
            description: "cơm".to_string(),
        };
        assert_eq!(tx.signed_amount(), -100_000);

        tx.category = Category::Luong;
        assert_eq!(tx.signed_amount(), 100_000);
    }

    #[test]
    fn test_month_key_titles_sort_chronologically() {
        let a = MonthKey {
            year: 2023,
            month: 12,
        };
        let b = MonthKey {
            year: 2024,
            month: 2,
        };
        assert!(a.title() < b.title());
        assert_eq!(MonthKey::parse_title("2024-02"), Some(b));
        assert_eq!(MonthKey::parse_title("Tổng hợp"), None);
    }

    #[test]
    fn test_month_range_covers_whole_month() {
        let key = MonthKey {
            year: 2024,
            month: 2,
        };
        let range = key.date_range();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        // 2024 is a leap year
        assert_eq!(range.end, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(range.overlaps_month(key));
        assert!(!range.overlaps_month(MonthKey {
            year: 2024,
            month: 3
        }));
    }
}
