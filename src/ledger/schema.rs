//! Schema-tolerant column resolution
//!
//! Partitions created at different times may carry drifted headers. Each
//! logical column is located by normalized-synonym lookup first, canonical
//! position second. A partition whose date or amount column cannot be
//! resolved by either method fails closed: its rows contribute nothing to a
//! read.

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

use crate::classifier::fold;
use crate::models::{Category, Transaction, SELF_PAYEE};

/// Canonical header row, written when a partition is created. Read-side
/// resolution tolerates reordering; write-side creation must not.
pub const CANONICAL_HEADER: [&str; 7] = [
    "ID",
    "Ngày",
    "Giờ",
    "Người",
    "Danh mục",
    "Số tiền",
    "Mô tả",
];

/// Logical columns of a partition row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Date,
    Time,
    Payee,
    Category,
    Amount,
    Description,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Id,
        Column::Date,
        Column::Time,
        Column::Payee,
        Column::Category,
        Column::Amount,
        Column::Description,
    ];

    /// Position in the canonical layout, used as the fallback.
    pub fn canonical_index(&self) -> usize {
        match self {
            Column::Id => 0,
            Column::Date => 1,
            Column::Time => 2,
            Column::Payee => 3,
            Column::Category => 4,
            Column::Amount => 5,
            Column::Description => 6,
        }
    }

    /// Accepted header spellings, pre-folded (lowercase, no diacritics).
    fn synonyms(&self) -> &'static [&'static str] {
        match self {
            Column::Id => &["id", "ma"],
            Column::Date => &["ngay", "date"],
            Column::Time => &["gio", "time"],
            Column::Payee => &["nguoi", "payee", "ai"],
            Column::Category => &["danh muc", "category"],
            Column::Amount => &["so tien", "amount", "tien"],
            Column::Description => &["mo ta", "description", "noi dung", "ghi chu"],
        }
    }
}

/// Resolved physical index per logical column for one partition.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    indices: [Option<usize>; 7],
}

impl ColumnMap {
    /// Resolve every logical column against a header row. Returns `None`
    /// when date or amount stay unresolved — the caller must then drop the
    /// whole partition from the read.
    pub fn resolve(header: &[String]) -> Option<ColumnMap> {
        let folded: Vec<String> = header.iter().map(|cell| fold(cell.trim())).collect();

        let mut indices = [None; 7];
        for column in Column::ALL {
            let by_name = folded
                .iter()
                .position(|cell| column.synonyms().contains(&cell.as_str()));
            let index = by_name.or_else(|| {
                let fallback = column.canonical_index();
                (fallback < header.len()).then_some(fallback)
            });
            indices[column.canonical_index()] = index;
        }

        let map = ColumnMap { indices };
        if map.get(Column::Date).is_none() || map.get(Column::Amount).is_none() {
            warn!(?header, "date/amount column unresolvable, failing closed");
            return None;
        }
        Some(map)
    }

    pub fn get(&self, column: Column) -> Option<usize> {
        self.indices[column.canonical_index()]
    }

    fn cell<'a>(&self, row: &'a [String], column: Column) -> Option<&'a str> {
        self.get(column)
            .and_then(|idx| row.get(idx))
            .map(|s| s.as_str())
    }

    /// Materialize a raw row. `None` only when the date cell does not parse
    /// — such rows are excluded from reads, never defaulted to "now".
    pub fn row_to_transaction(&self, row: &[String]) -> Option<Transaction> {
        let date = parse_row_date(self.cell(row, Column::Date)?)?;

        Some(Transaction {
            id: self
                .cell(row, Column::Id)
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(0),
            date,
            time: self
                .cell(row, Column::Time)
                .and_then(|raw| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S").ok())
                .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is valid")),
            payee: match self.cell(row, Column::Payee) {
                Some(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
                _ => SELF_PAYEE.to_string(),
            },
            category: self
                .cell(row, Column::Category)
                .map(parse_row_category)
                .unwrap_or(Category::Khac),
            amount: self
                .cell(row, Column::Amount)
                .map(parse_row_amount)
                .unwrap_or(0),
            description: self
                .cell(row, Column::Description)
                .unwrap_or("")
                .trim()
                .to_string(),
        })
    }
}

/// Parse a stored date: unambiguous year-first format, then day-first.
pub fn parse_row_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

/// Parse a stored amount by stripping every non-digit character.
///
/// Total failure yields 0 instead of dropping the row: a corrupt amount may
/// still sit next to a valid date and description worth surfacing.
pub fn parse_row_amount(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Map a stored category label back to the fixed set, falling back to
/// "Khác" so every row stays resolvable to a cash-flow group.
pub fn parse_row_category(raw: &str) -> Category {
    let folded = fold(raw.trim());
    Category::all()
        .iter()
        .copied()
        .find(|category| fold(category.label()) == folded)
        .unwrap_or(Category::Khac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_canonical_header() {
        let map = ColumnMap::resolve(&header(&CANONICAL_HEADER)).unwrap();
        for column in Column::ALL {
            assert_eq!(map.get(column), Some(column.canonical_index()));
        }
    }

    #[test]
    fn test_resolve_reordered_english_header() {
        let map = ColumnMap::resolve(&header(&[
            "Date",
            "Amount",
            "Description",
            "Category",
            "Payee",
            "Time",
            "ID",
        ]))
        .unwrap();
        assert_eq!(map.get(Column::Date), Some(0));
        assert_eq!(map.get(Column::Amount), Some(1));
        assert_eq!(map.get(Column::Id), Some(6));
    }

    #[test]
    fn test_positional_fallback_for_unknown_names() {
        // No synonym matches, but the header is wide enough for every
        // canonical position.
        let map = ColumnMap::resolve(&header(&["a", "b", "c", "d", "e", "f", "g"])).unwrap();
        assert_eq!(map.get(Column::Amount), Some(5));
        assert_eq!(map.get(Column::Description), Some(6));
    }

    #[test]
    fn test_fails_closed_without_amount_column() {
        // Two columns, no recognizable names: amount cannot be resolved by
        // name or position.
        assert!(ColumnMap::resolve(&header(&["x", "y"])).is_none());
    }

    #[test]
    fn test_diacritic_tolerant_header_match() {
        let map = ColumnMap::resolve(&header(&["id", "NGAY", "gio", "nguoi", "DANH MUC", "so tien", "mo ta"]))
            .unwrap();
        assert_eq!(map.get(Column::Date), Some(1));
        assert_eq!(map.get(Column::Category), Some(4));
    }

    #[test]
    fn test_row_date_formats() {
        assert_eq!(
            parse_row_date("2024-03-02"),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
        assert_eq!(
            parse_row_date("02/03/2024"),
            NaiveDate::from_ymd_opt(2024, 3, 2)
        );
        assert_eq!(parse_row_date("03-02-2024"), None);
        assert_eq!(parse_row_date("hôm nay"), None);
    }

    #[test]
    fn test_amount_strips_formatting() {
        assert_eq!(parse_row_amount("50,000 đ"), 50_000);
        assert_eq!(parse_row_amount("100000"), 100_000);
        assert_eq!(parse_row_amount("n/a"), 0);
        assert_eq!(parse_row_amount(""), 0);
    }

    #[test]
    fn test_unparsable_date_drops_row() {
        let map = ColumnMap::resolve(&header(&CANONICAL_HEADER)).unwrap();
        let row: Vec<String> = ["123", "???", "09:00:00", "Bản thân", "Khác", "50", "x"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(map.row_to_transaction(&row).is_none());
    }

    #[test]
    fn test_row_roundtrip_with_drifted_category() {
        let map = ColumnMap::resolve(&header(&CANONICAL_HEADER)).unwrap();
        let row: Vec<String> = [
            "1709345000000",
            "02/03/2024",
            "12:30:00",
            "vợ",
            "an uong", // drifted spelling, still resolvable
            "100.000 đ",
            "cơm",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let tx = map.row_to_transaction(&row).unwrap();
        assert_eq!(tx.id, 1709345000000);
        assert_eq!(tx.category, Category::AnUong);
        assert_eq!(tx.amount, 100_000);
        assert_eq!(tx.payee, "vợ");
    }
}
