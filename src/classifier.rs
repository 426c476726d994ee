//! Keyword-based category classifier
//!
//! Maps a free-text description to exactly one [`Category`]. The income
//! group is checked before the expense group, and within each group the
//! first whole-word keyword match wins. Matching is case- and
//! diacritic-insensitive, so "com", "cơm" and "CƠM" all hit "Ăn uống".
//!
//! Classification is a pure function of the description and the static
//! keyword table: same input, same output, no state.

use crate::models::Category;

/// Income-group keyword table — checked first
const INCOME_KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Luong, &["lương", "tiền lương"]),
    (Category::Thuong, &["thưởng", "lì xì"]),
];

/// Expense-group keyword table — checked second
const EXPENSE_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::AnUong,
        &[
            "cơm", "phở", "bún", "mì", "cafe", "nước", "snack", "trà sữa", "ăn", "sáng", "trưa",
            "tối", "nhậu", "tiệc",
        ],
    ),
    (
        Category::XangXe,
        &[
            "xăng", "dầu", "gửi xe", "rửa xe", "sửa xe", "thay nhớt", "grab", "taxi", "bus", "xe",
        ],
    ),
    (
        Category::MuaSam,
        &[
            "quần áo", "giày", "dép", "mỹ phẩm", "siêu thị", "shopee", "lazada", "tiki",
            "đồ gia dụng", "mua",
        ],
    ),
    (
        Category::GiaiTri,
        &["phim", "game", "netflix", "du lịch", "vé", "hát", "karaoke"],
    ),
    (
        Category::GiaoDuc,
        &["học phí", "sách", "vở", "khóa học", "bút"],
    ),
    (
        Category::SucKhoe,
        &["thuốc", "khám", "bệnh viện", "gym", "yoga"],
    ),
    (
        Category::NhaCua,
        &["tiền điện", "tiền nước", "internet", "vệ sinh", "thuê nhà", "rác"],
    ),
];

/// Lowercase a string and strip Vietnamese diacritics.
///
/// Both keywords and descriptions pass through this before matching, so the
/// plain-ASCII spelling of any keyword matches too.
pub fn fold(text: &str) -> String {
    const GROUPS: &[(&str, char)] = &[
        ("àáạảãâầấậẩẫăằắặẳẵ", 'a'),
        ("èéẹẻẽêềếệểễ", 'e'),
        ("ìíịỉĩ", 'i'),
        ("òóọỏõôồốộổỗơờớợởỡ", 'o'),
        ("ùúụủũưừứựửữ", 'u'),
        ("ỳýỵỷỹ", 'y'),
        ("đ", 'd'),
    ];

    text.to_lowercase()
        .chars()
        .map(|c| {
            for (group, base) in GROUPS {
                if group.contains(c) {
                    return *base;
                }
            }
            c
        })
        .collect()
}

/// Whole-word containment: the needle must be bounded by non-alphanumeric
/// characters (or the string ends) on both sides. Prevents "ăn" from
/// matching inside "xăng".
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let begin = from + pos;
        let end = begin + needle.len();
        let bounded_left = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let bounded_right = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if bounded_left && bounded_right {
            return true;
        }
        from = end;
    }
    false
}

/// Classify a description into a category. Falls back to [`Category::Khac`]
/// when no keyword matches.
pub fn classify(description: &str) -> Category {
    let folded = fold(description);

    for table in [INCOME_KEYWORDS, EXPENSE_KEYWORDS] {
        for (category, keywords) in table {
            for keyword in *keywords {
                if contains_whole_word(&folded, &fold(keyword)) {
                    return *category;
                }
            }
        }
    }

    Category::Khac
}
