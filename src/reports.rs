//! Query/report layer
//!
//! Builds the weekly/monthly/person/search views on top of the ledger
//! store, and formats them as chat replies. The today view is served from
//! the daily cache instead and lives with the dispatcher.

use chrono::{Datelike, Days, NaiveDate};

use crate::cache::DailyEntry;
use crate::classifier::fold;
use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::models::{ChartSpec, DateRange, MonthKey, MonthlySummary};

/// Thousands-separated rendering, matching the original "100,000 đ" style.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn format_signed(value: i64) -> String {
    if value > 0 {
        format!("+{}", format_thousands(value))
    } else {
        format_thousands(value)
    }
}

/// Today view, rendered from the daily cache.
pub fn today_text(entries: &[DailyEntry], currency: &str) -> Option<String> {
    if entries.is_empty() {
        return None;
    }
    let mut report = String::from("📅 **Chi tiêu hôm nay:**\n\n");
    let mut net = 0i64;
    for entry in entries {
        net += entry.signed_amount;
        report.push_str(&format!(
            "• {} {} - {}\n",
            format_signed(entry.signed_amount),
            currency,
            entry.description
        ));
    }
    report.push_str(&format!(
        "\n💰 **Tổng cộng: {} {}**",
        format_signed(net),
        currency
    ));
    Some(report)
}

/// Shared monthly-summary body: per-category lines with percentages plus a
/// grand total.
pub fn summary_text(summary: &MonthlySummary, heading: &str, currency: &str) -> String {
    let mut report = format!("{heading}\n━━━━━━━━━━━━━━━━━━━━━━━━\n");
    for (category, amount) in &summary.categories {
        let percent = if summary.total > 0 {
            *amount as f64 / summary.total as f64 * 100.0
        } else {
            0.0
        };
        report.push_str(&format!(
            "• {}: {} {} ({:.1}%)\n",
            category.label(),
            format_thousands(*amount),
            currency,
            percent
        ));
    }
    report.push_str(&format!(
        "━━━━━━━━━━━━━━━━━━━━━━━━\n💰 **TỔNG: {} {}**",
        format_thousands(summary.total),
        currency
    ));
    report
}

/// This week's transactions, Monday through today.
pub async fn week_view(store: &LedgerStore, today: NaiveDate, currency: &str) -> Result<String> {
    let start = today
        .checked_sub_days(Days::new(today.weekday().num_days_from_monday() as u64))
        .unwrap_or(today);
    let transactions = store
        .query(Some(DateRange { start, end: today }), None)
        .await?;

    if transactions.is_empty() {
        return Ok("📅 Tuần này bạn chưa chi tiêu gì.".to_string());
    }

    let mut report = String::from("📅 **Chi tiêu tuần này:**\n\n");
    let mut total = 0i64;
    for tx in &transactions {
        total += tx.amount;
        report.push_str(&format!(
            "• {} - {} {}: {}\n",
            tx.date.format("%d/%m/%Y"),
            format_thousands(tx.amount),
            currency,
            tx.description
        ));
    }
    report.push_str(&format!(
        "\n💰 **Tổng cộng: {} {}**",
        format_thousands(total),
        currency
    ));
    Ok(report)
}

/// This month's per-category summary.
pub async fn month_view(store: &LedgerStore, today: NaiveDate, currency: &str) -> Result<String> {
    let summary = store
        .monthly_summary(today.month(), today.year(), None)
        .await?;
    Ok(match summary {
        Some(summary) => {
            let heading = format!(
                "📊 **TỔNG HỢP CHI TIÊU THÁNG {}/{}**",
                summary.month, summary.year
            );
            summary_text(&summary, &heading, currency)
        }
        None => "📅 Tháng này chưa có dữ liệu chi tiêu.".to_string(),
    })
}

/// The N most recent transactions, newest first.
pub async fn recent_view(store: &LedgerStore, count: usize, currency: &str) -> Result<String> {
    let all = store.query(None, None).await?;
    if all.is_empty() {
        return Ok("📅 Chưa có dữ liệu chi tiêu.".to_string());
    }

    let mut report = format!("🕒 **{count} Giao dịch gần nhất:**\n\n");
    for tx in all.iter().rev().take(count) {
        report.push_str(&format!(
            "ID: `{}` | {} {} | {}\n",
            tx.id,
            format_thousands(tx.amount),
            currency,
            tx.description
        ));
    }
    Ok(report)
}

/// Keyword search over descriptions and category labels, diacritic- and
/// case-insensitive; shows the newest 15 matches.
pub async fn search_view(store: &LedgerStore, keyword: &str, currency: &str) -> Result<String> {
    let needle = fold(keyword);
    let all = store.query(None, None).await?;
    let matches: Vec<_> = all
        .iter()
        .filter(|tx| {
            fold(&tx.description).contains(&needle) || fold(tx.category.label()).contains(&needle)
        })
        .collect();

    if matches.is_empty() {
        return Ok(format!("❌ Không tìm thấy kết quả cho: `{keyword}`"));
    }

    let mut report = format!("🔍 **Kết quả tìm kiếm cho '{keyword}':**\n\n");
    let skip = matches.len().saturating_sub(15);
    for tx in matches.into_iter().skip(skip) {
        report.push_str(&format!(
            "• {} | ID: `{}` | {} {} | {}\n",
            tx.date.format("%d/%m/%Y"),
            tx.id,
            format_thousands(tx.amount),
            currency,
            tx.description
        ));
    }
    Ok(report)
}

/// One person's summary for the current month.
pub async fn person_view(
    store: &LedgerStore,
    person: &str,
    today: NaiveDate,
    currency: &str,
) -> Result<String> {
    let summary = store
        .monthly_summary(today.month(), today.year(), Some(person))
        .await?;
    Ok(match summary {
        Some(summary) => {
            let heading = format!(
                "👤 **CHI TIÊU CỦA {} - THÁNG {}/{}**",
                person.to_uppercase(),
                summary.month,
                summary.year
            );
            summary_text(&summary, &heading, currency)
        }
        None => format!("📅 Tháng này chưa có chi tiêu của {person}."),
    })
}

/// Chart input for the stats command. Rendering happens outside.
pub async fn stats_chart(store: &LedgerStore, today: NaiveDate) -> Result<Option<ChartSpec>> {
    let summary = store
        .monthly_summary(today.month(), today.year(), None)
        .await?;
    Ok(summary.map(|summary| ChartSpec {
        title: format!("Chi tiêu tháng {}/{}", summary.month, summary.year),
        slices: summary
            .categories
            .iter()
            .map(|(category, amount)| (category.label().to_string(), *amount))
            .collect(),
    }))
}

/// Current-month raw rows for the export command.
pub async fn export_rows(
    store: &LedgerStore,
    today: NaiveDate,
) -> Result<Option<Vec<Vec<String>>>> {
    store.export_partition(MonthKey::from_date(today)).await
}
