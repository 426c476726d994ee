//! Message parser
//!
//! Turns one line of free text into a [`DraftTransaction`]. The grammar is
//! `<digits>[k|m] <description> [@payee] [#date]`; the amount may also trail
//! the description ("lương 5m"). Pure and synchronous: date tokens are
//! resolved against the delivery time passed in by the caller, never the
//! system clock.

use chrono::{Datelike, Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::classifier::fold;
use crate::models::{DraftTransaction, SELF_PAYEE};

/// Parse failures, one variant per correction message the bot can show.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("message does not start or end with an amount")]
    MissingAmount,

    #[error("amount is present but the description is missing")]
    MissingDescription,

    #[error("amount out of range: {0}")]
    InvalidAmount(String),

    #[error("invalid date token: {0}")]
    InvalidDate(String),
}

lazy_static! {
    // Leading amount: "100k cơm @vợ #hôm qua"
    static ref LEADING_RE: Regex = Regex::new(
        r"^(?P<amount>\d+)(?P<suffix>[kKmM])?\s+(?P<desc>.+?)(?:\s+@(?P<payee>\w+))?(?:\s+#(?P<date>[^#@]+))?$"
    )
    .expect("leading-amount grammar compiles");

    // Trailing amount: "lương 5m"
    static ref TRAILING_RE: Regex = Regex::new(
        r"^(?P<desc>.+?)\s+(?P<amount>\d+)(?P<suffix>[kKmM])?(?:\s+@(?P<payee>\w+))?(?:\s+#(?P<date>[^#@]+))?$"
    )
    .expect("trailing-amount grammar compiles");

    // Bare amount with nothing after it: "100k"
    static ref AMOUNT_ONLY_RE: Regex =
        Regex::new(r"^\d+[kKmM]?$").expect("bare-amount grammar compiles");

    static ref DAY_MONTH_RE: Regex =
        Regex::new(r"^(?P<day>\d{1,2})/(?P<month>\d{1,2})$").expect("day/month grammar compiles");

    static ref AMOUNT_ARG_RE: Regex =
        Regex::new(r"^(\d+)([kKmM])?$").expect("amount-arg grammar compiles");
}

/// Apply the `k`/`m` multiplier to a digit string.
pub fn parse_amount_token(digits: &str, suffix: Option<&str>) -> Result<i64, ParseError> {
    let base: i64 = digits
        .parse()
        .map_err(|_| ParseError::InvalidAmount(digits.to_string()))?;
    let factor = match suffix.map(|s| s.to_ascii_lowercase()) {
        Some(s) if s == "k" => 1_000,
        Some(s) if s == "m" => 1_000_000,
        _ => 1,
    };
    base.checked_mul(factor)
        .ok_or_else(|| ParseError::InvalidAmount(digits.to_string()))
}

/// Amount argument of the edit command, accepting the same `k`/`m` suffixes
/// as the message grammar.
pub fn parse_amount_arg(token: &str) -> Result<i64, ParseError> {
    let caps = AMOUNT_ARG_RE
        .captures(token)
        .ok_or_else(|| ParseError::InvalidAmount(token.to_string()))?;
    parse_amount_token(
        caps.get(1).map_or("", |m| m.as_str()),
        caps.get(2).map(|m| m.as_str()),
    )
}

/// Resolve a `#date` token against the delivery date.
///
/// "hôm qua" (any diacritic spelling) is the previous calendar day. A
/// `day/month` pair replaces day and month of `today`, keeping the year
/// constant — "#31/12" parsed in January still lands in the current year.
fn resolve_date_token(token: &str, today: NaiveDate) -> Result<NaiveDate, ParseError> {
    let token = token.trim();

    if fold(token) == "hom qua" {
        return today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| ParseError::InvalidDate(token.to_string()));
    }

    let caps = DAY_MONTH_RE
        .captures(token)
        .ok_or_else(|| ParseError::InvalidDate(token.to_string()))?;
    let day: u32 = caps["day"]
        .parse()
        .map_err(|_| ParseError::InvalidDate(token.to_string()))?;
    let month: u32 = caps["month"]
        .parse()
        .map_err(|_| ParseError::InvalidDate(token.to_string()))?;

    // Day 31 in a 30-day month is a parse failure, not a clamp.
    NaiveDate::from_ymd_opt(today.year(), month, day)
        .ok_or_else(|| ParseError::InvalidDate(token.to_string()))
}

/// Parse one message line into a draft transaction.
pub fn parse_message(text: &str, today: NaiveDate) -> Result<DraftTransaction, ParseError> {
    let text = text.trim();

    let caps = LEADING_RE
        .captures(text)
        .or_else(|| TRAILING_RE.captures(text))
        .ok_or_else(|| {
            if AMOUNT_ONLY_RE.is_match(text) {
                ParseError::MissingDescription
            } else {
                ParseError::MissingAmount
            }
        })?;

    let amount = parse_amount_token(
        &caps["amount"],
        caps.name("suffix").map(|m| m.as_str()),
    )?;
    let description = caps["desc"].trim().to_string();
    if description.is_empty() {
        return Err(ParseError::MissingDescription);
    }

    let payee = caps
        .name("payee")
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| SELF_PAYEE.to_string());

    let date = match caps.name("date") {
        Some(token) => resolve_date_token(token.as_str(), today)?,
        None => today,
    };

    Ok(DraftTransaction {
        amount,
        description,
        payee,
        date,
    })
}
