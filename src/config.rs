//! Environment-provided configuration
//!
//! Call `dotenv::dotenv().ok()` before `Config::from_env()` — the binary
//! does this at startup.

use crate::error::{BotError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-platform bot credential.
    pub bot_token: String,
    /// Allow-listed caller identities; everyone else is denied.
    pub allowed_user_ids: Vec<i64>,
    /// Identifier of the ledger container at the tabular service.
    pub container_id: String,
    /// Base URL of the tabular service; unset means the in-memory backend.
    pub ledger_api_base_url: Option<String>,
    pub ledger_api_token: String,
    /// Day of month the month-end report fires.
    pub report_day: u32,
    /// Currency label appended to every amount.
    pub currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = get("BOT_TOKEN")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BotError::Config("BOT_TOKEN is not set".to_string()))?;

        let raw_ids = get("ALLOWED_USER_IDS")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BotError::Config("ALLOWED_USER_IDS is not set".to_string()))?;
        let allowed_user_ids = raw_ids
            .split(',')
            .map(|id| {
                id.trim()
                    .parse::<i64>()
                    .map_err(|_| BotError::Config(format!("invalid user id: {id}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let container_id = get("LEDGER_CONTAINER_ID")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BotError::Config("LEDGER_CONTAINER_ID is not set".to_string()))?;

        let report_day = match get("REPORT_DAY") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|day| (1..=28).contains(day))
                .ok_or_else(|| BotError::Config(format!("invalid REPORT_DAY: {raw}")))?,
            None => 5,
        };

        Ok(Self {
            bot_token,
            allowed_user_ids,
            container_id,
            ledger_api_base_url: get("LEDGER_API_BASE_URL").filter(|v| !v.is_empty()),
            ledger_api_token: get("LEDGER_API_TOKEN").unwrap_or_default(),
            report_day,
            currency: get("CURRENCY").unwrap_or_else(|| "đ".to_string()),
        })
    }
}
