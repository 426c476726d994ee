//! Event dispatcher
//!
//! The single entry point for inbound chat events:
//! dedup gate → auth gate → command routing or the ingestion path
//! (parse → classify → append → daily-cache update → confirmation).
//!
//! The transport delivering events and sending replies is an external
//! collaborator; the dispatcher only maps an [`InboundEvent`] to an
//! [`OutboundReply`]. It owns the daily cache and the duplicate-suppression
//! set behind mutexes so independent chats can interleave safely.

use chrono::Datelike;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::cache::DailyCache;
use crate::config::Config;
use crate::dedup::DuplicateSuppressor;
use crate::error::BotError;
use crate::ledger::LedgerStore;
use crate::models::{InboundEvent, OutboundReply};
use crate::parser::{parse_amount_arg, parse_message, ParseError};
use crate::reports;

const DENIAL_TEXT: &str = "⛔ Bạn không có quyền sử dụng bot này.";
const SAVE_FAILURE_TEXT: &str = "❌ Có lỗi xảy ra khi lưu dữ liệu.";
const QUERY_FAILURE_TEXT: &str = "❌ Có lỗi xảy ra, vui lòng thử lại sau.";

const HELP_TEXT: &str = "👋 Chào mừng bạn đến với Bot Quản Lý Chi Tiêu!\n\n\
Cơ chế nhập liệu:\n\
Gửi tin nhắn như: `100k cơm` hoặc `50 xăng`\n\
Ghi cho người khác: `100k cơm @vợ` hoặc `50k xăng @con`\n\
Ghi lùi ngày: `200 bỉm #hôm qua` hoặc `30k cafe #25/12`\n\n\
Các lệnh hỗ trợ:\n\
/view - Xem chi tiêu hôm nay\n\
/week - Xem chi tiêu tuần này\n\
/month - Xem chi tiêu tháng này\n\
/stats - Biểu đồ chi tiêu\n\
/recent - 10 giao dịch gần nhất\n\
/search <từ khóa> - Tìm kiếm\n\
/edit <id> <tiền> <mô tả> - Sửa\n\
/delete <id> - Xóa\n\
/person <tên> - Xem chi tiêu theo người\n\
/export - Tải dữ liệu tháng này\n\
/help - Xem lại hướng dẫn này";

pub struct Dispatcher {
    store: LedgerStore,
    config: Config,
    cache: Mutex<DailyCache>,
    dedup: Mutex<DuplicateSuppressor>,
}

impl Dispatcher {
    pub fn new(store: LedgerStore, config: Config, today: chrono::NaiveDate) -> Self {
        Self {
            store,
            config,
            cache: Mutex::new(DailyCache::new(today)),
            dedup: Mutex::new(DuplicateSuppressor::default()),
        }
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Shared with the end-of-day job.
    pub fn cache(&self) -> &Mutex<DailyCache> {
        &self.cache
    }

    /// Process one inbound event. `None` means no reply is owed: the event
    /// was a re-delivery of an already-seen id.
    pub async fn handle(&self, event: InboundEvent) -> Option<OutboundReply> {
        {
            let mut dedup = self.dedup.lock().await;
            if !dedup.insert(event.event_id) {
                info!(event_id = %event.event_id, "duplicate delivery suppressed");
                return None;
            }
        }

        if !self.config.allowed_user_ids.contains(&event.user_id) {
            warn!(user_id = event.user_id, "unauthorized caller denied");
            return Some(OutboundReply::text(DENIAL_TEXT));
        }

        let text = event.text.trim();
        let reply = if text.starts_with('/') {
            self.handle_command(text, &event).await
        } else {
            self.handle_entry(text, &event).await
        };
        Some(reply)
    }

    async fn handle_command(&self, text: &str, event: &InboundEvent) -> OutboundReply {
        let today = event.timestamp.date();
        let currency = &self.config.currency;
        let mut parts = text.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match command {
            "/start" | "/help" => OutboundReply::text(HELP_TEXT),

            "/view" | "/today" => {
                let mut cache = self.cache.lock().await;
                match reports::today_text(cache.entries(today), currency) {
                    Some(text) => OutboundReply::text(text),
                    None => OutboundReply::text("📅 Hôm nay bạn chưa chi tiêu gì."),
                }
            }

            "/week" => self.query_reply(reports::week_view(&self.store, today, currency).await),

            "/month" => self.query_reply(reports::month_view(&self.store, today, currency).await),

            "/stats" => match reports::stats_chart(&self.store, today).await {
                Ok(Some(chart)) => OutboundReply {
                    text: format!("📊 Biểu đồ chi tiêu tháng {}/{}", today.month(), today.year()),
                    chart: Some(chart),
                    export: None,
                },
                Ok(None) => OutboundReply::text("📅 Không có dữ liệu để tạo biểu đồ."),
                Err(err) => self.query_failure(err),
            },

            "/recent" => self.query_reply(reports::recent_view(&self.store, 10, currency).await),

            "/search" => {
                if args.is_empty() {
                    return OutboundReply::text("🔍 Nhập từ khóa: `/search <từ khóa>`");
                }
                let keyword = args.join(" ");
                self.query_reply(reports::search_view(&self.store, &keyword, currency).await)
            }

            "/edit" => self.handle_edit(&args).await,

            "/delete" => {
                let Some(id) = args.first().and_then(|raw| raw.parse::<i64>().ok()) else {
                    return OutboundReply::text("❌ ID không hợp lệ.");
                };
                match self.store.delete(id).await {
                    Ok(true) => OutboundReply::text(format!("✅ Đã xóa giao dịch ID: `{id}`")),
                    Ok(false) => {
                        OutboundReply::text("❌ Không tìm thấy giao dịch với ID này.")
                    }
                    Err(err) => self.query_failure(err),
                }
            }

            "/person" => {
                if args.is_empty() {
                    return OutboundReply::text("👤 Nhập tên: `/person vợ` hoặc `/person con`");
                }
                let person = args.join(" ");
                self.query_reply(reports::person_view(&self.store, &person, today, currency).await)
            }

            "/export" => match reports::export_rows(&self.store, today).await {
                Ok(Some(rows)) => OutboundReply {
                    text: format!(
                        "📂 Dữ liệu tháng {}/{}: {} dòng",
                        today.month(),
                        today.year(),
                        rows.len().saturating_sub(1)
                    ),
                    chart: None,
                    export: Some(rows),
                },
                Ok(None) => {
                    OutboundReply::text("📂 Hiện tại chưa có dữ liệu cho tháng này.")
                }
                Err(err) => self.query_failure(err),
            },

            _ => OutboundReply::text(HELP_TEXT),
        }
    }

    async fn handle_edit(&self, args: &[&str]) -> OutboundReply {
        if args.len() < 2 {
            return OutboundReply::text("📎 HD: `/edit <id> <số tiền> <mô tả>`");
        }
        let Ok(id) = args[0].parse::<i64>() else {
            return OutboundReply::text("❌ ID không hợp lệ.");
        };
        let Ok(amount) = parse_amount_arg(args[1]) else {
            return OutboundReply::text("❌ Dữ liệu không hợp lệ.");
        };
        let description = if args.len() > 2 {
            Some(args[2..].join(" "))
        } else {
            None
        };

        match self
            .store
            .edit(id, Some(amount), description.as_deref())
            .await
        {
            Ok(true) => OutboundReply::text(format!("✅ Đã cập nhật giao dịch ID: `{id}`")),
            Ok(false) => OutboundReply::text("❌ Không tìm thấy giao dịch với ID này."),
            Err(err) => self.query_failure(err),
        }
    }

    /// Ingestion path for a free-text entry line.
    async fn handle_entry(&self, text: &str, event: &InboundEvent) -> OutboundReply {
        let today = event.timestamp.date();

        let draft = match parse_message(text, today) {
            Ok(draft) => draft,
            Err(err) => return OutboundReply::text(correction_text(&err)),
        };

        match self.store.append(draft, event.timestamp).await {
            Ok(tx) => {
                self.cache.lock().await.record(&tx, today);
                OutboundReply::text(format!(
                    "✅ **Đã ghi nhận!**\n\
                     ━━━━━━━━━━━━━━━━━━━━\n\
                     👤 Người: {}\n\
                     💰 Số tiền: {} {}\n\
                     📂 Danh mục: {}\n\
                     📝 Mô tả: {}\n\
                     📅 ID: `{}`",
                    tx.payee,
                    reports::format_thousands(tx.amount),
                    self.config.currency,
                    tx.category.label(),
                    tx.description,
                    tx.id
                ))
            }
            Err(err) => {
                error!(%err, "failed to persist entry");
                OutboundReply::text(SAVE_FAILURE_TEXT)
            }
        }
    }

    fn query_reply(&self, result: crate::error::Result<String>) -> OutboundReply {
        match result {
            Ok(text) => OutboundReply::text(text),
            Err(err) => self.query_failure(err),
        }
    }

    fn query_failure(&self, err: BotError) -> OutboundReply {
        error!(%err, "ledger operation failed");
        OutboundReply::text(QUERY_FAILURE_TEXT)
    }
}

/// Example-based correction message per parse-failure reason.
fn correction_text(err: &ParseError) -> String {
    match err {
        ParseError::MissingAmount => {
            "❓ Sai định dạng. Ví dụ đúng: `100k cơm` hoặc `50 xăng @vợ`".to_string()
        }
        ParseError::MissingDescription => {
            "❓ Thiếu mô tả. Ví dụ đúng: `100k cơm trưa`".to_string()
        }
        ParseError::InvalidAmount(_) => {
            "❓ Số tiền không hợp lệ. Ví dụ đúng: `100k cơm`".to_string()
        }
        ParseError::InvalidDate(token) => format!(
            "❓ Ngày không hợp lệ: `{token}`. Ví dụ đúng: `#hôm qua` hoặc `#25/12`"
        ),
    }
}
