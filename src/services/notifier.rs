use serde_json::json;
use uuid::Uuid;

use crate::models::{MarketStatus, ResolutionInfo};

/// Telegram notification service. Failures are logged but never block the keeper.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }

    /// Send a Telegram message. Failures are logged as warnings.
    pub async fn send(&self, message: &str) {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send Telegram notification");
            }
        }
    }
}

fn short_id(id: Uuid) -> String {
    let s = id.to_string();
    s[..8].to_string()
}

/// Message for a market that just reached a terminal state.
pub fn format_terminal(id: Uuid, title: &str, info: &ResolutionInfo, cancel_reason: Option<&str>) -> String {
    match info.status {
        MarketStatus::Completed => format!(
            "*Market Resolved*\nMarket: `{}`\nTitle: {}\nWinner: {}\nWinning stake: {}\nLosing stake: {}\nWinners pool: {}\nPlatform fee: {}",
            short_id(id),
            title,
            info.winning_side,
            info.total_winning_stake,
            info.total_losing_stake,
            info.winners_pool,
            info.platform_fee_amount,
        ),
        MarketStatus::Cancelled => format!(
            "*Market Cancelled*\nMarket: `{}`\nTitle: {}\nReason: {}",
            short_id(id),
            title,
            cancel_reason.unwrap_or("unknown"),
        ),
        other => format!(
            "*Market Update*\nMarket: `{}`\nTitle: {}\nStatus: {}",
            short_id(id),
            title,
            other,
        ),
    }
}
