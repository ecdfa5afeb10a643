use std::env;
use std::time::Duration;

use crate::keeper::KeeperConfig;
use crate::models::Amount;
use crate::registry::RegistryPolicy;

const DEFAULT_TREASURY: &str = "treasury";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Market policy
    pub treasury_account: String,
    pub creation_fee_util: Amount,
    pub max_active_markets_per_creator: usize,
    pub default_platform_fee_pct: u32,
    pub default_voter_reward_pct: u32,
    pub vote_stake_util: Amount,
    pub reputation_initial: u32,

    // Keeper
    pub keeper_enabled: bool,
    pub keeper_interval_secs: u64,
    pub keeper_concurrency: usize,
    pub keeper_call_timeout_ms: u64,

    // Notifications (optional)
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notifications_enabled: bool,

    /// Bearer token for /api routes. Unset means open access.
    pub api_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            treasury_account: env::var("TREASURY_ACCOUNT")
                .unwrap_or_else(|_| DEFAULT_TREASURY.into()),
            creation_fee_util: env::var("CREATION_FEE_UTIL")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            max_active_markets_per_creator: env::var("MAX_ACTIVE_MARKETS_PER_CREATOR")
                .unwrap_or_else(|_| "5".into())
                .parse()?,
            default_platform_fee_pct: env::var("DEFAULT_PLATFORM_FEE_PCT")
                .unwrap_or_else(|_| "5".into())
                .parse()?,
            default_voter_reward_pct: env::var("DEFAULT_VOTER_REWARD_PCT")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            vote_stake_util: env::var("VOTE_STAKE_UTIL")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            reputation_initial: env::var("REPUTATION_INITIAL")
                .unwrap_or_else(|_| "50".into())
                .parse()?,

            keeper_enabled: env::var("KEEPER_ENABLED")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(true),
            keeper_interval_secs: env::var("KEEPER_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            keeper_concurrency: env::var("KEEPER_CONCURRENCY")
                .unwrap_or_else(|_| "16".into())
                .parse()
                .unwrap_or(16),
            keeper_call_timeout_ms: env::var("KEEPER_CALL_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".into())
                .parse()
                .unwrap_or(5_000),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            notifications_enabled: env::var("NOTIFICATIONS_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),

            api_token: env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
        })
    }

    /// Returns true if Telegram credentials are configured and notifications are on.
    pub fn has_telegram(&self) -> bool {
        self.notifications_enabled
            && self.telegram_bot_token.is_some()
            && self.telegram_chat_id.is_some()
    }

    pub fn registry_policy(&self) -> RegistryPolicy {
        RegistryPolicy {
            creation_fee_util: self.creation_fee_util,
            max_active_markets: self.max_active_markets_per_creator,
            default_platform_fee_pct: self.default_platform_fee_pct,
            default_voter_reward_pct: self.default_voter_reward_pct,
            vote_stake_util: self.vote_stake_util,
            treasury: self.treasury_account.clone(),
        }
    }

    pub fn keeper_config(&self) -> KeeperConfig {
        KeeperConfig {
            interval: Duration::from_secs(self.keeper_interval_secs.max(1)),
            concurrency: self.keeper_concurrency.max(1),
            call_timeout: Duration::from_millis(self.keeper_call_timeout_ms.max(1)),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            treasury_account: DEFAULT_TREASURY.into(),
            creation_fee_util: 10,
            max_active_markets_per_creator: 5,
            default_platform_fee_pct: 5,
            default_voter_reward_pct: 10,
            vote_stake_util: 10,
            reputation_initial: 50,
            keeper_enabled: true,
            keeper_interval_secs: 30,
            keeper_concurrency: 16,
            keeper_call_timeout_ms: 5_000,
            telegram_bot_token: None,
            telegram_chat_id: None,
            notifications_enabled: false,
            api_token: None,
        }
    }
}
