pub mod balances;
pub mod control;
pub mod health;
pub mod markets;
pub mod metrics;
pub mod reputation;
pub mod ws;
