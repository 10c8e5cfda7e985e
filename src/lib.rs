//! Hey Minion — push notifications for new senders in the HEY screener.

pub mod cable;
pub mod config;
pub mod error;
pub mod markup;
pub mod notify;
pub mod screening;
pub mod session;
