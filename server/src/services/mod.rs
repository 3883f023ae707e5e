pub mod auth;
pub mod cache;
pub mod game_data;
pub mod history;
pub mod notify;
pub mod number;
pub mod parser;
pub mod report;
pub mod stats;
