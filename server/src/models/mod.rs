pub mod game_data;
pub mod history;
pub mod report;
pub mod stats;
pub mod user;
