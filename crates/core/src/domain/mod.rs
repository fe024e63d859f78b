pub mod chat;
pub mod contract;
pub mod fundamentals;
pub mod news;
pub mod query;
pub mod report;
