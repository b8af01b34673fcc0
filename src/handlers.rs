pub mod analysis;
pub mod auth;
pub mod categories;
pub mod health;
pub mod realtime;
pub mod recurring_expenses;
pub mod summary;
pub mod transactions;
