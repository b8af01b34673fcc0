//! SeaORM entities backing the fluxo schema.
//!
//! Users own sessions, transactions and recurring expense templates. The
//! category table is static and lives in `common`, so rows only carry its key.

pub mod recurring_expense;
pub mod session;
pub mod transaction;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::recurring_expense::Entity as RecurringExpense;
    pub use super::session::Entity as Session;
    pub use super::transaction::Entity as Transaction;
    pub use super::user::Entity as User;
}
