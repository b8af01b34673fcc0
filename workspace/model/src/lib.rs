pub mod entities;
pub mod ledger;
