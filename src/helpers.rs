pub mod ledger;
pub mod periods;
