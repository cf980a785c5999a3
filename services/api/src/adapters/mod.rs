pub mod db;
pub mod seed_bank;

pub use db::DbAdapter;
pub use seed_bank::seed_bank;
