pub mod migrate;
pub mod status;

pub use migrate::{run_migrate, MigrateArgs};
pub use status::run_status;
