//! One module per subcommand.

pub mod create;
pub mod delete;
pub mod init;
pub mod query;
pub mod record;
pub mod rename;
pub mod status;
