// ABOUTME: Command module aggregator for the hoku CLI.
// ABOUTME: One handler per subcommand; each returns the process exit code.

mod deploy;
mod init;
mod rollback;
mod serve;
mod status;

pub use deploy::deploy;
pub use init::init;
pub use rollback::rollback;
pub use serve::serve;
pub use status::status;
