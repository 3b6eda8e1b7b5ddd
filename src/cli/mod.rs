//! CLI support for the `bcs-trade` demo binary.
//!
//! ```ignore
//! use bcs_trade::cli::{parse_args, CliCommand};
//!
//! match parse_args(std::env::args()) {
//!     CliCommand::Version => println!("{}", bcs_trade::cli::version_line()),
//!     other => run(other).await?,
//! }
//! ```

pub mod args;
pub mod version;

pub use args::{parse_args, CliCommand, DEFAULT_TIME_FRAME, USAGE};
pub use version::{version_line, VERSION};
