//! Version command implementation.

use pagesync_protocol::endpoints::DEFAULT_API_VERSION;

/// Runs the version command.
pub fn run() {
    println!("pagesync CLI v{}", env!("CARGO_PKG_VERSION"));
    println!("pagesync engine v{}", pagesync_engine::VERSION);
    println!("API version {DEFAULT_API_VERSION}");
}
