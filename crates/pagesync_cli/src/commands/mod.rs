//! CLI command implementations.

pub mod blocks;
pub mod create;
pub mod exists;
pub mod list;
pub mod loopback;
pub mod refresh;
pub mod version;

use serde::Serialize;

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
