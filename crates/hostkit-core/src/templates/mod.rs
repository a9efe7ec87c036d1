//! # Templates
//!
//! Configuration files rendered from immutable structs.
//!
//! Every renderer is a pure function of its input: no filesystem, no
//! process, no clock. Writing the result to disk is the caller's job.

mod apt;
mod snell;
mod systemd;

pub use apt::*;
pub use snell::*;
pub use systemd::*;

use crate::HostkitError;

/// Reject values that would break a line-oriented file format.
pub(crate) fn single_line(field: &str, value: &str) -> Result<(), HostkitError> {
    if value.contains(['\n', '\r']) {
        return Err(HostkitError::Template(format!(
            "{} must be a single line",
            field
        )));
    }
    Ok(())
}
