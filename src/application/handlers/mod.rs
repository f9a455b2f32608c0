//! Command handlers - the entry points external callers use.

mod apply_code;
mod release_code;

pub use apply_code::{ApplyCodeCommand, ApplyCodeHandler};
pub use release_code::{ReleaseCodeCommand, ReleaseCodeHandler};
