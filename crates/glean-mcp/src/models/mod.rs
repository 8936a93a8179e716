//! Tool inputs and Glean response views.
//!
//! All models use `#[serde(default)]` for optional fields and
//! `#[serde(rename_all = "camelCase")]` to match API naming.

mod inputs;
mod responses;

pub use inputs::*;
pub use responses::*;
