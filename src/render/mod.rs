//! Rendering module: reducing labeled blocks to an outline and writing it out.

mod json;
mod outline;

pub use json::{to_json, to_json_value, JsonFormat};
pub use outline::{assemble_outline, assemble_title, OutlineAssembler};
