mod json_extract;
mod line_buffer;

pub use json_extract::{extract_json, ExtractError};
pub use line_buffer::{LineBuffer, LineTooLong, MAX_LINE_BYTES};
