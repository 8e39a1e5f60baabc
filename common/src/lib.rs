pub mod file_format;
pub mod log_setup;
pub mod test_utils;

pub use file_format::{deserialize, serialize, FileFormat, FileFormatError, FileFormatResult};

pub fn is_debug() -> bool {
    cfg!(debug_assertions)
}
