//! Position addressing for gridgraph tables.
//!
//! Columns are lettered with bijective base-26 numeration (`A`..`Z`, `AA`, ...),
//! rows are 1-based integers, and cells nested inside sub-tables are addressed
//! with dot-joined paths such as `B3.A1`.

pub mod address;

pub use address::{
    get_position, parse_path, parse_position, to_letters, to_number, AddressError, Position,
    PATH_SEPARATOR,
};
