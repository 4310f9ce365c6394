//! Parsers for device-query output.
//!
//! # Supported Output
//!
//! - `nvidia-smi --query-gpu=<field> --format=csv,nounits,noheader`: one
//!   number per device per line → `ParsedSample`
//!
//! Parsing never fails. Output that cannot be read as numbers degrades to a
//! single zero reading for device 0, and the caller decides how loudly to
//! report it.

pub mod query_output;

pub use query_output::{parse_query_output, ParsedSample};
