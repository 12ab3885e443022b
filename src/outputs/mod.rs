//! Output generation.
//!
//! - [`json`]: writes the ticker → calls mapping as JSON to a file or stdout
//!
//! # Output Shape
//!
//! ```text
//! {
//!   "AAPL": [
//!     { "date": "2025-07-31", "link": "https://...", "content": ["Good afternoon.", ...] },
//!     ...
//!   ],
//!   "MSFT": [...]
//! }
//! ```

pub mod json;
