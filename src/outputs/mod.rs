//! Persistence of accepted documents.
//!
//! # Submodules
//!
//! - [`json`]: writes each run's accepted documents to a dated JSON file
//! - [`index`]: the `seen.json` index of stored links used for de-duplication
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2025-06-12/
//! │   ├── ecb_081500.json
//! │   └── ecb_201500.json
//! └── seen.json
//! ```

pub mod index;
pub mod json;
