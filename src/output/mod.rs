//! Output formatters for scan results and action outcomes.
//!
//! - Text for people (colored with `yansi`)
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::duplicates::{DuplicateFinder, ScanState};
//! use dupsweep::error::ExitCode;
//! use dupsweep::output::JsonOutput;
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::with_defaults();
//! let (groups, summary) = finder.find_duplicates(Path::new(".")).unwrap();
//!
//! let output = JsonOutput::new(ScanState::Completed, &groups, &summary, ExitCode::Success);
//! output.write_to(&mut std::io::stdout(), true).unwrap();
//! ```

pub mod json;
pub mod text;

pub use json::{JsonApplyOutput, JsonOutput, JsonOutputError};
pub use text::{write_outcomes, TextOutput};
