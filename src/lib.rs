//! Strip comments and docstrings from Python source.
//!
//! ```
//! use scour::rules::PreservationRules;
//! use scour::strip::strip_source;
//!
//! let src = "#!/usr/bin/env python3\ndef f():\n    \"\"\"Doc.\"\"\"\n    return 1  # one\n";
//! let out = strip_source(src, &PreservationRules::default());
//! assert_eq!(out, "#!/usr/bin/env python3\ndef f():\n    return 1\n");
//! ```

pub mod config;
pub mod discovery;
pub mod location;
pub mod process;
pub mod rules;
pub mod scanner;
pub mod strip;
pub mod types;
