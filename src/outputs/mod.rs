//! Output writers.
//!
//! - [`report`]: markdown analysis reports, plus listing and reading them back
//! - [`json`]: JSON dump of the scraped article records
//!
//! ```text
//! report_dir/
//! ├── 财经_analysis_report_20250508_093000.md
//! └── 科技_analysis_report_20250507_181512.md
//!
//! json_output_dir/
//! └── 财经_articles_20250508_093000.json
//! ```

pub mod json;
pub mod report;

/// File-name timestamp shared by every writer.
pub const FILE_TIMESTAMP: &str = "%Y%m%d_%H%M%S";
