//! Report payload parsers

pub mod report_xml;

pub use report_xml::{ReportParseError, clean_report_xml, parse_report};
