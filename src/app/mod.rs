pub mod report;

pub use report::ReportExporter;
