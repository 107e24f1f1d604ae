/// Readers for the `%`-commented numeric tables of an input folder.
pub mod load_from_file;
/// CSV output, gas production rates and the run summary.
pub mod output;
