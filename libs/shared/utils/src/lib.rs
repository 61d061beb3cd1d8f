pub mod extractor;
pub mod telemetry;
pub mod test_utils;
pub mod time;
