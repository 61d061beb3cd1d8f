pub mod history;
pub mod summarizer;

pub use history::CallHistoryService;
pub use summarizer::CallSummarizer;
