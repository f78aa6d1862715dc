pub mod audio;
pub mod identify;
pub mod job_store;
pub mod matching;
pub mod pipeline;
pub mod scanner;
pub mod source;
