pub mod classifier;
pub mod document;
pub mod inline;
pub mod join;
pub mod lint;
pub mod parser;
pub mod playback;
pub mod scheduler;
pub mod session;
pub mod speaker;
pub mod store;
