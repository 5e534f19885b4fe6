pub mod browser;
pub mod cutoff;
pub mod dates;
pub mod dom;
pub mod notify;
pub mod pool;
pub mod processor;
pub mod scanner;
pub mod scripts;
pub mod stats;
pub mod summary;
pub mod sync;
