pub mod process_time;

pub use process_time::{process_time_middleware, ProcessTime};
