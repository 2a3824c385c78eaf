pub mod event;
pub mod results;

pub use event::{fields, DecodeError, EventRecord, Table};
pub use results::{AbnormalFlag, Distribution, DistributionEntry, ResponseTime};
