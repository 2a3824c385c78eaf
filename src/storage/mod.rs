pub mod annotated_csv;
pub mod influx;
pub mod memory;
pub mod trait_def;

pub use influx::InfluxStore;
pub use memory::{MemoryStore, Point};
pub use trait_def::{EventStore, StoreError, StoreResult};
