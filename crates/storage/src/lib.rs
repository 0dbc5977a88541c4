//! Object storage access, artifact addressing and run bookkeeping.

pub mod addresser;
pub mod object_store;
pub mod runs;

pub use addresser::{PredecessorChain, RasterKeyAddresser, WeatherKeys};
pub use object_store::{ObjectStorage, ObjectStorageConfig};
pub use runs::{InMemoryRunLog, RunBookkeeping, RunRecord};
