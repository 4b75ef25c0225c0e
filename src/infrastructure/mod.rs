pub mod in_memory;
pub mod job_queue;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sandbox;
