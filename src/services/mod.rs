pub mod client;
pub mod disk_store;
pub mod s3_client;
pub mod storage_adapter;
