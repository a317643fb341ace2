/// Key/value backends (file and in-memory).
pub mod kv;
/// Match records and the active-match pointer on top of a key/value backend.
pub mod local_store;
/// Storage error types shared by every backend.
pub mod storage;
