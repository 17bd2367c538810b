/// Storage keys shared by every persisted client record.
pub mod keys;
/// Key/value local storage backends.
pub mod local_store;
/// Records persisted in local storage.
pub mod models;
/// Storage error types.
pub mod storage;
/// Typed accessors over the local store.
pub mod preferences;
