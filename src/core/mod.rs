/*!
# Core Module

Core functionality shared by the store and the ingestion front-end:
error types and the result alias.
*/

pub mod errors;

pub use errors::{StoreError, StoreResult};
