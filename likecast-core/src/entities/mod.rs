pub mod credential;

pub use credential::{Credential, RECORD_VERSION, RecordError};
