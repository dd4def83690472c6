//! Client for the CAD-splitting service.
//!
//! The service takes a multipart upload of a CAD file and answers with the
//! storage paths of the parts it produced. This crate only transports the
//! request; interpreting the answer belongs to the domain.

pub mod error;
pub mod retry;
pub mod splitter;

pub use error::{CadError, Result};
pub use retry::RetryPolicy;
pub use splitter::{CadSplitter, CadUpload, HttpCadSplitter, InMemoryCadSplitter};
