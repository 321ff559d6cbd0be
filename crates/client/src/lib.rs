//! Backend access for certification records: the API seam, its HTTP and
//! in-memory implementations, and the progress service that gates report
//! submission on document requirements.

pub mod api;
pub mod error;
pub mod http;
pub mod memory;
pub mod progress;

pub use api::CertificationApi;
pub use error::ClientError;
pub use http::HttpCertificationApi;
pub use memory::InMemoryCertificationApi;
pub use progress::{CertificationProgress, ProgressService};
