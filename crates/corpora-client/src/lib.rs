//! # corpora-client
//!
//! HTTP implementation of [`corpora_core::CorporaApi`] for the Corpora REST
//! API, plus the chunked file upload protocol and helpers for fetching
//! external documents (IIIF info, link previews).
//!
//! # Example
//!
//! ```rust,no_run
//! use corpora_client::HttpCorporaApi;
//! use corpora_core::CorporaApi;
//!
//! #[tokio::main]
//! async fn main() -> corpora_core::Result<()> {
//!     let api = HttpCorporaApi::from_env()?;
//!     let books = api.spool_content("42", "Book", &[]).await?;
//!     println!("{} books", books.len());
//!     Ok(())
//! }
//! ```

pub mod http;
pub mod upload;

pub use http::HttpCorporaApi;
pub use upload::{FileUploader, UploadReceipt};
