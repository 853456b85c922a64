//! Page graphs as produced by the external graph builder.
//!
//! A [`PageGraph`] is host-side data only; the model moves it to a compute
//! device per page (see [`crate::model::PageTensors`]).

mod bundle;
mod error;
mod page;


pub use bundle::{GraphBundle, RKYV_ALIGNMENT};
pub use error::GraphError;
pub use page::{ArchivedPageGraph, PageGraph};
