//! history and delivery state of writers and readers

pub(crate) mod cache;
