//! Interactive browsing state on top of the static dataset.

pub mod documents;
pub mod scanner;
pub mod state;
