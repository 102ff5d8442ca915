//! Export surfaces over the canonical event set.

pub mod calendar;
pub mod feed;
