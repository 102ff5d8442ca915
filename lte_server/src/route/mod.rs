pub mod calendar;
pub mod feed;
