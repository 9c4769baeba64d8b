//! Item domain - A single student answer to be graded

mod entity;

pub use entity::Item;
