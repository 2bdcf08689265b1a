//! Collaborators that move data in and out of the domain: feed, snapshot, recipe file.

pub mod cache;
pub mod prices;
pub mod recipe_file;
