//! Core domain models and business logic for multi-view schema modeling

mod association_layout;
mod attributes;
pub mod config;
mod document;
mod geometry;
mod ids;
pub mod import;
mod relationship_index;
mod schema;
mod views;
#[cfg(test)]
mod tests;

pub use association_layout::*;
pub use attributes::*;
pub use document::*;
pub use geometry::*;
pub use ids::*;
pub use relationship_index::*;
pub use schema::*;
pub use views::*;
