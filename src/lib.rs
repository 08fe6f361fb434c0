//! Schemaview - multi-view schema modeling core
//!
//! Diagram geometry, the multi-view entity/relationship model and the schema
//! importers behind a conceptual / logical / physical schema editor. Rendering
//! and interaction live outside this crate; positions and measured node sizes
//! come in through the [`core::Canvas`] abstraction.

pub mod core;
