//! Shader programs of the frame pipeline.
//!
//! - `program` holds the linked program type and its location tables
//! - `geometry`, `gui`, `post`, `blur` and `copy` build one program each and
//!   resolve exactly the inputs their shaders declare

pub mod blur;
pub mod copy;
pub mod geometry;
pub mod gui;
pub mod post;
pub mod program;
