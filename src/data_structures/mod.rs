//! Scene data: textures, materials, meshes, objects and the world.
//!
//! - `texture` holds device textures and image loading
//! - `material` bundles textures with shading parameters
//! - `mesh` defines the vertex streams and GPU meshes
//! - `object` is a single drawable mesh with a placement
//! - `instance` draws one mesh many times, with or without hardware instancing
//! - `world` groups everything by material

pub mod instance;
pub mod material;
pub mod mesh;
pub mod object;
pub mod texture;
pub mod world;
