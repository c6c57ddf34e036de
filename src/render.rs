//! Pass masks and the traits scenes are rendered through.
//!
//! A frame runs a fixed sequence of passes. Objects carry a [`Pass`] mask
//! naming the passes they take part in, and a pass applies to an object when
//! the two masks intersect. An object may be part of several passes.
//!
//! # Key types
//!
//! - [`Pass`] is the bit mask shared by passes and objects
//! - [`Renderable`] is anything that can draw itself into the current pass
//! - [`Scene`] is what the [`Renderer`](crate::renderer::Renderer) renders each frame

use std::ops::{BitOr, BitOrAssign};

use crate::{context::GraphicsDevice, error::Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pass(u32);

impl Pass {
    pub const NONE: Pass = Pass(0);
    pub const GEOMETRY: Pass = Pass(1);
    pub const LIGHTING: Pass = Pass(2);
    pub const POST_PROCESSING: Pass = Pass(4);
    pub const USER_INTERFACE: Pass = Pass(8);

    pub const fn from_bits(bits: u32) -> Self {
        Pass(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether a pass of `self` applies to an object tagged `other`.
    pub const fn intersects(self, other: Pass) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Pass {
    type Output = Pass;

    fn bitor(self, rhs: Pass) -> Pass {
        Pass(self.0 | rhs.0)
    }
}

impl BitOrAssign for Pass {
    fn bitor_assign(&mut self, rhs: Pass) {
        self.0 |= rhs.0;
    }
}

/// Something that can issue its own draws for a pass.
///
/// Implementations skip passes their mask does not intersect.
pub trait Renderable {
    fn passes(&self) -> Pass;

    fn render(&mut self, device: &mut GraphicsDevice, pass: Pass) -> Result<()>;
}

/// Top-level content of a frame.
///
/// The renderer binds program and target for each pass, then calls
/// [`render`](Scene::render) with the pass being produced.
pub trait Scene {
    fn render(&mut self, device: &mut GraphicsDevice, pass: Pass) -> Result<()>;
}

/// A scene with nothing in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyScene;

impl Scene for EmptyScene {
    fn render(&mut self, _device: &mut GraphicsDevice, _pass: Pass) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_intersect_bitwise() {
        let quad = Pass::USER_INTERFACE | Pass::POST_PROCESSING;
        assert!(Pass::POST_PROCESSING.intersects(quad));
        assert!(Pass::USER_INTERFACE.intersects(quad));
        assert!(!Pass::GEOMETRY.intersects(quad));
        assert!(!Pass::NONE.intersects(quad));
        assert_eq!(quad.bits(), 12);
    }
}
