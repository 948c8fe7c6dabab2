//! A camera looking at the scene through a rectangle of the surface.

use super::framebuffer::Framebuffer;
use super::post::PostEffect;
use super::shader::PixelShader;
use super::vertex::TriangleFlags;
use crate::core::{Camera, Color};
use serde::{Deserialize, Serialize};

/// Pixel rectangle on the output surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Whether the rectangle lies inside a `width × height` surface.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// Per-viewport render state. The framebuffer and per-frame triangle flags
/// are rebuilt by every render call; everything else is read-only during it.
pub struct Viewport {
    pub rect: ScreenRect,
    pub camera: Camera,
    pub shader: Box<dyn PixelShader>,
    /// Applied in order after the transparency flatten
    pub post: Vec<PostEffect>,
    /// Opaque fill under the geometry; `None` leaves cleared pixels
    /// transparent black.
    pub background: Option<Color>,
    framebuffer: Framebuffer,
    triangle_flags: Vec<TriangleFlags>,
}

impl Viewport {
    /// `layers` is the number of transparency slots per pixel.
    pub fn new(rect: ScreenRect, camera: Camera, layers: usize, shader: impl PixelShader + 'static) -> Self {
        Self {
            rect,
            camera,
            shader: Box::new(shader),
            post: Vec::new(),
            background: None,
            framebuffer: Framebuffer::new(rect.width, rect.height, layers),
            triangle_flags: Vec::new(),
        }
    }

    pub fn with_post(mut self, effect: PostEffect) -> Self {
        self.post.push(effect);
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// The framebuffer as left by the last render call.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Flags of every scene triangle from the last render call, indexed like
    /// `Scene::triangles`.
    pub fn triangle_flags(&self) -> &[TriangleFlags] {
        &self.triangle_flags
    }

    /// Reallocate the framebuffer if the rectangle changed size.
    pub(crate) fn sync_framebuffer(&mut self) {
        let (width, height, layers) = {
            let fb = &self.framebuffer;
            (fb.width(), fb.height(), fb.layer_count())
        };
        if width != self.rect.width || height != self.rect.height {
            log::debug!(
                "viewport resized to {}x{}, reallocating framebuffer",
                self.rect.width,
                self.rect.height
            );
            self.framebuffer = Framebuffer::new(self.rect.width, self.rect.height, layers);
        }
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut Framebuffer, &mut Vec<TriangleFlags>, &dyn PixelShader, &[PostEffect]) {
        (
            &mut self.framebuffer,
            &mut self.triangle_flags,
            self.shader.as_ref(),
            &self.post,
        )
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("rect", &self.rect)
            .field("camera", &self.camera)
            .field("post", &self.post)
            .field("background", &self.background)
            .field("layers", &self.framebuffer.layer_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::SolidColor;

    #[test]
    fn test_rect_fits() {
        assert!(ScreenRect::new(0, 0, 4, 4).fits(4, 4));
        assert!(ScreenRect::new(2, 1, 2, 3).fits(4, 4));
        assert!(!ScreenRect::new(3, 0, 2, 1).fits(4, 4));
        assert!(!ScreenRect::new(u32::MAX, 0, 2, 1).fits(4, 4));
    }

    #[test]
    fn test_resize_keeps_layer_count() {
        let mut vp = Viewport::new(ScreenRect::new(0, 0, 4, 4), Camera::default(), 3, SolidColor::new());
        vp.rect.width = 8;
        vp.sync_framebuffer();
        assert_eq!(vp.framebuffer().width(), 8);
        assert_eq!(vp.framebuffer().layer_count(), 3);
    }
}
