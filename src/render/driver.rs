//! Parallel render driver.
//!
//! One render call runs, per viewport, a fixed pool of N scoped worker
//! threads through three phases separated by two barriers:
//!
//! 1. clear the worker's framebuffer rows, project its slice of the scene
//!    vertices; **barrier**
//! 2. classify its slice of the scene triangles (frustum, near clip,
//!    backface), synthesizing clip geometry into a worker-local batch;
//!    **barrier**
//! 3. rasterize every visible triangle (scene and synthesized, in worker
//!    order) into its own rows, then composite, post-process and blit those
//!    rows to the surface.
//!
//! Phase results are published through one write-once slot per worker and
//! read after the barrier, always in worker order. Rows are owned, never
//! shared, so the output does not depend on N.

use super::config::RenderConfig;
use super::framebuffer::{split_rows, FrameBand};
use super::post::PostEffect;
use super::raster::Rasterizer;
use super::shader::{PixelShader, ShadeContext, TriangleSetup};
use super::surface::Surface;
use super::vertex::{classify_triangle, ClipBatch, FrameVertices, ScreenVertex, TriangleFlags, VertexId, ViewTransform};
use super::viewport::{ScreenRect, Viewport};
use crate::core::Color;
use crate::scene::Scene;
use std::ops::{AddAssign, Range};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Barrier, OnceLock};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface stride {stride} is smaller than its width {width}")]
    Stride { stride: usize, width: u32 },

    #[error("surface needs {required} pixels but the buffer holds {actual}")]
    SurfaceTooSmall { required: usize, actual: usize },

    #[error("viewport {index} rectangle {rect:?} does not fit the {width}x{height} surface")]
    ViewportOutOfBounds {
        index: usize,
        rect: ScreenRect,
        width: u32,
        height: u32,
    },

    #[error("render worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

/// Triangle and pixel counts of one render call, summed over viewports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub viewports: usize,
    /// Scene triangles rasterized as-is
    pub visible: usize,
    /// Rejected by the frustum-plane test
    pub outside: usize,
    /// Back-facing and not double-sided
    pub culled: usize,
    /// Crossing the near plane, replaced by synthesized triangles
    pub clipped: usize,
    /// Triangles synthesized by near clipping that reached the rasterizer
    pub synthesized: usize,
    pub pixels_written: u64,
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, o: Self) {
        self.viewports += o.viewports;
        self.visible += o.visible;
        self.outside += o.outside;
        self.culled += o.culled;
        self.clipped += o.clipped;
        self.synthesized += o.synthesized;
        self.pixels_written += o.pixels_written;
    }
}

/// Entry point: renders a scene through any number of viewports.
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Update world transforms once, then run the parallel pipeline for each
    /// viewport in order, writing into its rectangle of `surface`.
    ///
    /// Viewport rectangles are checked up front. A worker panic aborts the
    /// remaining phases and leaves a partial frame.
    pub fn render(
        &self,
        scene: &mut Scene,
        viewports: &mut [Viewport],
        surface: &mut Surface<'_>,
    ) -> Result<FrameStats, RenderError> {
        let (width, height) = (surface.width(), surface.height());
        for (index, vp) in viewports.iter().enumerate() {
            if !vp.rect.fits(width, height) {
                return Err(RenderError::ViewportOutOfBounds {
                    index,
                    rect: vp.rect,
                    width,
                    height,
                });
            }
        }

        let start = Instant::now();
        scene.update_world_transforms();
        let scene: &Scene = scene;

        let workers = self.config.worker_count();
        let mut rows = surface.rows_mut();
        let mut stats = FrameStats::default();
        for (index, vp) in viewports.iter_mut().enumerate() {
            let t = Instant::now();
            let r = vp.rect;
            let dest = &mut rows[r.y as usize..(r.y + r.height) as usize];
            let vp_stats = self.render_viewport(scene, vp, dest, workers)?;
            log::trace!("viewport {index}: {vp_stats:?} in {:?}", t.elapsed());
            stats += vp_stats;
        }

        log::debug!(
            "frame: {} viewports, {} visible, {} culled, {} clipped -> {} synthesized, {} pixels, {:?} on {} threads",
            stats.viewports,
            stats.visible,
            stats.culled,
            stats.clipped,
            stats.synthesized,
            stats.pixels_written,
            start.elapsed(),
            workers
        );
        Ok(stats)
    }

    fn render_viewport(
        &self,
        scene: &Scene,
        vp: &mut Viewport,
        dest: &mut [&mut [u32]],
        workers: usize,
    ) -> Result<FrameStats, RenderError> {
        vp.sync_framebuffer();
        let rect = vp.rect;
        let background = vp.background;
        let view = ViewTransform::new(&vp.camera, rect.width, rect.height, &self.config);
        let (framebuffer, flags_out, shader, post) = vp.parts_mut();

        let shared = Shared {
            scene,
            view: &view,
            post,
            background,
            x0: rect.x as usize,
            vertex_chunk: chunk_size(scene.vertices.len(), workers),
            triangle_chunk: chunk_size(scene.triangles.len(), workers),
            projected: (0..workers).map(|_| OnceLock::new()).collect(),
            classified: (0..workers).map(|_| OnceLock::new()).collect(),
            barrier: Barrier::new(workers),
            failed: AtomicBool::new(false),
        };

        let row_ranges = split_rows(rect.height, workers);
        let bands = framebuffer.bands(&row_ranges);
        let mut dest_bands = Vec::with_capacity(workers);
        let mut rest = dest;
        for r in &row_ranges {
            let (band, tail) = std::mem::take(&mut rest).split_at_mut(r.len());
            dest_bands.push(band);
            rest = tail;
        }

        let results: Vec<Result<FrameStats, RenderError>> = std::thread::scope(|s| {
            let shared = &shared;
            let handles: Vec<_> = bands
                .into_iter()
                .zip(dest_bands)
                .enumerate()
                .map(|(worker, (band, dest))| {
                    let shader = shader.clone_boxed();
                    s.spawn(move || shared.run(worker, band, dest, shader))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(worker, h)| {
                    h.join()
                        .unwrap_or(Err(RenderError::WorkerPanicked { worker }))
                })
                .collect()
        });

        flags_out.clear();
        for slot in shared.classified {
            if let Some((flags, _)) = slot.into_inner() {
                flags_out.extend(flags);
            }
        }

        let mut stats = FrameStats {
            viewports: 1,
            ..FrameStats::default()
        };
        for r in results {
            stats += r?;
        }
        Ok(stats)
    }
}

fn chunk_size(n: usize, workers: usize) -> usize {
    ((n + workers - 1) / workers).max(1)
}

fn slice_range(worker: usize, chunk: usize, n: usize) -> Range<usize> {
    (worker * chunk).min(n)..((worker + 1) * chunk).min(n)
}

/// State shared by the workers of one viewport pass.
struct Shared<'a> {
    scene: &'a Scene,
    view: &'a ViewTransform,
    post: &'a [PostEffect],
    background: Option<Color>,
    x0: usize,
    vertex_chunk: usize,
    triangle_chunk: usize,
    /// Phase 1 output: projections of each worker's vertex slice
    projected: Vec<OnceLock<Vec<ScreenVertex>>>,
    /// Phase 2 output: flags of each worker's triangle slice plus its clip batch
    classified: Vec<OnceLock<(Vec<TriangleFlags>, ClipBatch)>>,
    barrier: Barrier,
    failed: AtomicBool,
}

impl<'a> Shared<'a> {
    /// Run `f`, converting a panic into the shared failure flag.
    fn guard<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(v) => Some(v),
            Err(_) => {
                self.failed.store(true, Ordering::SeqCst);
                None
            }
        }
    }

    fn aborted(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// One worker's whole pass. Every worker reaches both barriers, even
    /// after a failure, so nobody is left waiting.
    fn run(
        &self,
        worker: usize,
        mut band: FrameBand<'_>,
        dest: &mut [&mut [u32]],
        mut shader: Box<dyn PixelShader>,
    ) -> Result<FrameStats, RenderError> {
        let panicked = Err(RenderError::WorkerPanicked { worker });
        let mut stats = FrameStats::default();

        let ok = self.guard(|| {
            band.clear();
            if let Some(bg) = self.background {
                band.fill(bg);
            }
            self.project(worker);
        });
        self.barrier.wait();
        if ok.is_none() {
            self.barrier.wait();
            return panicked;
        }

        let ok = if self.aborted() {
            Some(())
        } else {
            self.guard(|| stats = self.classify(worker))
        };
        self.barrier.wait();
        if ok.is_none() {
            return panicked;
        }
        if self.aborted() {
            return Ok(stats);
        }

        match self.guard(|| self.draw(&mut band, dest, shader.as_mut())) {
            Some(pixels) => {
                stats.pixels_written = pixels;
                Ok(stats)
            }
            None => panicked,
        }
    }

    fn project(&self, worker: usize) {
        let vertices = &self.scene.vertices;
        let range = slice_range(worker, self.vertex_chunk, vertices.len());
        let projected = vertices[range]
            .iter()
            .map(|v| self.view.project(&v.world_position))
            .collect();
        let _ = self.projected[worker].set(projected);
    }

    fn screen_slices(&self) -> Vec<&[ScreenVertex]> {
        self.projected
            .iter()
            .map(|slot| slot.get().map(Vec::as_slice).unwrap_or(&[]))
            .collect()
    }

    fn classify(&self, worker: usize) -> FrameStats {
        let scene = self.scene;
        let frame = FrameVertices::new(&scene.vertices, self.vertex_chunk, self.screen_slices(), Vec::new());
        let range = slice_range(worker, self.triangle_chunk, scene.triangles.len());

        let mut stats = FrameStats::default();
        let mut batch = ClipBatch::default();
        let flags: Vec<TriangleFlags> = scene.triangles[range]
            .iter()
            .map(|tri| {
                let material = &scene.materials[tri.material];
                let before = batch.triangles.len();
                let f = classify_triangle(tri, material, &frame, self.view, worker as u32, &mut batch);
                if f.clipped {
                    stats.clipped += 1;
                    stats.synthesized += batch.triangles.len() - before;
                } else if f.visible {
                    stats.visible += 1;
                } else if f.backface {
                    stats.culled += 1;
                } else {
                    stats.outside += 1;
                }
                f
            })
            .collect();

        let _ = self.classified[worker].set((flags, batch));
        stats
    }

    fn draw(&self, band: &mut FrameBand<'_>, dest: &mut [&mut [u32]], shader: &mut dyn PixelShader) -> u64 {
        let scene = self.scene;
        let classified: Vec<Option<&(Vec<TriangleFlags>, ClipBatch)>> =
            self.classified.iter().map(OnceLock::get).collect();
        let clipped = classified
            .iter()
            .map(|slot| slot.map(|(_, b)| b.vertices.as_slice()).unwrap_or(&[]))
            .collect();
        let frame = FrameVertices::new(&scene.vertices, self.vertex_chunk, self.screen_slices(), clipped);
        let ctx = ShadeContext {
            scene,
            vertices: &frame,
            eye: self.view.eye,
        };

        let mut raster = Rasterizer::new(shader, self.view.width as u32, self.view.near_epsilon);
        if !band.is_empty() {
            for (w, slot) in classified.iter().enumerate() {
                let Some((flags, batch)) = slot else {
                    continue;
                };
                let first = w * self.triangle_chunk;
                for (i, _) in flags.iter().enumerate().filter(|(_, f)| f.visible) {
                    let tri = &scene.triangles[first + i];
                    let vertices = tri.vertices.map(VertexId::Scene);
                    let setup = TriangleSetup {
                        vertices,
                        screen: vertices.map(|id| frame.screen(id)),
                        material: tri.material,
                        node: tri.node,
                    };
                    raster.draw(&ctx, band, &setup);
                }
                for tri in &batch.triangles {
                    let setup = TriangleSetup {
                        vertices: tri.vertices,
                        screen: tri.vertices.map(|id| frame.screen(id)),
                        material: tri.material,
                        node: tri.node,
                    };
                    raster.draw(&ctx, band, &setup);
                }
            }
        }
        let pixels = raster.pixels_written;

        band.composite();
        for effect in self.post {
            effect.apply(band);
        }

        let width = band.width() as usize;
        for (row, dst) in band.rows().zip(dest.iter_mut()) {
            let src = band.color_row(row);
            for (d, c) in dst[self.x0..self.x0 + width].iter_mut().zip(src) {
                *d = c.0;
            }
        }
        pixels
    }
}
