use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use rayon::prelude::*;

use crate::scene::Scene;

use super::buffers::FrameBuffers;
use super::illuminator::Illuminator;
use super::scanline::Rasterizer;
use super::triangle_buffer::{
    SERIAL_ILLUMINATION_NONSTATIC_TRIANGLE_LIMIT, TriangleBuffer, TrianglePool,
};

/// How many render workers the machine supports: one thread per core
/// after the main and render-driver threads are discounted. Zero means
/// multithreading should be forgone entirely.
pub fn available_render_workers() -> usize {
    let cpu_count = std::thread::available_parallelism().map_or(1, |count| count.get());

    cpu_count.saturating_sub(2)
}

/// Renders the previous frame's buffered triangles: illumination, then
/// serial scanline dispatch, then scanline painting.
///
/// Triangles cannot be dispatched in parallel, since the queue is in
/// zone order from closest to furthest, which mitigates overdraw. The
/// two other stages fan out across `workers` when provided: triangles
/// partition by pool slot, scanlines by screen row residue, so no two
/// workers ever touch the same data.
pub fn render_buffered_frame(
    scene: &Scene,
    pool: &mut TrianglePool,
    rasterizer: &mut Rasterizer,
    illuminator: &mut Illuminator,
    workers: Option<(&rayon::ThreadPool, usize)>,
) {
    illuminator.begin_frame(scene);
    rasterizer.set_background_color(scene.settings.background_color);
    rasterizer.set_visibility(scene.settings.visibility);

    let TrianglePool {
        triangles,
        requested,
        queue,
    } = pool;

    let total_non_static = queue
        .iter()
        .filter(|&&index| {
            let triangle = &triangles[index as usize];

            scene
                .object(triangle.source.object)
                .is_none_or(|object| !object.is_static)
        })
        .count();

    match workers {
        Some((worker_pool, _)) if total_non_static > SERIAL_ILLUMINATION_NONSTATIC_TRIANGLE_LIMIT => {
            let illuminator = &*illuminator;

            worker_pool.install(|| {
                triangles[..*requested]
                    .par_iter_mut()
                    .filter(|triangle| triangle.is_queued)
                    .for_each(|triangle| illuminator.illuminate_triangle(triangle, scene));
            });
        }
        _ => {
            for &index in queue.iter() {
                illuminator.illuminate_triangle(&mut triangles[index as usize], scene);
            }
        }
    }

    for &index in queue.iter() {
        let triangle = &triangles[index as usize];
        let texture = scene
            .object(triangle.source.object)
            .and_then(|object| object.texture);

        rasterizer.dispatch_triangle(triangle, texture);
    }

    match workers {
        Some((worker_pool, worker_count)) => {
            let rasterizer = &*rasterizer;

            worker_pool.install(|| {
                (0..worker_count).into_par_iter().for_each(|worker_id| {
                    for scanline in rasterizer.scanlines() {
                        if scanline.y as usize % worker_count == worker_id {
                            rasterizer.triangle_scanline(scanline, scene);
                        }
                    }
                });
            });
        }
        None => {
            for scanline in rasterizer.scanlines() {
                rasterizer.triangle_scanline(scanline, scene);
            }
        }
    }
}

enum RenderOrder {
    Frame { scene: Arc<RwLock<Scene>> },
    Resize { buffers: Arc<FrameBuffers> },
    Quit,
}

/// The render-driver thread plus its worker pool. The driver waits for
/// per-frame orders from the main thread and acknowledges completion,
/// so previous-frame rendering overlaps next-frame projection.
pub struct RenderDriver {
    order_tx: SyncSender<RenderOrder>,
    done_rx: Receiver<usize>,
    handle: Option<JoinHandle<()>>,
    worker_count: usize,
}

impl RenderDriver {
    pub fn spawn(
        triangle_buffer: Arc<TriangleBuffer>,
        buffers: Arc<FrameBuffers>,
        worker_count: usize,
    ) -> Self {
        let (order_tx, order_rx) = sync_channel::<RenderOrder>(1);
        let (done_tx, done_rx) = sync_channel::<usize>(1);

        let handle = std::thread::spawn(move || {
            let worker_pool = rayon::ThreadPoolBuilder::new()
                .num_threads(worker_count)
                .build()
                .expect("failed to build the render worker pool");
            let mut rasterizer = Rasterizer::new(buffers);
            let mut illuminator = Illuminator::new();

            loop {
                match order_rx.recv() {
                    Ok(RenderOrder::Frame { scene }) => {
                        {
                            let scene = scene.read().unwrap();
                            let mut pool = triangle_buffer.secondary();

                            render_buffered_frame(
                                &scene,
                                &mut pool,
                                &mut rasterizer,
                                &mut illuminator,
                                Some((&worker_pool, worker_count)),
                            );
                        }

                        let scanline_count = rasterizer.total_buffered_scanlines();

                        rasterizer.clear_scanlines();

                        if done_tx.send(scanline_count).is_err() {
                            break;
                        }
                    }
                    Ok(RenderOrder::Resize { buffers }) => {
                        rasterizer = Rasterizer::new(buffers);
                    }
                    Ok(RenderOrder::Quit) | Err(_) => break,
                }
            }
        });

        Self {
            order_tx,
            done_rx,
            handle: Some(handle),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Kicks off rendering of the secondary triangle pool. The caller
    /// must pair this with `wait_frame` before touching that pool.
    pub fn begin_frame(&self, scene: Arc<RwLock<Scene>>) {
        self.order_tx
            .send(RenderOrder::Frame { scene })
            .expect("render driver is gone");
    }

    /// Blocks until the in-flight frame is fully painted, returning the
    /// number of scanlines the frame produced.
    pub fn wait_frame(&self) -> usize {
        self.done_rx.recv().expect("render driver is gone")
    }

    pub fn resize(&self, buffers: Arc<FrameBuffers>) {
        self.order_tx
            .send(RenderOrder::Resize { buffers })
            .expect("render driver is gone");
    }
}

impl Drop for RenderDriver {
    fn drop(&mut self) {
        let _ = self.order_tx.send(RenderOrder::Quit);

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
