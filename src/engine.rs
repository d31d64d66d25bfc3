use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use bitflags::bitflags;

use crate::commands::CommandLine;
use crate::error::fatal;
use crate::font::TextWriter;
use crate::maths::Color;
use crate::rasterizer::{
    FrameBuffers, Illuminator, Projector, RasterFilter, Rasterizer, RenderDriver, TriangleBuffer,
    available_render_workers, render_buffered_frame,
};
use crate::scene::{Input, Scene};
use crate::stats::DebugStats;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EngineFlags: u32 {
        const DEBUG_STATS = 1 << 0;
        const DEBUG_COMMAND_LINE = 1 << 1;
        const SHOW_WIREFRAME = 1 << 2;
        const PIXEL_FILTER = 1 << 3;
        const DISABLE_MULTITHREADING = 1 << 4;
        const FPS_30 = 1 << 5;
        const DISABLE_WINDOW_RESIZE = 1 << 6;
    }
}

pub const MAX_SCENE_STACK_DEPTH: usize = 10;

const WIREFRAME_COLOR: Color = Color::new(255, 255, 255);

/// Game-side behavior of one scene: builds the scene contents on load
/// and advances its logic each frame.
pub trait Level: Send {
    fn load(&mut self, scene: &mut Scene);
    fn on_start(&mut self, _scene: &mut Scene) {}
    fn on_update(&mut self, _scene: &mut Scene, _dt: i32) {}
}

struct SceneEntry {
    level: Box<dyn Level>,
    scene: Arc<RwLock<Scene>>,
    has_initialized: bool,
}

enum RenderBackend {
    /// Render-driver thread plus worker pool; previous-frame rendering
    /// overlaps current-frame projection.
    Threaded(RenderDriver),
    /// Every stage runs on the caller's thread in order.
    Serial {
        rasterizer: Rasterizer,
        illuminator: Illuminator,
    },
}

/// The engine core: owns the pipeline stages, the frame buffers, the
/// scene stack and the per-frame driver loop. Windowing and input stay
/// outside; the shell feeds `input`, calls `update` once per frame and
/// blits `present_into`'s output.
pub struct Engine {
    flags: EngineFlags,
    window_width: usize,
    window_height: usize,
    raster_width: usize,
    raster_height: usize,
    buffers: Arc<FrameBuffers>,
    triangle_buffer: Arc<TriangleBuffer>,
    projector: Projector,
    raster_filter: RasterFilter,
    render: RenderBackend,
    scene_stack: Vec<SceneEntry>,
    pub input: Input,
    stats: DebugStats,
    command_line: CommandLine,
    text_writer: Option<TextWriter>,
    frame: u64,
    is_stopped: bool,
}

impl Engine {
    pub fn new(
        width: usize,
        height: usize,
        flags: EngineFlags,
        debug_font_path: Option<&Path>,
    ) -> Self {
        let (raster_width, raster_height) = Self::raster_dimensions(width, height, flags);
        let buffers = Arc::new(FrameBuffers::new(raster_width, raster_height));
        let triangle_buffer = Arc::new(TriangleBuffer::new());

        let worker_count = available_render_workers();
        let render = if flags.contains(EngineFlags::DISABLE_MULTITHREADING) || worker_count < 1 {
            RenderBackend::Serial {
                rasterizer: Rasterizer::new(buffers.clone()),
                illuminator: Illuminator::new(),
            }
        } else {
            RenderBackend::Threaded(RenderDriver::spawn(
                triangle_buffer.clone(),
                buffers.clone(),
                worker_count,
            ))
        };

        let wants_hud = flags
            .intersects(EngineFlags::DEBUG_STATS | EngineFlags::DEBUG_COMMAND_LINE);
        let text_writer = match debug_font_path {
            Some(path) if wants_hud => match TextWriter::from_file(path) {
                Ok(text_writer) => Some(text_writer),
                Err(error) => fatal(error),
            },
            _ => None,
        };

        Self {
            flags,
            window_width: width,
            window_height: height,
            raster_width,
            raster_height,
            buffers,
            triangle_buffer,
            projector: Projector::new(raster_width, raster_height),
            raster_filter: RasterFilter::new(raster_width, raster_height),
            render,
            scene_stack: Vec::new(),
            input: Input::default(),
            stats: DebugStats::default(),
            command_line: CommandLine::default(),
            text_writer,
            frame: 0,
            is_stopped: false,
        }
    }

    fn raster_dimensions(width: usize, height: usize, flags: EngineFlags) -> (usize, usize) {
        if flags.contains(EngineFlags::PIXEL_FILTER) {
            (width / 2, height / 2)
        } else {
            (width, height)
        }
    }

    pub fn flags(&self) -> EngineFlags {
        self.flags
    }

    pub fn window_width(&self) -> usize {
        self.window_width
    }

    pub fn window_height(&self) -> usize {
        self.window_height
    }

    pub fn raster_width(&self) -> usize {
        self.raster_width
    }

    pub fn raster_height(&self) -> usize {
        self.raster_height
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_stopped(&self) -> bool {
        self.is_stopped
    }

    pub fn stop(&mut self) {
        self.is_stopped = true;
    }

    pub fn active_scene(&self) -> Option<Arc<RwLock<Scene>>> {
        self.scene_stack.last().map(|entry| entry.scene.clone())
    }

    /// Suspends the active scene and pushes a new one, which is loaded
    /// and lit on first entry.
    pub fn enter_scene(&mut self, level: Box<dyn Level>) {
        if let Some(active) = self.scene_stack.last() {
            active.scene.write().unwrap().suspend();
            self.input.reset_key_state();

            if self.scene_stack.len() > MAX_SCENE_STACK_DEPTH {
                fatal(crate::error::EngineError::Capacity(
                    "scene stack size limit exceeded",
                ));
            }
        }

        self.scene_stack.push(SceneEntry {
            level,
            scene: Arc::new(RwLock::new(Scene::new())),
            has_initialized: false,
        });

        self.activate_top_scene();
    }

    /// Pops the active scene; the one beneath resumes, and popping the
    /// last scene stops the engine.
    pub fn exit_scene(&mut self) {
        self.scene_stack.pop();

        match self.scene_stack.last() {
            Some(entry) => {
                entry.scene.write().unwrap().resume();
                self.activate_top_scene();
            }
            None => self.stop(),
        }
    }

    /// Replaces the active scene without growing the stack.
    pub fn switch_scene(&mut self, level: Box<dyn Level>) {
        self.scene_stack.pop();
        self.scene_stack.push(SceneEntry {
            level,
            scene: Arc::new(RwLock::new(Scene::new())),
            has_initialized: false,
        });

        self.activate_top_scene();
    }

    fn activate_top_scene(&mut self) {
        self.triangle_buffer.reset_all();

        let Some(entry) = self.scene_stack.last_mut() else {
            return;
        };

        let mut scene = entry.scene.write().unwrap();

        if !entry.has_initialized {
            entry.level.load(&mut scene);
            entry.level.on_start(&mut scene);
            entry.has_initialized = true;
        }

        scene.confirm_textures();

        // Static light precomputation completes before the scene's
        // first frame.
        Illuminator::precompute_static_intensities(&mut scene);
    }

    /// Runs one frame: render the previous frame's triangles while
    /// projecting this frame's, then advance game logic. The pixel
    /// buffer holds the finished frame when this returns.
    pub fn update(&mut self, dt: i32) {
        if self.is_stopped || self.scene_stack.is_empty() {
            return;
        }

        let frame_start = Instant::now();

        self.stats.track_frame_time();
        self.stats.reset_counters();

        let scene_arc = self.scene_stack.last().unwrap().scene.clone();

        scene_arc.write().unwrap().confirm_textures();

        let background_color = scene_arc.read().unwrap().settings.background_color;

        self.buffers.clear(background_color.to_argb());

        if self.flags.contains(EngineFlags::SHOW_WIREFRAME) {
            self.update_wireframe(&scene_arc);
        } else {
            self.update_scene(&scene_arc);
        }

        self.draw_hud();

        self.stats.track_update_time();

        {
            let entry = self.scene_stack.last_mut().unwrap();
            let mut scene = entry.scene.write().unwrap();

            scene.update(dt, &self.input);
            entry.level.on_update(&mut scene, dt);
        }

        self.stats.log_update_time();

        // Mouse deltas are per-frame; key state persists until released.
        self.input.mouse_dx = 0.0;
        self.input.mouse_dy = 0.0;

        if self.flags.contains(EngineFlags::FPS_30) {
            while frame_start.elapsed().as_millis() < 33 {
                std::thread::yield_now();
            }
        }

        self.stats.log_frame_time();
        self.triangle_buffer.reset();
        self.frame += 1;
    }

    fn update_scene(&mut self, scene_arc: &Arc<RwLock<Scene>>) {
        // In multithreaded mode the first frame only projects; from the
        // next frame on, previous-frame rendering runs in parallel with
        // projection and raster filtering here.
        let renders_previous_frame = self.frame > 0;

        if renders_previous_frame
            && let RenderBackend::Threaded(driver) = &self.render
        {
            driver.begin_frame(scene_arc.clone());
        }

        self.project_current_frame(scene_arc);

        match &mut self.render {
            RenderBackend::Threaded(driver) => {
                if renders_previous_frame {
                    let scanline_count = driver.wait_frame();

                    self.stats.set_scanline_count(scanline_count);
                }
            }
            RenderBackend::Serial {
                rasterizer,
                illuminator,
            } => {
                self.stats.track_draw_time();

                let scene = scene_arc.read().unwrap();
                let mut pool = self.triangle_buffer.secondary();

                render_buffered_frame(&scene, &mut pool, rasterizer, illuminator, None);

                self.stats
                    .set_scanline_count(rasterizer.total_buffered_scanlines());
                rasterizer.clear_scanlines();
                self.stats.log_draw_time();
            }
        }
    }

    fn update_wireframe(&mut self, scene_arc: &Arc<RwLock<Scene>>) {
        self.project_current_frame(scene_arc);

        // Outline the previously buffered frame, matching the buffered
        // pipeline's one-frame latency.
        let pool = self.triangle_buffer.secondary();

        for &index in &pool.queue {
            let triangle = &pool.triangles[index as usize];
            let [v0, v1, v2] = &triangle.vertices;
            let argb = WIREFRAME_COLOR.to_argb();

            self.buffers
                .draw_line(v0.coordinate.x, v0.coordinate.y, v1.coordinate.x, v1.coordinate.y, argb);
            self.buffers
                .draw_line(v1.coordinate.x, v1.coordinate.y, v2.coordinate.x, v2.coordinate.y, argb);
            self.buffers
                .draw_line(v2.coordinate.x, v2.coordinate.y, v0.coordinate.x, v0.coordinate.y, argb);
        }
    }

    fn project_current_frame(&mut self, scene_arc: &Arc<RwLock<Scene>>) {
        let scene = scene_arc.read().unwrap();
        let mut pool = self.triangle_buffer.primary();

        self.stats.track_screen_projection_time();
        self.projector
            .project_scene(&scene, &mut pool, &mut self.raster_filter, &mut self.stats);
        self.stats.log_screen_projection_time();

        self.stats.track_hidden_surface_removal_time();

        loop {
            match self.raster_filter.next(&pool.triangles) {
                Some(index) => pool.buffer(index),
                None => break,
            }
        }

        self.stats.log_hidden_surface_removal_time();
        self.stats
            .set_triangle_counts(pool.requested, pool.queue.len());
    }

    fn draw_hud(&self) {
        let Some(text_writer) = &self.text_writer else {
            return;
        };

        if self.flags.contains(EngineFlags::DEBUG_STATS) {
            text_writer.draw(&self.buffers, &self.stats.format_lines());
        }

        if self.flags.contains(EngineFlags::DEBUG_COMMAND_LINE) && self.command_line.is_open() {
            let prompt = format!("> {}", self.command_line.current_command());

            text_writer.draw_bottom_line(&self.buffers, &prompt);
        }
    }

    pub fn is_command_line_open(&self) -> bool {
        self.command_line.is_open()
    }

    pub fn open_command_line(&mut self) {
        if self.flags.contains(EngineFlags::DEBUG_COMMAND_LINE) {
            self.command_line.open();
        }
    }

    pub fn cancel_command_line(&mut self) {
        self.command_line.close();
    }

    pub fn command_line_character(&mut self, character: char) {
        self.command_line.queue_character(character);
    }

    pub fn command_line_backspace(&mut self) {
        self.command_line.backspace();
    }

    /// Applies the queued command to the active scene and re-runs the
    /// static light precomputation, since the command may have changed
    /// the scene lighting.
    pub fn execute_command_line(&mut self) {
        let Some(entry) = self.scene_stack.last() else {
            self.command_line.close();
            return;
        };

        let mut scene = entry.scene.write().unwrap();

        self.command_line
            .execute_current_command(&mut scene.settings);
        Illuminator::precompute_static_intensities(&mut scene);
    }

    pub fn toggle_flag(&mut self, flag: EngineFlags) {
        self.flags.toggle(flag);

        if flag == EngineFlags::PIXEL_FILTER {
            self.resize(self.window_width, self.window_height);
        }
    }

    /// Rebuilds the raster targets for a new window size. Only safe
    /// between frames, when no render is in flight.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.window_width = width;
        self.window_height = height;

        let (raster_width, raster_height) = Self::raster_dimensions(width, height, self.flags);

        self.raster_width = raster_width;
        self.raster_height = raster_height;
        self.buffers = Arc::new(FrameBuffers::new(raster_width, raster_height));
        self.projector = Projector::new(raster_width, raster_height);
        self.raster_filter = RasterFilter::new(raster_width, raster_height);

        match &mut self.render {
            RenderBackend::Threaded(driver) => driver.resize(self.buffers.clone()),
            RenderBackend::Serial { rasterizer, .. } => {
                *rasterizer = Rasterizer::new(self.buffers.clone());
            }
        }
    }

    /// Copies the finished frame into a presentation buffer, scaling up
    /// 2x when the pixel filter halves the raster resolution.
    pub fn present_into(&self, out: &mut [u32]) {
        let size_factor = if self.flags.contains(EngineFlags::PIXEL_FILTER) {
            2
        } else {
            1
        };

        self.buffers.present_into(out, size_factor);
    }

    /// Reads one raster pixel; used by the HUD cursor probe and tests.
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.buffers.pixel_at(x, y)
    }
}
