use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Span {
    started: Instant,
    millis: u128,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            millis: 0,
        }
    }
}

impl Span {
    fn track(&mut self) {
        self.started = Instant::now();
    }

    fn log(&mut self) {
        self.millis = self.started.elapsed().as_millis();
    }
}

/// Per-frame pipeline timings and scene counters for the HUD overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugStats {
    screen_projection: Span,
    hidden_surface_removal: Span,
    illumination: Span,
    draw: Span,
    update: Span,
    frame: Span,
    total_polygons: usize,
    total_vertices: usize,
    total_projected_triangles: usize,
    total_drawn_triangles: usize,
    total_scanlines: usize,
}

impl DebugStats {
    pub fn track_screen_projection_time(&mut self) {
        self.screen_projection.track();
    }

    pub fn log_screen_projection_time(&mut self) {
        self.screen_projection.log();
    }

    pub fn track_hidden_surface_removal_time(&mut self) {
        self.hidden_surface_removal.track();
    }

    pub fn log_hidden_surface_removal_time(&mut self) {
        self.hidden_surface_removal.log();
    }

    pub fn track_illumination_time(&mut self) {
        self.illumination.track();
    }

    pub fn log_illumination_time(&mut self) {
        self.illumination.log();
    }

    pub fn track_draw_time(&mut self) {
        self.draw.track();
    }

    pub fn log_draw_time(&mut self) {
        self.draw.log();
    }

    pub fn track_update_time(&mut self) {
        self.update.track();
    }

    pub fn log_update_time(&mut self) {
        self.update.log();
    }

    pub fn track_frame_time(&mut self) {
        self.frame.track();
    }

    pub fn log_frame_time(&mut self) {
        self.frame.log();
    }

    pub fn count_polygons(&mut self, count: usize) {
        self.total_polygons += count;
    }

    pub fn count_vertices(&mut self, count: usize) {
        self.total_vertices += count;
    }

    pub fn set_triangle_counts(&mut self, projected: usize, drawn: usize) {
        self.total_projected_triangles = projected;
        self.total_drawn_triangles = drawn;
    }

    pub fn set_scanline_count(&mut self, scanlines: usize) {
        self.total_scanlines = scanlines;
    }

    pub fn fps(&self) -> u128 {
        if self.frame.millis == 0 {
            0
        } else {
            1000 / self.frame.millis
        }
    }

    pub fn reset_counters(&mut self) {
        self.total_polygons = 0;
        self.total_vertices = 0;
        self.total_projected_triangles = 0;
        self.total_drawn_triangles = 0;
        self.total_scanlines = 0;
    }

    /// The HUD text block, one stat per line.
    pub fn format_lines(&self) -> String {
        format!(
            "Screen projection time: {}\n\
             Hidden surface removal time: {}\n\
             Illumination time: {}\n\
             Draw time: {}\n\
             Update time: {}\n\
             Frame time: {}\n\
             FPS: {}\n\
             Vertices: {}\n\
             Polygons: {}\n\
             Triangles projected: {}\n\
             Triangles drawn: {}\n\
             Scanlines: {}",
            self.screen_projection.millis,
            self.hidden_surface_removal.millis,
            self.illumination.millis,
            self.draw.millis,
            self.update.millis,
            self.frame.millis,
            self.fps(),
            self.total_vertices,
            self.total_polygons,
            self.total_projected_triangles,
            self.total_drawn_triangles,
            self.total_scanlines,
        )
    }
}
