mod buffers;
pub use buffers::{FrameBuffers, depth_to_bits};
mod illuminator;
pub use illuminator::Illuminator;
mod projector;
pub use projector::Projector;
mod raster_filter;
pub use raster_filter::{
    MAX_RASTER_FILTER_ZONES, MIN_COVER_TRIANGLE_SIZE, RASTER_FILTER_ZONE_RANGE, RasterFilter,
};
mod render_thread;
pub use render_thread::{RenderDriver, available_render_workers, render_buffered_frame};
mod scanline;
pub use scanline::{MIPMAP_DISTANCE_INTERVAL, Rasterizer, Scanline};
mod triangle_buffer;
pub use triangle_buffer::{
    PolygonRef, SERIAL_ILLUMINATION_NONSTATIC_TRIANGLE_LIMIT, TRIANGLE_POOL_SIZE, Triangle,
    TriangleBuffer, TrianglePool, Vertex2d,
};
