//! End-to-end frames rendered headless into the CPU pixel buffer.
//!
//! The pipeline double-buffers triangles, so a scene becomes visible on
//! the second update: frame 0 projects, frame 1 renders what frame 0
//! projected.

use softrast::engine::{Engine, EngineFlags, Level};
use softrast::maths::{Color, Vec3};
use softrast::scene::{Aabb, Light, Object, ObjectKind, Scene, Sector, Texture};

/// A camera-facing quad of two triangles spanning [-half, half] on both
/// axes at the given depth.
fn quad(half: f32, z: f32, color: Color) -> Object {
    let mut object = Object::new(ObjectKind::Model);

    object.add_vertex_color(Vec3::new(-half, half, z), color);
    object.add_vertex_color(Vec3::new(half, half, z), color);
    object.add_vertex_color(Vec3::new(-half, -half, z), color);
    object.add_vertex_color(Vec3::new(half, -half, z), color);

    object.add_polygon(0, 1, 2);
    object.add_polygon(1, 3, 2);

    object
}

struct SceneSetup(Box<dyn Fn(&mut Scene) + Send + Sync>);

impl Level for SceneSetup {
    fn load(&mut self, scene: &mut Scene) {
        scene.camera.position = Vec3::default();
        scene.camera.fov = 90;
        self.0(scene);
    }
}

fn engine_with(flags: EngineFlags, setup: impl Fn(&mut Scene) + Send + Sync + 'static) -> Engine {
    let mut engine = Engine::new(100, 100, flags, None);

    engine.enter_scene(Box::new(SceneSetup(Box::new(setup))));

    engine
}

fn render_frames(engine: &mut Engine, frames: usize) {
    for _ in 0..frames {
        engine.update(16);
    }
}

fn count_pixels(engine: &Engine, argb: u32) -> usize {
    let mut count = 0;

    for y in 0..engine.raster_height() {
        for x in 0..engine.raster_width() {
            if engine.pixel(x, y) == argb {
                count += 1;
            }
        }
    }

    count
}

#[test]
fn unlit_quad_colors_the_center_and_leaves_the_corners() {
    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, |scene| {
        let mut quad = quad(10.0, 100.0, Color::new(200, 0, 0));

        quad.has_lighting = false;
        scene.add(quad);
    });

    render_frames(&mut engine, 2);

    assert_eq!(engine.pixel(50, 50), Color::new(200, 0, 0).to_argb());
    assert_eq!(engine.pixel(0, 0), Color::BLACK.to_argb());
}

#[test]
fn threaded_and_serial_pipelines_agree() {
    let build = |scene: &mut Scene| {
        let mut quad = quad(10.0, 100.0, Color::new(200, 0, 0));

        quad.has_lighting = false;
        scene.add(quad);
    };

    let mut serial = engine_with(EngineFlags::DISABLE_MULTITHREADING, build);
    let mut threaded = engine_with(EngineFlags::empty(), build);

    render_frames(&mut serial, 3);
    render_frames(&mut threaded, 3);

    for y in 0..100 {
        for x in 0..100 {
            assert_eq!(serial.pixel(x, y), threaded.pixel(x, y), "pixel ({x},{y})");
        }
    }
}

#[test]
fn nearer_quad_occludes_farther_quad() {
    let green = Color::new(0, 255, 0);
    let blue = Color::new(0, 0, 255);

    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, move |scene| {
        let mut front = quad(10.0, 100.0, green);
        // Same screen extent at double the distance.
        let mut back = quad(20.0, 200.0, blue);

        front.has_lighting = false;
        back.has_lighting = false;

        scene.add(front);
        scene.add(back);
    });

    render_frames(&mut engine, 2);

    assert_eq!(engine.pixel(50, 50), green.to_argb());
    assert!(count_pixels(&engine, green.to_argb()) > 100);
    assert_eq!(count_pixels(&engine, blue.to_argb()), 0);
}

#[test]
fn depth_order_is_independent_of_draw_order() {
    let green = Color::new(0, 255, 0);
    let blue = Color::new(0, 0, 255);

    // The far quad enters the scene first this time.
    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, move |scene| {
        let mut back = quad(20.0, 200.0, blue);
        let mut front = quad(10.0, 100.0, green);

        front.has_lighting = false;
        back.has_lighting = false;

        scene.add(back);
        scene.add(front);
    });

    render_frames(&mut engine, 2);

    assert_eq!(engine.pixel(50, 50), green.to_argb());
    assert_eq!(count_pixels(&engine, blue.to_argb()), 0);
}

#[test]
fn point_light_boosts_only_its_own_channels() {
    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, |scene| {
        // Lighting comes from the point light alone.
        scene.settings.ambient_light_factor = 0.0;
        scene.settings.brightness = 1.0;

        let mut lit_quad = quad(10.0, 100.0, Color::new(255, 255, 255));

        lit_quad.is_flat_shaded = true;
        scene.add(lit_quad);

        let mut light = Light::default();

        light.set_color(Color::new(255, 0, 0));
        light.power = 1.0;
        light.range = 100.0;

        let mut light_object = Object::new(ObjectKind::Light(light));

        light_object.position = Vec3::new(0.0, 0.0, 80.0);
        scene.add(light_object);
    });

    render_frames(&mut engine, 2);

    let center = Color::from_argb(engine.pixel(50, 50));

    assert!(center.r >= center.g && center.r >= center.b);
    assert_eq!(center.g, center.b);
}

#[test]
fn sector_assignment_culls_until_the_camera_enters() {
    let red = Color::new(200, 0, 0);

    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, move |scene| {
        let mut sealed = quad(10.0, 100.0, red);

        sealed.has_lighting = false;
        sealed.sector_id = 1;
        scene.add(sealed);

        scene.add_sector(Sector {
            id: 1,
            bounds: Aabb {
                corner_a: Vec3::new(500.0, -50.0, -50.0),
                corner_b: Vec3::new(600.0, 50.0, 50.0),
            },
        });
    });

    render_frames(&mut engine, 3);

    assert_eq!(count_pixels(&engine, red.to_argb()), 0);

    // Teleport the camera inside the sector's bounds, and move the quad
    // with it so it stays in view.
    {
        let scene = engine.active_scene().unwrap();
        let mut scene = scene.write().unwrap();

        scene.camera.position = Vec3::new(550.0, 0.0, 0.0);
        scene.objects_mut()[0].position = Vec3::new(550.0, 0.0, 0.0);
    }

    render_frames(&mut engine, 3);

    assert!(count_pixels(&engine, red.to_argb()) > 100);
}

#[test]
fn visibility_fades_colored_surfaces_toward_the_background() {
    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, |scene| {
        // The quad sits halfway to the visibility limit.
        scene.settings.visibility = 200;
        scene.settings.ambient_light_factor = 0.0;

        let faded = quad(10.0, 100.0, Color::new(200, 0, 0));

        scene.add(faded);
    });

    render_frames(&mut engine, 2);

    let center = Color::from_argb(engine.pixel(50, 50));

    // Half the channel value has faded into the black background.
    assert!(center.r < 130 && center.r > 70, "got {}", center.r);
}

#[test]
fn textured_quad_samples_its_texture() {
    let red_texture = Color::new(255, 0, 0);

    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, move |scene| {
        let texture_id = scene.add_texture(
            "solid-red",
            Texture::from_argb(8, 8, vec![red_texture.to_argb(); 64]),
        );

        let mut textured = quad(10.0, 100.0, Color::BLACK);

        textured.has_lighting = false;
        textured.set_texture(texture_id);
        scene.add(textured);
    });

    render_frames(&mut engine, 2);

    assert_eq!(engine.pixel(50, 50), red_texture.to_argb());
}

#[test]
fn color_key_texels_leave_the_background_visible() {
    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, |scene| {
        // Transparent everywhere: alpha 0, as the loader produces for
        // color-keyed pixels.
        let texture_id = scene.add_texture("keyed", Texture::from_argb(8, 8, vec![0u32; 64]));

        let mut keyed = quad(10.0, 100.0, Color::BLACK);

        keyed.has_lighting = false;
        keyed.set_texture(texture_id);
        scene.add(keyed);
    });

    render_frames(&mut engine, 2);

    assert_eq!(engine.pixel(50, 50), Color::BLACK.to_argb());
}

#[test]
fn wireframe_mode_outlines_without_filling() {
    let mut engine = engine_with(
        EngineFlags::DISABLE_MULTITHREADING | EngineFlags::SHOW_WIREFRAME,
        |scene| {
            let mut quad = quad(10.0, 100.0, Color::new(200, 0, 0));

            quad.has_lighting = false;
            scene.add(quad);
        },
    );

    render_frames(&mut engine, 2);

    // The quad projects to [30, 70] x [30, 70]: its top edge is drawn,
    // while interior pixels away from the edges and the shared diagonal
    // stay background.
    assert_eq!(engine.pixel(50, 30), Color::new(255, 255, 255).to_argb());
    assert_eq!(engine.pixel(40, 40), Color::BLACK.to_argb());
}

#[test]
fn pixel_filter_renders_at_half_resolution() {
    let mut engine = engine_with(
        EngineFlags::DISABLE_MULTITHREADING | EngineFlags::PIXEL_FILTER,
        |scene| {
            let mut quad = quad(10.0, 100.0, Color::new(200, 0, 0));

            quad.has_lighting = false;
            scene.add(quad);
        },
    );

    assert_eq!(engine.raster_width(), 50);
    assert_eq!(engine.raster_height(), 50);

    render_frames(&mut engine, 2);

    // Center of the half-resolution raster.
    assert_eq!(engine.pixel(25, 25), Color::new(200, 0, 0).to_argb());

    // Presentation scales the raster back up to window size.
    let mut out = vec![0u32; 100 * 100];

    engine.present_into(&mut out);

    assert_eq!(out[50 * 100 + 50], Color::new(200, 0, 0).to_argb());
}

#[test]
fn runtime_commands_mutate_the_active_scene() {
    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, |scene| {
        let mut quad = quad(10.0, 100.0, Color::new(200, 0, 0));

        quad.has_lighting = false;
        scene.add(quad);
    });

    render_frames(&mut engine, 2);

    {
        let scene = engine.active_scene().unwrap();
        let mut scene = scene.write().unwrap();

        softrast::commands::execute("backgroundColor 0,0,255", &mut scene.settings);
    }

    render_frames(&mut engine, 2);

    assert_eq!(engine.pixel(0, 0), Color::new(0, 0, 255).to_argb());
    assert_eq!(engine.pixel(50, 50), Color::new(200, 0, 0).to_argb());
}

#[test]
fn exiting_the_last_scene_stops_the_engine() {
    let mut engine = engine_with(EngineFlags::DISABLE_MULTITHREADING, |_| {});

    assert!(!engine.is_stopped());

    engine.exit_scene();

    assert!(engine.is_stopped());
}
