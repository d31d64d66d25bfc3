use std::path::Path;

use softrast::engine::{Engine, EngineFlags, Level};
use softrast::maths::{Color, Vec3};
use softrast::scene::{self, Scene};
use softrast::window::App;

/// A small showcase scene: rolling terrain, a few static cubes, an
/// orbiting point light and colored ambient light.
struct Default3dScene;

impl Level for Default3dScene {
    fn load(&mut self, scene: &mut Scene) {
        let mut mesh = scene::grid_mesh(100, 40, 50.0);

        mesh.position = Vec3::new(-1000.0, 0.0, -1000.0);
        mesh.is_static = true;
        mesh.is_flat_shaded = true;
        mesh.set_vertex_offsets(|_, _, offset| {
            offset.y = rand::random_range(0.0..50.0);
        });

        scene.add(mesh);

        let positions = [
            Vec3::new(-200.0, 200.0, 500.0),
            Vec3::new(50.0, 150.0, 500.0),
            Vec3::new(200.0, 100.0, 500.0),
        ];

        for (index, position) in positions.iter().enumerate() {
            let mut cube = scene::cube(100.0 / (index + 1) as f32);

            cube.position = *position;
            cube.is_static = true;
            cube.rotate(Vec3::new(0.5, 0.5 * index as f32, -0.3));

            scene.add(cube);
        }

        let mut oscillating_cube = scene::cube(50.0);

        oscillating_cube.position = Vec3::new(0.0, 0.0, 1500.0);
        scene.add_keyed("oscillatingCube", oscillating_cube);

        let mut light = softrast::scene::Light::default();

        light.set_color(Color::new(0, 200, 255));
        light.range = 1000.0;

        let mut light_object =
            softrast::scene::Object::new(softrast::scene::ObjectKind::Light(light));

        light_object.position = Vec3::new(0.0, 100.0, 2000.0);
        scene.add_keyed("light", light_object);

        scene.settings.background_color = Color::new(75, 0, 50);
        scene.settings.brightness = 0.2;
        scene.settings.ambient_light_color = Color::new(255, 0, 200);
        scene.settings.ambient_light_vector = Vec3::new(0.0, -1.0, 1.0);
        scene.settings.ambient_light_factor = 0.6;
    }

    fn on_update(&mut self, scene: &mut Scene, _dt: i32) {
        let running_time = scene.running_time() as f32;

        if let Some(cube) = scene.get_object_mut("oscillatingCube") {
            cube.position.y = 200.0 + 100.0 * (running_time / 500.0).sin();
        }

        if let Some(light) = scene.get_object_mut("light") {
            light.position.x = 500.0 * (running_time / 400.0).sin();
            light.position.z = 2000.0 + 500.0 * (running_time / 400.0).cos();
        }
    }
}

fn main() {
    env_logger::init();

    let font_path = Path::new("assets/FreeMono.ttf");
    let (flags, debug_font) = if font_path.exists() {
        (
            EngineFlags::DEBUG_STATS | EngineFlags::DEBUG_COMMAND_LINE,
            Some(font_path),
        )
    } else {
        (EngineFlags::empty(), None)
    };

    let mut engine = Engine::new(1200, 720, flags, debug_font);

    engine.enter_scene(Box::new(Default3dScene));

    App::new(engine, "softrast").run();
}
