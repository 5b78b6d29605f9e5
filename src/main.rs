/*
 * Fish Flocking Viewer
 *
 * Opens a window and shows every flock from above (x/z plane), one color per
 * fish type, with the bounds of each flock outlined. The scene comes from the
 * JSON file given as the first argument, or a built-in two-species scene.
 *
 * Logging follows RUST_LOG, e.g. RUST_LOG=fish_boids=debug.
 */

use std::env;

use nannou::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fish_boids::{FlockParams, SceneConfig, Simulation};

// Length of the heading stroke drawn per fish, in world units
const FISH_SIZE: f32 = 0.8;

const PALETTE: [Rgb<u8>; 4] = [ORANGE, LIGHTSKYBLUE, PALEGREEN, PINK];

struct Model {
    simulation: Simulation,
}

fn main() {
    init_logging();
    nannou::app(model).update(update).run();
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn default_scene() -> Vec<FlockParams> {
    vec![
        FlockParams {
            instance_count: 2000,
            ..FlockParams::named("sardine")
        },
        FlockParams {
            instance_count: 300,
            fish_speed: 2.0,
            separation_weight: 2.0,
            cohesion_weight: 0.5,
            ..FlockParams::named("mackerel")
        },
    ]
}

fn load_scene() -> Vec<FlockParams> {
    let Some(path) = env::args().nth(1) else {
        return default_scene();
    };

    match SceneConfig::load(&path) {
        Ok(scene) => {
            info!(path = %path, fish_types = scene.fish_types.len(), "scene loaded");
            scene.flock_params()
        }
        Err(err) => {
            warn!(path = %path, error = %err, "falling back to the default scene");
            default_scene()
        }
    }
}

fn model(app: &App) -> Model {
    app.new_window()
        .title("Fish Flocking Simulation")
        .size(1280, 800)
        .view(view)
        .build()
        .unwrap();

    // Skipped fish types are already logged by the simulation
    let (simulation, _skipped) = Simulation::from_params(load_scene());

    Model { simulation }
}

fn update(_app: &App, model: &mut Model, update: Update) {
    // Rejected settings are logged by the flock and the frame still runs
    model.simulation.step(update.since_last.as_secs_f32());
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let window_rect = app.window_rect();

    // Fit the widest flock into the window
    let extent = model
        .simulation
        .flocks()
        .iter()
        .map(|flock| flock.bounds())
        .fold(Vec2::ONE, |acc, bounds| acc.max(vec2(bounds.x, bounds.z)));
    let scale = (window_rect.w() / extent.x).min(window_rect.h() / extent.y) * 0.9;

    for (i, flock) in model.simulation.flocks().iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let bounds = flock.bounds();

        draw.rect()
            .x_y(0.0, 0.0)
            .w_h(bounds.x * scale, bounds.z * scale)
            .no_fill()
            .stroke_weight(1.0)
            .stroke(rgba(0.3, 0.3, 0.3, 1.0));

        for fish in flock.fish() {
            let head = vec2(fish.position.x, fish.position.z) * scale;
            let tail = head - vec2(fish.direction.x, fish.direction.z) * FISH_SIZE * scale;
            draw.line().start(tail).end(head).weight(1.5).color(color);
        }
    }

    draw.text(&model.simulation.stats().summary())
        .x_y(0.0, window_rect.top() - 20.0)
        .color(WHITE)
        .font_size(14);

    draw.to_frame(app, &frame).unwrap();
}
