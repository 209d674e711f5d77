use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glslbox::backends::Visitor;
use glslbox::canvas::{Canvas, CanvasParams};
use glslbox::errors::{Error, Result, ShaderStage};
use glslbox::events::{CanvasEvent, EventListener};
use glslbox::math::Vector2;
use glslbox::program::ProgramHandle;
use glslbox::texture::{TextureHandle, TextureParams, TextureSource};
use glslbox::uniforms::UniformVariable;
use glslbox::utils::color::Color;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Compile,
    BindUniform(i32, UniformVariable),
    BindTexture(usize),
    Viewport(Vector2<u32>),
    Clear,
    Draw,
}

#[derive(Default)]
struct Log {
    calls: Vec<Call>,
    locations: HashMap<String, i32>,
    next_location: i32,
    fail_fragment_compile: bool,
}

impl Log {
    fn location(&self, name: &str) -> i32 {
        self.locations[name]
    }

    fn writes_to(&self, location: i32) -> usize {
        self.calls
            .iter()
            .filter(|v| match v {
                Call::BindUniform(l, _) => *l == location,
                _ => false,
            })
            .count()
    }

    fn draws(&self) -> usize {
        self.calls.iter().filter(|v| **v == Call::Draw).count()
    }

    fn texture_binds(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|v| match v {
                Call::BindTexture(unit) => Some(*unit),
                _ => None,
            })
            .collect()
    }

    fn viewports(&self) -> Vec<Vector2<u32>> {
        self.calls
            .iter()
            .filter_map(|v| match v {
                Call::Viewport(dimensions) => Some(*dimensions),
                _ => None,
            })
            .collect()
    }
}

struct RecordingVisitor {
    log: Arc<Mutex<Log>>,
}

impl RecordingVisitor {
    fn new(log: Arc<Mutex<Log>>) -> Self {
        RecordingVisitor { log }
    }
}

impl Visitor for RecordingVisitor {
    unsafe fn compile_program(
        &mut self,
        _: ProgramHandle,
        _: &str,
        _: &str,
    ) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        if log.fail_fragment_compile {
            return Err(Error::ShaderCompile {
                stage: ShaderStage::Fragment,
                log: "ERROR: 0:5: 'vec5' : no matching type".to_string(),
                diagnostics: Vec::new(),
            });
        }

        log.calls.push(Call::Compile);
        Ok(())
    }

    unsafe fn delete_program(&mut self, _: ProgramHandle) {}

    unsafe fn uniform_location(&mut self, _: ProgramHandle, name: &str) -> Result<Option<i32>> {
        let mut log = self.log.lock().unwrap();
        if let Some(location) = log.locations.get(name) {
            return Ok(Some(*location));
        }

        let location = log.next_location;
        log.next_location += 1;
        log.locations.insert(name.to_string(), location);
        Ok(Some(location))
    }

    unsafe fn attribute_location(&mut self, _: ProgramHandle, _: &str) -> Result<Option<i32>> {
        Ok(Some(0))
    }

    unsafe fn bind_uniform(
        &mut self,
        _: ProgramHandle,
        location: i32,
        var: &UniformVariable,
    ) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(Call::BindUniform(location, var.clone()));
        Ok(())
    }

    unsafe fn create_texture(
        &mut self,
        _: TextureHandle,
        _: TextureParams,
        _: Option<&[u8]>,
    ) -> Result<()> {
        Ok(())
    }

    unsafe fn update_texture(
        &mut self,
        _: TextureHandle,
        _: TextureParams,
        _: &[u8],
    ) -> Result<()> {
        Ok(())
    }

    unsafe fn delete_texture(&mut self, _: TextureHandle) {}

    unsafe fn bind_texture(&mut self, unit: usize, _: TextureHandle) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(Call::BindTexture(unit));
        Ok(())
    }

    unsafe fn set_viewport(&mut self, dimensions: Vector2<u32>) {
        let mut log = self.log.lock().unwrap();
        log.calls.push(Call::Viewport(dimensions));
    }

    unsafe fn clear(&mut self, _: Color) {
        let mut log = self.log.lock().unwrap();
        log.calls.push(Call::Clear);
    }

    unsafe fn draw(&mut self, _: ProgramHandle) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(Call::Draw);
        Ok(())
    }

    unsafe fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Recorder {
    events: Vec<CanvasEvent>,
}

impl EventListener for Recorder {
    fn on(&mut self, v: &CanvasEvent) -> Result<()> {
        self.events.push(v.clone());
        Ok(())
    }
}

const ANIMATED_FRAGMENT: &str = "
uniform float u_time;
void main() {
    gl_FragColor = vec4(sin(u_time));
}
";

const STATIC_FRAGMENT: &str = "
void main() {
    gl_FragColor = vec4(1.0);
}
";

fn canvas_with_log(params: CanvasParams) -> (Canvas, Arc<Mutex<Log>>) {
    let _ = env_logger::try_init();

    let log = Arc::new(Mutex::new(Log::default()));
    let visitor = Box::new(RecordingVisitor::new(log.clone()));
    (Canvas::with_visitor(params, visitor), log)
}

#[test]
fn identical_uniform_writes_are_suppressed() {
    let (mut canvas, log) = canvas_with_log(CanvasParams::default());

    canvas.set_uniform("u_speed", 0.5f32).unwrap();
    canvas.set_uniform("u_speed", 0.5f32).unwrap();
    canvas.set_uniform("u_speed", 0.5f32).unwrap();

    let location = log.lock().unwrap().location("u_speed");
    assert_eq!(log.lock().unwrap().writes_to(location), 1);

    canvas.set_uniform("u_speed", 1.0f32).unwrap();
    assert_eq!(log.lock().unwrap().writes_to(location), 2);
}

#[test]
fn texture_units_are_contiguous_and_stable() {
    let (mut canvas, log) = canvas_with_log(CanvasParams::default());

    let params = TextureParams {
        dimensions: Vector2::new(1, 1),
        ..Default::default()
    };

    canvas
        .load_texture("u_wall", TextureSource::Reference("wall.png".into()))
        .unwrap();
    canvas
        .load_texture("u_dirt", TextureSource::Reference("dirt.png".into()))
        .unwrap();
    canvas.update_texture("u_wall", params, &[0, 0, 0, 255]).unwrap();
    canvas.update_texture("u_dirt", params, &[0, 0, 0, 255]).unwrap();

    canvas.tick();
    assert_eq!(log.lock().unwrap().texture_binds(), vec![0, 1]);

    canvas.force_render();
    canvas.tick();
    assert_eq!(log.lock().unwrap().texture_binds(), vec![0, 1, 0, 1]);
}

#[test]
fn sampler_resolution_companion_is_published() {
    let (mut canvas, log) = canvas_with_log(CanvasParams::default());

    let params = TextureParams {
        dimensions: Vector2::new(4, 2),
        ..Default::default()
    };
    canvas
        .load_texture("u_wall", TextureSource::Reference("wall.png".into()))
        .unwrap();
    canvas.update_texture("u_wall", params, &vec![0; 32]).unwrap();

    canvas.tick();

    let log = log.lock().unwrap();
    let sampler = log.location("u_wall");
    let resolution = log.location("u_wallResolution");
    assert!(log.calls.contains(&Call::BindUniform(sampler, UniformVariable::I32(0))));
    assert!(log.calls.contains(&Call::BindUniform(
        resolution,
        UniformVariable::Vector2f([4.0, 2.0])
    )));
}

#[test]
fn failed_initial_compile_reports_not_compiled() {
    let log = Arc::new(Mutex::new(Log {
        fail_fragment_compile: true,
        ..Default::default()
    }));
    let visitor = Box::new(RecordingVisitor::new(log.clone()));
    let mut canvas = Canvas::with_visitor(CanvasParams::default(), visitor);

    assert!(!canvas.is_compiled());

    // Nothing draws while no program has ever linked, even when forced.
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 0);

    log.lock().unwrap().fail_fragment_compile = false;
    canvas.load(STATIC_FRAGMENT, glslbox::program::DEFAULT_VERTEX_SHADER).unwrap();
    assert!(canvas.is_compiled());

    // The pending forced draw survives until a program arrives.
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 1);
}

#[test]
fn failed_reload_keeps_last_good_program() {
    let (mut canvas, log) = canvas_with_log(CanvasParams::default());
    assert!(canvas.is_compiled());

    let recorder = Arc::new(Mutex::new(Recorder::default()));
    canvas.attach(recorder.clone());

    log.lock().unwrap().fail_fragment_compile = true;
    let err = canvas.load("broken", glslbox::program::DEFAULT_VERTEX_SHADER);
    assert!(err.is_err());

    // The older program stays installed and keeps rendering.
    assert!(canvas.is_compiled());
    canvas.force_render();
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 1);

    let events = &recorder.lock().unwrap().events;
    let stages: Vec<Option<ShaderStage>> = events
        .iter()
        .filter_map(|v| match v {
            CanvasEvent::Error(e) => Some(e.stage),
            _ => None,
        })
        .collect();
    assert_eq!(stages, vec![Some(ShaderStage::Fragment)]);
}

#[test]
fn resize_scales_buffer_by_device_pixel_ratio() {
    let params = CanvasParams {
        dimensions: Vector2::new(100, 50),
        device_pixel_ratio: 2.0,
        ..Default::default()
    };
    let (mut canvas, log) = canvas_with_log(params);

    canvas.tick();
    assert_eq!(canvas.buffer_dimensions(), Vector2::new(200, 100));
    assert_eq!(log.lock().unwrap().viewports(), vec![Vector2::new(200, 100)]);

    // A steady display size reprograms nothing.
    canvas.tick();
    assert_eq!(log.lock().unwrap().viewports().len(), 1);

    canvas.set_device_pixel_ratio(1.5);
    canvas.set_display_dimensions(Vector2::new(101, 51));
    canvas.tick();
    assert_eq!(canvas.buffer_dimensions(), Vector2::new(151, 76));
}

#[test]
fn animation_gate_honors_pause_and_force() {
    let params = CanvasParams {
        fragment: Some(ANIMATED_FRAGMENT.to_string()),
        ..Default::default()
    };
    let (mut canvas, log) = canvas_with_log(params);
    assert!(canvas.is_animated());

    canvas.tick();
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 2);

    canvas.pause();
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 2);

    // A forced draw fires exactly once while paused.
    canvas.force_render();
    canvas.tick();
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 3);

    canvas.play();
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 4);
}

#[test]
fn static_fragment_draws_only_when_forced() {
    let params = CanvasParams {
        fragment: Some(STATIC_FRAGMENT.to_string()),
        ..Default::default()
    };
    let (mut canvas, log) = canvas_with_log(params);
    assert!(!canvas.is_animated());

    // The construction-time force covers the first frame.
    canvas.tick();
    canvas.tick();
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 1);
}

#[test]
fn hidden_animated_canvas_stops_drawing() {
    let params = CanvasParams {
        fragment: Some(ANIMATED_FRAGMENT.to_string()),
        ..Default::default()
    };
    let (mut canvas, log) = canvas_with_log(params);

    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 1);

    canvas.set_visible(false);
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 1);

    canvas.set_visible(true);
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 2);
}

#[test]
fn mouse_inside_display_flips_vertically() {
    let params = CanvasParams {
        dimensions: Vector2::new(100, 50),
        device_pixel_ratio: 2.0,
        fragment: Some(ANIMATED_FRAGMENT.to_string()),
        ..Default::default()
    };
    let (mut canvas, log) = canvas_with_log(params);

    canvas.set_mouse(10.0, 20.0);
    canvas.tick();

    let log = log.lock().unwrap();
    let location = log.location("u_mouse");
    // Buffer height is 100, so y = 100 - 20.
    assert!(log
        .calls
        .contains(&Call::BindUniform(location, UniformVariable::Vector2f([10.0, 80.0]))));
}

#[test]
fn mouse_outside_display_is_ignored() {
    let params = CanvasParams {
        dimensions: Vector2::new(100, 50),
        ..Default::default()
    };
    let (mut canvas, log) = canvas_with_log(params);

    canvas.set_mouse(200.0, 20.0);
    canvas.tick();

    let log = log.lock().unwrap();
    assert!(!log.locations.contains_key("u_mouse"));
}

#[test]
fn attribute_driven_construction() {
    let attributes = vec![
        ("fragment", STATIC_FRAGMENT),
        ("textures", "wall.png, dirt.png"),
        ("data-something-else", "ignored"),
    ];
    let params = CanvasParams::from_attributes(attributes);

    let (canvas, _) = canvas_with_log(params);
    assert_eq!(
        canvas.pending_textures(),
        vec![
            ("u_tex0".to_string(), "wall.png".to_string()),
            ("u_tex1".to_string(), "dirt.png".to_string()),
        ]
    );
}

#[test]
fn destroy_is_idempotent_and_final() {
    let (mut canvas, log) = canvas_with_log(CanvasParams::default());

    canvas.destroy();
    canvas.destroy();

    canvas.force_render();
    canvas.tick();
    assert_eq!(log.lock().unwrap().draws(), 0);
}

#[test]
fn uniform_set_before_compile_flushes_after_load() {
    let log = Arc::new(Mutex::new(Log {
        fail_fragment_compile: true,
        ..Default::default()
    }));
    let visitor = Box::new(RecordingVisitor::new(log.clone()));
    let mut canvas = Canvas::with_visitor(CanvasParams::default(), visitor);

    canvas.set_uniform("u_speed", 2.5f32).unwrap();
    assert!(!log.lock().unwrap().locations.contains_key("u_speed"));

    log.lock().unwrap().fail_fragment_compile = false;
    canvas
        .load(STATIC_FRAGMENT, glslbox::program::DEFAULT_VERTEX_SHADER)
        .unwrap();

    // The cached value re-uploads against the fresh program.
    canvas.set_uniform("u_speed", 2.5f32).unwrap();
    let log = log.lock().unwrap();
    let location = log.location("u_speed");
    assert_eq!(log.writes_to(location), 1);
}
