use glium::{program, uniform, Display, PolygonMode, Program, Surface};
use glutin::surface::WindowSurface;
use log::{debug, error};
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::{EventLoop, EventLoopBuilder};
use winit::keyboard::PhysicalKey;
use winit::window::Window;

use crate::actor::{Actor, Vertex};
use crate::camera::{Interaction, TrackballInteractor};
use crate::utils::Bounds;

const BACKGROUND: (f32, f32, f32, f32) = (0.011, 0.0089, 0.1622, 1.0);
// pixels per wheel line on touchpads
const PIXELS_PER_SCROLL_STEP: f32 = 40.;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to compile shaders: {0}")]
    Program(#[from] glium::program::ProgramChooserCreationError),
    #[error("failed to create vertex buffer: {0}")]
    VertexBuffer(#[from] glium::vertex::BufferCreationError),
    #[error("failed to create index buffer: {0}")]
    IndexBuffer(#[from] glium::index::BufferCreationError),
    #[error("failed to draw: {0}")]
    Draw(#[from] glium::DrawError),
    #[error("failed to present frame: {0}")]
    SwapBuffers(#[from] glium::SwapBuffersError),
}

/// Window that has not been opened yet.
pub struct RenderWindow {
    width: u32,
    height: u32,
    title: String,
}

/// Open window with its GL context, ready to show actors.
pub struct ConfiguredWindow {
    width: u32,
    height: u32,
    event_loop: EventLoop<()>,
    window: Window,
    display: Display<WindowSurface>,
    program: Program,
}

struct GpuActor {
    vertices: glium::VertexBuffer<Vertex>,
    indices: glium::IndexBuffer<u32>,
}

impl RenderWindow {
    pub fn new(width: u32, height: u32) -> Self {
        RenderWindow {
            width,
            height,
            title: String::from("Tensor glyphs"),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Opens the window and binds the GL context and shaders to it.
    pub fn configure(self) -> Result<ConfiguredWindow, RenderError> {
        let event_loop = EventLoopBuilder::new().build()?;
        let (window, display) = glium::backend::glutin::SimpleWindowBuilder::new()
            .with_title(&self.title)
            .with_inner_size(self.width, self.height)
            .build(&event_loop);

        let program = program!(&display,
            330 => {
                vertex: include_str!("shaders/glyph.vs"),
                fragment: include_str!("shaders/glyph.fs"),
            },
        )?;

        debug!("Render window configured at {}x{}", self.width, self.height);
        Ok(ConfiguredWindow {
            width: self.width,
            height: self.height,
            event_loop,
            window,
            display,
            program,
        })
    }
}

impl ConfiguredWindow {
    /// Shows `actors`, framing them with the camera, and blocks until the user
    /// closes the window.
    pub fn start(self, actors: Vec<Actor>) -> Result<(), RenderError> {
        let ConfiguredWindow {
            width,
            height,
            event_loop,
            window,
            display,
            program,
        } = self;

        let gpu_actors = actors
            .iter()
            .map(|actor| upload(&display, actor))
            .collect::<Result<Vec<GpuActor>, RenderError>>()?;

        let mut bounds = Bounds::empty();
        for actor in actors.iter().filter(|actor| actor.bounds.is_valid()) {
            bounds.add_point(&actor.bounds.min);
            bounds.add_point(&actor.bounds.max);
        }

        let mut interactor = TrackballInteractor::new(bounds);
        let _ = window.request_inner_size(PhysicalSize::new(width, height));
        interactor.reset_camera();
        draw_frame(&display, &program, &gpu_actors, &interactor)?;
        debug!("Rendering {} actors", gpu_actors.len());

        let mut failure = None;
        event_loop.run(|event, window_target| match event {
            Event::WindowEvent { event, .. } => {
                let interaction = match event {
                    WindowEvent::CloseRequested => Interaction::Close,
                    WindowEvent::Resized(size) => {
                        display.resize((size.width, size.height));
                        Interaction::Redraw
                    }
                    WindowEvent::ModifiersChanged(modifiers) => {
                        interactor.set_shift(modifiers.state().shift_key());
                        Interaction::Ignored
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        match (event.state, event.physical_key) {
                            (ElementState::Pressed, PhysicalKey::Code(code)) => {
                                interactor.on_key(code)
                            }
                            _ => Interaction::Ignored,
                        }
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        interactor.on_button(button, state == ElementState::Pressed);
                        Interaction::Ignored
                    }
                    WindowEvent::CursorMoved { position, .. } => interactor.on_cursor_moved(
                        position.x as f32,
                        position.y as f32,
                        display.get_framebuffer_dimensions(),
                    ),
                    WindowEvent::MouseWheel { delta, .. } => {
                        let steps = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(position) => {
                                position.y as f32 / PIXELS_PER_SCROLL_STEP
                            }
                        };
                        interactor.on_scroll(steps)
                    }
                    WindowEvent::RedrawRequested => {
                        if let Err(err) = draw_frame(&display, &program, &gpu_actors, &interactor)
                        {
                            error!("{}", err);
                            failure = Some(err);
                            Interaction::Close
                        } else {
                            Interaction::Ignored
                        }
                    }
                    _ => Interaction::Ignored,
                };

                match interaction {
                    Interaction::Close => window_target.exit(),
                    Interaction::Redraw => window.request_redraw(),
                    Interaction::Ignored => (),
                }
            }
            _ => (),
        })?;

        debug!("Render window closed");
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn upload(display: &Display<WindowSurface>, actor: &Actor) -> Result<GpuActor, RenderError> {
    let vertices = glium::VertexBuffer::new(display, &actor.vertices)?;
    let indices = glium::IndexBuffer::new(
        display,
        glium::index::PrimitiveType::TrianglesList,
        &actor.indices,
    )?;
    Ok(GpuActor { vertices, indices })
}

fn draw_frame(
    display: &Display<WindowSurface>,
    program: &Program,
    actors: &[GpuActor],
    interactor: &TrackballInteractor,
) -> Result<(), RenderError> {
    let (view_w, view_h) = display.get_framebuffer_dimensions();
    let aspect = view_w as f32 / view_h.max(1) as f32;
    let view = interactor.camera.view_matrix();
    let projection = interactor.camera.projection_matrix(aspect);

    let uniforms = uniform! {
        mvp: Into::<[[f32; 4]; 4]>::into(projection * view),
        view: Into::<[[f32; 4]; 4]>::into(view),
    };

    let polygon_mode = if interactor.wireframe {
        PolygonMode::Line
    } else {
        PolygonMode::Fill
    };

    let draw_parameters = glium::DrawParameters {
        depth: glium::Depth {
            test: glium::DepthTest::IfLess,
            write: true,
            ..Default::default()
        },
        polygon_mode,
        backface_culling: glium::draw_parameters::BackfaceCullingMode::CullingDisabled,
        ..Default::default()
    };

    let mut screen = display.draw();
    screen.clear_color_and_depth(BACKGROUND, 1.0);
    let drawn = actors.iter().try_for_each(|actor| {
        screen.draw(
            &actor.vertices,
            &actor.indices,
            program,
            &uniforms,
            &draw_parameters,
        )
    });
    screen.finish()?;
    drawn?;
    Ok(())
}
