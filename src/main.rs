use std::process::ExitCode;

use anyhow::Context;
use log::{error, info};

mod actor;
mod camera;
mod cli;
mod cut_plane;
mod mask_points;
mod pipeline;
mod render_window;
mod superquadric;
mod tensor_glyph;
mod utils;
mod volume;

use cli::{Command, Config};
use pipeline::build_glyph_actor;
use render_window::RenderWindow;
use volume::read_structured_points;

fn run(config: &Config) -> anyhow::Result<()> {
    let volume = read_structured_points(&config.input_path)
        .with_context(|| format!("could not load {}", config.input_path.display()))?;

    let actor = build_glyph_actor(&volume, config);

    let title = format!("Tensor glyphs - {}", config.input_path.display());
    let window = RenderWindow::new(config.width, config.height)
        .with_title(title)
        .configure()
        .context("could not open the render window")?;
    window.start(vec![actor]).context("rendering failed")?;

    info!("Window closed");
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match cli::parse_args(std::env::args_os()) {
        Ok(Command::Render(config)) => config,
        Ok(Command::Help) => {
            print!("{}", cli::usage());
            return ExitCode::SUCCESS;
        }
        Ok(Command::Version(version)) => {
            print!("{}", version);
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            error!("[{}] {}", err.kind(), err);
            print!("{}", cli::usage());
            return ExitCode::from(2);
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
