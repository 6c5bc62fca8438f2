use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use palette_kit::prelude::*;

#[derive(Parser)]
#[command(name = "palette")]
#[command(about = "Build a palette from a palette file and print the rendered tree")]
struct Cli {
    /// Palette file (JSON)
    file: PathBuf,

    /// Assignments applied through the values container, e.g. `size=4`.
    /// Values are parsed as JSON, falling back to a plain string.
    assignments: Vec<String>,

    /// Disable the whole palette after the assignments
    #[arg(long)]
    disabled: bool,

    /// Reset every component to its default value after the assignments
    #[arg(long)]
    reset: bool,
}

fn parse_assignment(assignment: &str) -> Result<(&str, Value)> {
    let (name, raw) = assignment
        .split_once('=')
        .with_context(|| format!("expected `name=value`, got `{assignment}`"))?;
    let value = serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw));
    Ok((name.trim(), value))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let text = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;
    let props: PaletteProps = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse palette file {}", cli.file.display()))?;

    let surface = Rc::new(MemorySurface::new());
    let palette = Palette::new(
        surface.clone(),
        props.on_change(|event| log::info!("{} changed to {}", event.name, event.value)),
    );
    log::info!(
        "Built palette `{}` with {} top-level components",
        palette.name(),
        palette.components().len()
    );

    let values = palette.values();
    for assignment in &cli.assignments {
        let (name, value) = parse_assignment(assignment)?;
        if !values.is_bound(name) {
            log::warn!("`{}` is not bound to a component, storing it as plain data", name);
        }
        values.set(name, value);
    }
    if cli.reset {
        palette.reset();
    }
    if cli.disabled {
        palette.set_enabled(false);
    }

    print!("{}", surface.render(surface.body()));
    println!("{}", serde_json::to_string_pretty(&values)?);

    palette.remove();
    Ok(())
}
