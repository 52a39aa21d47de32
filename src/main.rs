//! Inkmap - render plain-text outlines as mind-map PNG images.
//!
//! # Usage
//!
//! ```bash
//! inkmap -i outline.txt -o mindmap.png
//! inkmap -i outline.txt --theme dark --layout both
//! inkmap --raw $'mindmap\n  root((Main Topic))\n    Subtopic' --base64
//! ```

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use base64::Engine;
use clap::Parser;

use inkmap::layout::LayoutMode;
use inkmap::{outline, render, theme};

/// Render a plain-text outline as a mind-map PNG image
#[derive(Parser, Debug)]
#[command(name = "inkmap", version, about, long_about = None)]
struct Cli {
    /// Outline text file to render
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Outline text given directly on the command line
    #[arg(long, value_name = "TEXT", conflicts_with = "input")]
    raw: Option<String>,

    /// Output PNG path
    #[arg(short, long, value_name = "FILE", default_value = "mindmap.png")]
    output: PathBuf,

    /// Print the PNG to stdout as base64 instead of writing a file
    #[arg(short = 'b', long)]
    base64: bool,

    /// Theme id (unknown ids fall back to the default theme)
    #[arg(long, default_value = "default")]
    theme: String,

    /// Layout direction: right, left, or both
    #[arg(long, default_value = "right")]
    layout: String,

    /// List available theme ids and exit
    #[arg(long)]
    list_themes: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    if cli.list_themes {
        for id in theme::store().ids() {
            println!("{id}");
        }
        return Ok(());
    }

    let content = match (&cli.input, &cli.raw) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        (None, Some(raw)) => raw.clone(),
        (None, None) => bail!("No input provided. Use --input for file input or --raw for direct text."),
    };

    let mut tree = outline::parse(&content);
    let mode = LayoutMode::from_param(&cli.layout);

    if cli.base64 {
        let mut png = Vec::new();
        render::render_tree(&mut tree, &cli.theme, mode, &mut png)
            .context("Failed to render mind map")?;
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "{}",
            base64::engine::general_purpose::STANDARD.encode(&png)
        )?;
        return Ok(());
    }

    let file = fs::File::create(&cli.output)
        .with_context(|| format!("Failed to create output file {}", cli.output.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    render::render_tree(&mut tree, &cli.theme, mode, &mut writer)
        .context("Failed to render mind map")?;
    writer.flush().context("Failed to flush output file")?;

    Ok(())
}
