use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use decoder::connector::Connector;
use decoder::header::LAYER_COUNT;
use decoder::rom::info::RomInfo;
use decoder::{LayerOutcome, MapDescriptor, MapRender, MapSession, RomLayout};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Inspect the maps stored in a Game Boy Advance ROM image.
#[derive(Parser, Debug)]
#[command(name = "gbamap", version)]
struct Cli {
    /// ROM image to read.
    rom: PathBuf,

    /// JSON file overriding the catalog and name table offsets.
    #[arg(long, value_name = "FILE")]
    layout: Option<PathBuf>,

    /// Write log events to this file instead of stderr.
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Print machine-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cartridge header fields.
    Info,
    /// Every map in the catalog.
    List,
    /// Decode one map, selected by its catalog record offset.
    Show {
        #[arg(value_parser = parse_offset)]
        offset: usize,
    },
    /// Decode every map and report the ones that fail.
    Batch,
}

#[derive(Serialize)]
struct InfoOutput<'a> {
    #[serde(flatten)]
    info: &'a RomInfo,
    maker_name: &'a str,
    rom_size: usize,
    map_count: usize,
}

#[derive(Serialize)]
struct LayerSummary {
    index: usize,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct MapSummary<'a> {
    map_id: u16,
    name: &'a str,
    header_offset: usize,
    width: usize,
    height: usize,
    tileset_chunks: usize,
    tile_count: usize,
    layers: Vec<LayerSummary>,
    connectors: &'a [Connector],
}

impl<'a> MapSummary<'a> {
    fn new(render: &'a MapRender) -> Self {
        let layers = render
            .layers
            .iter()
            .enumerate()
            .map(|(index, outcome)| match outcome {
                LayerOutcome::Absent => LayerSummary {
                    index,
                    status: "absent",
                    error: None,
                },
                LayerOutcome::Decoded(_) => LayerSummary {
                    index,
                    status: "decoded",
                    error: None,
                },
                LayerOutcome::Failed(e) => LayerSummary {
                    index,
                    status: "failed",
                    error: Some(e.to_string()),
                },
            })
            .collect();

        Self {
            map_id: render.descriptor.map_id,
            name: &render.descriptor.name,
            header_offset: render.descriptor.header_offset,
            width: render.width,
            height: render.height,
            tileset_chunks: render.tileset.chunks().len(),
            tile_count: render.tileset.tile_count(),
            layers,
            connectors: &render.connectors,
        }
    }
}

#[derive(Serialize)]
struct BatchOutput {
    rendered: usize,
    failed: Vec<BatchFailureOutput>,
    cache_decodes: usize,
    cache_hits: usize,
}

#[derive(Serialize)]
struct BatchFailureOutput {
    map: String,
    header_offset: usize,
    message: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref())?;

    let layout = match &cli.layout {
        Some(path) => read_layout(path)?,
        None => RomLayout::default(),
    };
    let data = fs::read(&cli.rom).with_context(|| format!("reading {}", cli.rom.display()))?;
    tracing::info!("opening {}", cli.rom.display());
    let mut session = MapSession::with_layout(data, layout);

    match cli.command {
        Command::Info => info(&session, cli.json),
        Command::List => list(session.descriptors(), cli.json),
        Command::Show { offset } => show(&mut session, offset, cli.json),
        Command::Batch => batch(&mut session, cli.json),
    }
}

/// Logs go to stderr, or through a non-blocking writer when a file is given.
/// The returned guard flushes the file writer when dropped.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

fn read_layout(path: &Path) -> Result<RomLayout> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let layout: RomLayout = serde_json::from_str(&text)
        .with_context(|| format!("parsing layout {}", path.display()))?;
    layout
        .check()
        .with_context(|| format!("invalid layout {}", path.display()))?;
    Ok(layout)
}

/// Accepts `0x`-prefixed hexadecimal or plain decimal.
fn parse_offset(text: &str) -> Result<usize, String> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid offset `{text}`: {e}"))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn info(session: &MapSession, json: bool) -> Result<()> {
    let info = session.info().context("reading cartridge header")?;
    if json {
        return print_json(&InfoOutput {
            info: &info,
            maker_name: info.maker_name(),
            rom_size: session.rom().len(),
            map_count: session.descriptors().len(),
        });
    }

    println!("title:    {}", info.game_title);
    println!("code:     {}", info.game_code);
    println!("maker:    {} ({})", info.maker_code, info.maker_name());
    println!("version:  {}", info.software_version);
    println!("size:     {} bytes", session.rom().len());
    println!("maps:     {}", session.descriptors().len());
    Ok(())
}

fn list(descriptors: &[MapDescriptor], json: bool) -> Result<()> {
    if json {
        return print_json(&descriptors);
    }
    for descriptor in descriptors {
        println!(
            "0x{:06X}  {}",
            descriptor.header_offset,
            descriptor.display_name()
        );
    }
    Ok(())
}

fn show(session: &mut MapSession, offset: usize, json: bool) -> Result<()> {
    let Some(descriptor) = session.find(offset).cloned() else {
        bail!("no catalog record at 0x{offset:06X}");
    };
    let render = session
        .render_map(&descriptor)
        .with_context(|| format!("decoding {}", descriptor.display_name()))?;
    let summary = MapSummary::new(&render);
    if json {
        return print_json(&summary);
    }

    println!("{}", descriptor.display_name());
    println!("size:       {}x{} px", summary.width, summary.height);
    println!(
        "tileset:    {} tiles in {} chunks",
        summary.tile_count, summary.tileset_chunks
    );
    for layer in &summary.layers {
        match &layer.error {
            Some(e) => println!("BG{}:        {} ({e})", layer.index, layer.status),
            None => println!("BG{}:        {}", layer.index, layer.status),
        }
    }
    println!("connectors: {}", render.connectors.len());
    for connector in &render.connectors {
        let (left, top, right, bottom) = connector.display_rect();
        println!(
            "  [{:04X}] ({left}, {top}) - ({right}, {bottom})",
            connector.destination_map_id
        );
    }
    Ok(())
}

fn batch(session: &mut MapSession, json: bool) -> Result<()> {
    let mut rendered = 0;
    let failures = session.render_all(|render| {
        // the composite is what a viewer would export for this map
        let composite = render.composite([true; LAYER_COUNT]);
        tracing::debug!(
            "{}: {}x{}",
            render.descriptor.display_name(),
            composite.width(),
            composite.height()
        );
        rendered += 1;
        Ok::<(), std::convert::Infallible>(())
    });

    let output = BatchOutput {
        rendered,
        failed: failures
            .iter()
            .map(|failure| BatchFailureOutput {
                map: failure.descriptor.display_name(),
                header_offset: failure.descriptor.header_offset,
                message: failure.message.clone(),
            })
            .collect(),
        cache_decodes: session.cache().decodes(),
        cache_hits: session.cache().hits(),
    };
    if json {
        return print_json(&output);
    }

    println!(
        "{} maps rendered, {} failed",
        output.rendered,
        output.failed.len()
    );
    for failure in &failures {
        println!("  {failure}");
    }
    println!(
        "tileset cache: {} decodes, {} hits",
        output.cache_decodes, output.cache_hits
    );
    Ok(())
}
