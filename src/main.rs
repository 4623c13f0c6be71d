use clap::{Parser, Subcommand};
use dci::archive::{extract_all, pack_dir, write_archive, Archive};
use dci::icon::builder::{parse_layer_spec, IconBuilder};
use dci::reader::{ReadOptions, DEFAULT_MAX_DEPTH};
use dci::{EntryKind, IconIndex};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dci", about = "The DCI icon archive CLI", version)]
struct Cli {
    /// Deepest directory nesting parsed when reading
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a directory tree into a .dci archive
    Pack {
        dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Unpack a .dci archive into a directory
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// List every entry of an archive
    List {
        input: PathBuf,
    },
    /// Show archive metadata
    Info {
        input: PathBuf,
    },
    /// List the icon layers stored in an archive
    Icons {
        input: PathBuf,
        /// Print a JSON manifest instead of a table
        #[arg(long)]
        json: bool,
        /// Include layers reached through links
        #[arg(long)]
        resolve_links: bool,
    },
    /// Build an archive from layer images
    Build {
        #[arg(short, long)]
        output: PathBuf,
        /// SIZE/STATE.TONE/SCALE/LAYER=IMAGE, e.g.
        /// 64/normal.universal/2/1.0p.-1.0_0_0_0_0_0_0.webp=icon@2x.webp
        #[arg(required = true, num_args = 1..)]
        layers: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber from `RUST_LOG`, defaulting to warn.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dci=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let options = ReadOptions { max_depth: cli.max_depth, ..ReadOptions::default() };

    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { dir, output } => {
            let builder = pack_dir(&dir)?;
            write_archive(&output, &builder.to_bytes()?)?;
            println!("Created: {}", output.display());
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output_dir } => {
            let ar = Archive::open_with(&input, options)?;
            let n = extract_all(ar.view(), &output_dir)?;
            println!("Unpacked {} entries to: {}", n, output_dir.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let ar = Archive::open_with(&input, options)?;
            let view = ar.view();
            println!("Archive: {}", input.display());
            println!("{:<10} {:>10}  Path", "Kind", "Size");
            for entry in view.walk() {
                let suffix = match entry.kind {
                    EntryKind::Link => format!(" -> {}", view.link_target(&entry.path).unwrap_or("?")),
                    _               => String::new(),
                };
                println!("{:<10} {:>10}  {}{}", entry.kind.name(), entry.size(), entry.path, suffix);
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let ar = Archive::open_with(&input, options)?;
            let view = ar.view();
            println!("── DCI Archive ──────────────────────────────────────────");
            println!("  Path           {}", ar.path().display());
            println!("  Format version {}", view.header().version);
            println!("  Size           {} B", view.as_bytes().len());
            println!("  Top-level      {}", view.header().entry_count);
            println!("  Entries        {}", view.entry_count());
            println!("  Icon layers    {}", view.icon_images().len());
            println!("  BLAKE3         {}", ar.digest_hex());
        }

        // ── Icons ────────────────────────────────────────────────────────────
        Commands::Icons { input, json, resolve_links } => {
            let ar = Archive::open_with(&input, options)?;
            let index = IconIndex::from_view(ar.view(), resolve_links);
            if json {
                println!("{}", String::from_utf8(index.to_bytes()?)?);
            } else {
                println!("{:>5} {:<9} {:<6} {:>5} {:<5} {:>4} {:>4}  {:<20} {:>8}  File",
                         "Size", "State", "Tone", "Scale", "Fmt", "Prio", "Pad", "Palette", "Bytes");
                for r in &index.records {
                    println!("{:>5} {:<9} {:<6} {:>5} {:<5} {:>4} {:>4}  {:<20} {:>8}  {}",
                             r.size, r.state, r.tone, r.scale, r.format, r.priority, r.padding,
                             r.palette_name, r.byte_size, r.filename);
                }
            }
        }

        // ── Build ────────────────────────────────────────────────────────────
        Commands::Build { output, layers } => {
            let mut builder = IconBuilder::new();
            for arg in &layers {
                let (spec, image) = arg
                    .rsplit_once('=')
                    .ok_or_else(|| format!("expected LAYER=IMAGE, got '{}'", arg))?;
                let (key, format, meta) = parse_layer_spec(spec)?;
                builder.add_layer(std::fs::read(Path::new(image))?, key, format, &meta)?;
                println!("  added  {}", spec);
            }
            write_archive(&output, &builder.to_bytes()?)?;
            println!("Created: {} ({} layers)", output.display(), builder.layer_count());
        }
    }

    Ok(())
}
