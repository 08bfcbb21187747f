use clap::{Parser, Subcommand};
use gallery_order::config::{self, GalleryConfig};
use gallery_order::gallery::Gallery;
use gallery_order::hash::{ContentHash, ImageRef, hash_file};
use gallery_order::naming::SortKey;
use gallery_order::output;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gallery-order")]
#[command(about = "Content-addressed ordering for folders of images")]
#[command(long_about = "\
Content-addressed ordering for folders of images

Images are identified by the SHA-256 of their bytes. Each image's position
is an ordering timestamp kept in a small per-image file; filenames mirror it
so a file manager shows the same order.

Gallery layout:

  gallery/
  ├── config.toml                          # Optional settings
  ├── 20240102030405-250000000.jpg         # <second>-<nanoseconds>.<ext>
  ├── IMG_0001.jpg                         # Placed by EXIF or mtime until moved
  ├── metadata/
  │   └── 3a/
  │       ├── 3a7bd3e2...json              # Ordering timestamp
  │       └── 3a7bd3e2.../dialog.json      # Dialog lines
  └── trips/                               # Sub-folder, addressed with --path trips

Ordering timestamp resolution (first available wins):
  stored entry → filename prefix → EXIF DateTimeOriginal → modification time

Images are referred to by filename or by content hash. An existing filename
always wins over a hash interpretation.

Run 'gallery-order gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Gallery root directory
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Folder inside the gallery root
    #[arg(long, default_value = "", global = true)]
    path: String,

    /// Config file (defaults to <root>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log per-file decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List images in display order
    List,
    /// Move an image between two neighbors
    Reorder {
        /// Image to move
        id: String,
        /// Image that should come directly before it
        #[arg(long)]
        prev: Option<String>,
        /// Image that should come directly after it
        #[arg(long)]
        next: Option<String>,
    },
    /// Copy files in at the end of the gallery, in argument order
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Delete an image with its stored entries
    Delete { id: String },
    /// Spread all images evenly over the gallery's time span
    Respace,
    /// Move a legacy metadata.json into the per-image store
    Migrate,
    /// Print the content hash of a file
    Hash { file: PathBuf },
    /// List sub-folders with image counts
    Dirs,
    /// Read or write a stored ordering timestamp
    Timestamp {
        #[command(subcommand)]
        action: TimestampAction,
    },
    /// Read or write dialog lines
    Dialog {
        #[command(subcommand)]
        action: DialogAction,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum TimestampAction {
    Get { id: String },
    /// Store an RFC 3339 timestamp
    Set { id: String, timestamp: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum DialogAction {
    Get { id: String },
    /// Replace the dialog with the given lines
    Set { id: String, lines: Vec<String> },
    Delete { id: String },
    /// Dialog of every image in the folder
    All,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Hash { file } => {
            println!("{}", hash_file(file)?);
            return Ok(());
        }
        _ => {}
    }

    let gallery_config = match &cli.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&cli.root)?,
    };
    init_thread_pool(&gallery_config);
    let gallery = Gallery::new(&cli.root, gallery_config);
    let events = gallery.subscribe(1024);
    let sub = cli.path.as_str();
    let dir = gallery.dir(sub)?;
    let image = |s: &str| image_ref(&dir, s);

    match &cli.command {
        Command::List => {
            let images = gallery.images(sub)?;
            emit(cli.json, &images, || output::format_listing(&images))?;
        }
        Command::Reorder { id, prev, next } => {
            let prev = prev.as_deref().map(image);
            let next = next.as_deref().map(image);
            let outcome = gallery.reorder(sub, &image(id), prev.as_ref(), next.as_ref())?;
            emit(cli.json, &outcome, || output::format_reorder(&outcome))?;
        }
        Command::Import { files } => {
            let imported = gallery.import(sub, files)?;
            emit(cli.json, &imported, || output::format_imported(&imported))?;
        }
        Command::Delete { id } => {
            let name = gallery.delete(sub, &image(id))?;
            emit(cli.json, &name, || vec![format!("Deleted {name}")])?;
        }
        Command::Respace => {
            let respaced = gallery.respace(sub)?;
            emit(cli.json, &respaced, || output::format_respaced(&respaced))?;
        }
        Command::Migrate => {
            let report = gallery.migrate(sub)?;
            let migrated = report.as_ref().map(|r| r.migrated).unwrap_or(0);
            emit(cli.json, &migrated, || {
                output::format_migration(report.as_ref())
            })?;
        }
        Command::Dirs => {
            let dirs = gallery.dirs(sub)?;
            emit(cli.json, &dirs, || output::format_dirs(&dirs))?;
        }
        Command::Timestamp { action } => match action {
            TimestampAction::Get { id } => {
                let ts = gallery.timestamp(sub, &image(id))?;
                emit(cli.json, &ts, || {
                    vec![ts.clone().unwrap_or_else(|| "(no entry)".to_string())]
                })?;
            }
            TimestampAction::Set { id, timestamp } => {
                if SortKey::parse_rfc3339(timestamp).is_none() {
                    return Err(format!("not an RFC 3339 timestamp: {timestamp}").into());
                }
                gallery.set_timestamp(sub, &image(id), timestamp)?;
            }
            TimestampAction::Delete { id } => gallery.delete_timestamp(sub, &image(id))?,
        },
        Command::Dialog { action } => match action {
            DialogAction::Get { id } => {
                let lines = gallery.dialog(sub, &image(id))?;
                emit(cli.json, &lines, || output::format_dialog(&lines))?;
            }
            DialogAction::Set { id, lines } => gallery.set_dialog(sub, &image(id), lines)?,
            DialogAction::Delete { id } => gallery.delete_dialog(sub, &image(id))?,
            DialogAction::All => {
                let all = gallery.dialogs(sub)?;
                emit(cli.json, &all, || {
                    all.iter()
                        .flat_map(|(id, lines)| {
                            std::iter::once(id.to_string())
                                .chain(lines.iter().map(|l| format!("    {l}")))
                        })
                        .collect()
                })?;
            }
        },
        Command::GenConfig | Command::Hash { .. } => {}
    }

    if cli.verbose && !cli.json {
        let changes: Vec<String> = events
            .try_iter()
            .map(|e| output::format_change_event(&e))
            .collect();
        output::print_lines(&changes);
    }
    Ok(())
}

/// Print `value` as JSON, or the formatted lines otherwise.
fn emit<T: Serialize>(
    json: bool,
    value: &T,
    lines: impl FnOnce() -> Vec<String>,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        output::print_lines(&lines());
    }
    Ok(())
}

/// Interpret a command-line image identifier. An existing file wins; then a
/// 64-hex-character hash; anything else is taken as a (missing) filename.
fn image_ref(dir: &Path, s: &str) -> ImageRef {
    if dir.join(s).is_file() {
        return ImageRef::filename(s);
    }
    match s.parse::<ContentHash>() {
        Ok(hash) => ImageRef::Hash(hash),
        Err(_) => ImageRef::filename(s),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(config: &GalleryConfig) {
    let threads = config::effective_threads(&config.processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
