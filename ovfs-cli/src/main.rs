//! Overlay VFS CLI - explore an overlay namespace from the command line.
//!
//! Usage:
//!   ovfs --mounts <mounts.json> [--cwd DIR] [--trace] <command>
//!
//! Examples:
//!   ovfs -m mounts.json ls /                 # Registered drivers, then overlaid root
//!   ovfs -m mounts.json ls /flash/boot       # Listing served by the "flash" driver
//!   ovfs -m mounts.json open /logs/today.txt # Open through the overlaid driver
//!   ovfs -m mounts.json --cwd /logs cwd      # Print the working directory
//!   ovfs -m mounts.json probe -n 32 /flash   # Open from 32 concurrent tasks

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ovfs_core::{DirEntry, MountConfig, Mounted, OpenFlags, OverlayDriver, VfsDriver};

/// Overlay VFS CLI
#[derive(Parser, Debug)]
#[command(name = "ovfs")]
#[command(about = "Explore an overlay VFS namespace")]
struct Args {
    /// Mount description (JSON)
    #[arg(short, long)]
    mounts: PathBuf,

    /// Working directory to set before running the command
    #[arg(long)]
    cwd: Option<String>,

    /// Enable delegation tracing
    #[arg(short, long)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory
    Ls {
        #[arg(default_value = ".")]
        path: String,
    },
    /// Open a file and show its size
    Open { path: String },
    /// Change the working directory (if given) and print it
    Cwd { path: Option<String> },
    /// Open a directory from many concurrent tasks
    Probe {
        /// Number of concurrent tasks
        #[arg(short = 'n', long, default_value_t = 8)]
        tasks: usize,

        #[arg(default_value = "/")]
        path: String,
    },
}

fn init_tracing(trace: bool) {
    // RUST_LOG wins over --trace.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if trace { "trace" } else { "warn" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// One listing line: kind, access, size, name.
fn format_entry(entry: &DirEntry) -> String {
    let kind = if entry.is_dir() { 'd' } else { '-' };
    let access = if entry.is_read_only() { 'r' } else { 'w' };
    format!("{}{} {:>8} {}", kind, access, entry.size, entry.name)
}

/// Open `path` from `tasks` blocking tasks at once.
///
/// Every open takes a path buffer, so with more tasks than buffers most of
/// them wait in the pool.
async fn probe(
    root: Arc<OverlayDriver>,
    tasks: usize,
    path: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let root = Arc::clone(&root);
            let path = path.to_string();
            tokio::task::spawn_blocking(move || {
                let node = root.open_dir(&path)?;
                node.entries().map(|entries| entries.len())
            })
        })
        .collect();

    let mut total = 0;
    for handle in handles {
        total += handle.await??;
    }
    Ok(total)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.trace);

    let Mounted { vfs, root } = MountConfig::load(&args.mounts)?.build()?;
    info!(
        drivers = ?root.driver_names(),
        capacity = root.driver_capacity(),
        overlaid = root.overlaid().is_some(),
        prefix = ?root.prefix(),
        "namespace mounted"
    );

    if let Some(ref cwd) = args.cwd {
        root.set_cwd(cwd)?;
    }

    match args.command {
        Command::Ls { path } => {
            let node = root.open_dir(&path)?;
            for entry in node.entries()? {
                println!("{}", format_entry(&entry));
            }
        }
        Command::Open { path } => {
            let file = root.open_file(&path, OpenFlags::READ)?;
            let info = file.info()?;
            println!("{} ({} bytes)", info.name, info.size);
        }
        Command::Cwd { path } => {
            if let Some(path) = path {
                root.set_cwd(&path)?;
            }
            let mut cwd = String::new();
            root.get_cwd(&mut cwd, vfs.config().path_max)?;
            println!("{}", cwd);
        }
        Command::Probe { tasks, path } => {
            let total = probe(Arc::clone(&root), tasks, &path).await?;
            println!(
                "{} tasks, {} entries seen, {}/{} path buffers free",
                tasks,
                total,
                vfs.buffers().available(),
                vfs.buffers().count()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovfs_core::NodeAttr;

    #[test]
    fn test_format_entry() {
        let entry = DirEntry {
            name: "flash".to_string(),
            attr: NodeAttr::DIR | NodeAttr::READ_ONLY,
            size: 0,
        };
        assert_eq!(format_entry(&entry), "dr        0 flash");

        let entry = DirEntry {
            name: "today.txt".to_string(),
            attr: NodeAttr::ARCHIVE,
            size: 5,
        };
        assert_eq!(format_entry(&entry), "-w        5 today.txt");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["ovfs", "-m", "m.json", "--cwd", "/logs", "probe", "-n", "4"])
            .unwrap();
        assert_eq!(args.cwd.as_deref(), Some("/logs"));
        match args.command {
            Command::Probe { tasks, path } => {
                assert_eq!(tasks, 4);
                assert_eq!(path, "/");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_counts_entries() {
        let config = MountConfig::from_json_str(
            r#"{ "limits": { "pathBuffers": 1 }, "drivers": [ { "name": "a" }, { "name": "b" } ] }"#,
        )
        .unwrap();
        let mounted = config.build().unwrap();

        let total = probe(Arc::clone(&mounted.root), 8, "/").await.unwrap();
        assert_eq!(total, 16);
        assert_eq!(mounted.vfs.buffers().available(), 1);
    }
}
