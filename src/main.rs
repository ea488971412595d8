//! BugGrabber Viewer - live view of `!BugGrabber` saved errors.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use buggrabber_viewer::config::{ConfigError, ConfigLoader, ViewerConfig};
use buggrabber_viewer::display::{render_record, run_display};
use buggrabber_viewer::ipc::{ChangeEvent, DisplayMessage};
use buggrabber_viewer::notifier::{ChannelSink, Notifier};
use buggrabber_viewer::pipeline::Pipeline;
use buggrabber_viewer::savefile::{read_save_file, SaveFileError};
use buggrabber_viewer::watcher::{locate_save_files, WatcherError};

#[derive(Parser)]
#[command(
    name = "buggrabber-viewer",
    about = "Live view of the errors !BugGrabber saves to disk",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file to use instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch save files and show the latest one in this terminal.
    View {
        #[command(flatten)]
        scan: ScanArgs,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Watch save files and push changes to a running display.
    #[cfg(unix)]
    Watch {
        #[command(flatten)]
        scan: ScanArgs,
        /// Display socket path.
        #[arg(long)]
        socket: Option<PathBuf>,
    },
    /// Show changes pushed by a `watch` process.
    #[cfg(unix)]
    Display {
        /// Display socket path.
        #[arg(long)]
        socket: Option<PathBuf>,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Parse one save file and print it.
    Show {
        /// The save file to read.
        file: PathBuf,
        /// Print the change event as JSON instead of rendering it.
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// List the save files under the scan root.
    Locate {
        #[command(flatten)]
        scan: ScanArgs,
    },
}

#[derive(Args, Default)]
struct ScanArgs {
    /// Directory to search for save files.
    #[arg(long)]
    root: Option<PathBuf>,
    /// File name suffix of save files.
    #[arg(long)]
    file_name: Option<String>,
}

#[derive(Args, Default)]
struct DisplayArgs {
    /// Show full stack traces and locals.
    #[arg(long)]
    expand: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Do not clear the terminal between redraws.
    #[arg(long)]
    no_clear: bool,
}

impl ScanArgs {
    fn apply(self, config: &mut ViewerConfig) {
        if let Some(root) = self.root {
            config.scan_root = root;
        }
        if let Some(file_name) = self.file_name {
            config.file_name = file_name;
        }
    }
}

impl DisplayArgs {
    fn apply(&self, config: &mut ViewerConfig) {
        if self.expand {
            config.display.expand_stacks = true;
        }
        if self.no_color {
            config.display.color = false;
        }
        if self.no_clear {
            config.display.clear_screen = false;
        }
    }
}

/// Fatal errors reported by the binary.
#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error(transparent)]
    SaveFile(#[from] SaveFileError),

    #[cfg(unix)]
    #[error(transparent)]
    Ipc(#[from] buggrabber_viewer::ipc::IpcError),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<ViewerConfig, ConfigError> {
    let loader = path.map_or_else(ConfigLoader::new, ConfigLoader::explicit);
    let loaded = loader.load()?;
    match &loaded.source {
        Some(source) => tracing::debug!(path = %source.display(), "Loaded config file"),
        None => tracing::debug!("No config file found, using defaults"),
    }
    Ok(loaded.config)
}

async fn view(config: ViewerConfig) -> Result<(), CommandError> {
    let ViewerConfig {
        scan_root,
        file_name,
        display,
        ..
    } = config;
    let (sink, rx) = ChannelSink::channel();
    let pipeline = Pipeline::new(Notifier::new(sink));

    let watching = async move {
        let result = pipeline.run(&scan_root, &file_name).await;
        // Closing the channel lets the display finish.
        drop(pipeline);
        result
    };
    let drawing = run_display(rx, &display);

    let (watched, drawn) = tokio::join!(watching, drawing);
    watched?;
    drawn?;
    Ok(())
}

#[cfg(unix)]
async fn watch(config: ViewerConfig, socket: Option<PathBuf>) -> Result<(), CommandError> {
    use buggrabber_viewer::ipc::DisplayClient;

    let client = DisplayClient::with_path(socket.unwrap_or(config.socket_path));
    if !client.is_display_running() {
        tracing::warn!(
            socket = %client.socket_path().display(),
            "No display listening; changes will be dropped until one starts"
        );
    }

    let pipeline = Pipeline::new(Notifier::new(client));
    pipeline.run(&config.scan_root, &config.file_name).await?;
    Ok(())
}

#[cfg(unix)]
async fn display(config: ViewerConfig, socket: Option<PathBuf>) -> Result<(), CommandError> {
    use buggrabber_viewer::ipc::DisplayServer;

    let server = DisplayServer::new(socket.unwrap_or(config.socket_path));
    let (handle, rx) = server.start()?;
    tracing::info!(socket = %handle.socket_path().display(), "Waiting for changes");
    let result = run_display(rx, &config.display).await;
    handle.shutdown();
    result?;
    Ok(())
}

async fn show(config: &ViewerConfig, file: &Path, json: bool) -> Result<(), CommandError> {
    let record = read_save_file(file).await?;

    if json {
        let message = DisplayMessage::Change(ChangeEvent {
            path: file.to_path_buf(),
            db: Some(record),
        });
        println!("{}", serde_json::to_string_pretty(&message)?);
    } else {
        print!("{}", render_record(Some(&record), &config.display));
    }
    Ok(())
}

async fn locate(config: &ViewerConfig) {
    let scan = locate_save_files(&config.scan_root, &config.file_name).await;
    for path in &scan.paths {
        println!("{}", path.display());
    }
    if !scan.failures.is_empty() {
        tracing::warn!(skipped = scan.failures.len(), "Some paths could not be scanned");
    }
}

async fn execute(cli: Cli) -> Result<(), CommandError> {
    let mut config = load_config(cli.config)?;
    let command = cli.command.unwrap_or(Commands::View {
        scan: ScanArgs::default(),
        display: DisplayArgs::default(),
    });

    match command {
        Commands::View { scan, display } => {
            scan.apply(&mut config);
            display.apply(&mut config);
            view(config).await
        }
        #[cfg(unix)]
        Commands::Watch { scan, socket } => {
            scan.apply(&mut config);
            watch(config, socket).await
        }
        #[cfg(unix)]
        Commands::Display { socket, display: args } => {
            args.apply(&mut config);
            display(config, socket).await
        }
        Commands::Show {
            file,
            json,
            display,
        } => {
            display.apply(&mut config);
            show(&config, &file, json).await
        }
        Commands::Locate { scan } => {
            scan.apply(&mut config);
            locate(&config).await;
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tokio::select! {
        result = execute(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Command failed");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            ExitCode::SUCCESS
        }
    }
}
