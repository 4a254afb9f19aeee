use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};

use tubesnap::capture::{
    CaptionResponse, FrameSequence, MediaElement, StaticPage, StillFrame, TerminalCaptionPrompt,
};
use tubesnap::config::Config;
use tubesnap::delivery::{
    AcceptSuggested, FileSystemDownloads, FixedLocation, SaveAsPrompt, TerminalSavePrompt,
};
use tubesnap::export::FileNaming;
use tubesnap::notification::{
    ConsoleNotifier, DesktopNotifier, MultiNotifier, Notifier, TransientNotifier,
};
use tubesnap::page::{PageContext, PageError, SpawnedHost};
use tubesnap::settings::{ImageQuality, Settings, SettingsEdit, SettingsStore};
use tubesnap::storage::{JsonFileStore, KeyValueStore};

const DEFAULT_LOCATION: &str = "https://www.youtube.com/watch";

#[derive(Parser, Debug)]
#[command(name = "tubesnap")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TUBESNAP_GIT_HASH"), ")"),
    about = "Capture, caption and export still frames from video players"
)]
struct Cli {
    /// Config file to use instead of ~/.config/tubesnap/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture the frame shown at a playback position
    Capture(CaptureArgs),

    /// List captures with their timestamps and captions
    List,

    /// Delete all captures
    Reset {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Export captures
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },

    /// Show or change capture preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["frame", "frames"])))]
struct CaptureArgs {
    /// A single PNG frame
    #[arg(long, value_name = "PNG")]
    frame: Option<PathBuf>,

    /// A directory of PNG frames played at --fps
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,

    /// Frame rate of --frames
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Playback position in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 0.0)]
    at: f64,

    /// Caption to save without prompting
    #[arg(long)]
    caption: Option<String>,

    /// Never ask for a caption
    #[arg(long)]
    no_prompt: bool,

    /// Page location the frame belongs to
    #[arg(long, default_value = DEFAULT_LOCATION)]
    url: String,
}

#[derive(Subcommand, Debug)]
enum ExportTarget {
    /// One PDF with a page per capture
    Pdf {
        /// Save here instead of asking
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// One PNG per capture plus index.txt
    Files {
        /// File name prefix
        #[arg(long, default_value = "screenshot")]
        prefix: String,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Print the current preferences
    Show,

    /// Change preferences
    Set {
        /// low, medium or high
        #[arg(long, value_name = "QUALITY")]
        image_quality: Option<ImageQuality>,

        /// Capture limit (1-100)
        #[arg(long, value_name = "N")]
        max_screenshots: Option<String>,

        #[arg(long, value_name = "BOOL")]
        auto_timestamp: Option<bool>,

        #[arg(long, value_name = "BOOL")]
        prompt_caption: Option<bool>,

        #[arg(long, value_name = "BOOL")]
        dark_mode: Option<bool>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the config file location
    Path,

    /// Write a config file with default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::get_config_path()?,
    };

    if let Command::Config { action } = &cli.command {
        return run_config(action, &config_path);
    }

    let config = Config::load_from(&config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run(cli.command, config))
}

fn run_config(action: &ConfigAction, config_path: &Path) -> Result<ExitCode> {
    match action {
        ConfigAction::Path => println!("{}", config_path.display()),
        ConfigAction::Init { force } => {
            Config::default().save_to(config_path, *force)?;
            println!("Created config at {}", config_path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(command: Command, config: Config) -> Result<ExitCode> {
    let fresh_install = !config.storage.directory.exists();
    let storage: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.storage.directory));
    let settings_store = SettingsStore::new(Arc::clone(&storage));
    let settings = settings_store
        .load()
        .await
        .context("Failed to load settings")?;

    let outcome = match command {
        Command::Settings { action } => {
            return run_settings(action, &settings_store, settings).await;
        }
        Command::Config { .. } => return Ok(ExitCode::SUCCESS),
        Command::Capture(args) => {
            let element = open_media(&args)?;
            let page = StaticPage::new(Some(element), args.url.clone());
            let mut ctx = page_context(&config, storage, &settings_store, page, None, fresh_install);
            if args.caption.is_none() && !args.no_prompt {
                ctx = ctx.with_caption_prompt(Arc::new(TerminalCaptionPrompt));
            }

            capture_frame(&mut ctx, args.caption).await
        }
        Command::List => {
            let mut ctx = idle_page_context(&config, storage, &settings_store, None, fresh_install);
            ctx.init().await.context("Failed to load captures")?;
            ctx.view().map(|entries| {
                for entry in entries {
                    println!("{}", entry);
                }
            })
        }
        Command::Reset { yes } => {
            let mut ctx = idle_page_context(&config, storage, &settings_store, None, fresh_install);
            ctx.init().await.context("Failed to load captures")?;
            ctx.reset(|count| yes || confirm_reset(count)).await.map(|_| ())
        }
        Command::Export { target } => match target {
            ExportTarget::Pdf { output } => {
                let prompt: Arc<dyn SaveAsPrompt> = match output {
                    Some(path) => Arc::new(FixedLocation(path)),
                    None if io::stdin().is_terminal() => Arc::new(TerminalSavePrompt),
                    None => Arc::new(AcceptSuggested),
                };
                let mut ctx =
                    idle_page_context(&config, storage, &settings_store, Some(prompt), fresh_install);
                ctx.init().await.context("Failed to load captures")?;
                ctx.export_pdf().await
            }
            ExportTarget::Files { prefix } => {
                let mut ctx = idle_page_context(&config, storage, &settings_store, None, fresh_install);
                ctx.init().await.context("Failed to load captures")?;
                ctx.export_files(&FileNaming { prefix }).await.map(|_| ())
            }
        },
    };

    // Failures were already shown by the notifier.
    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("Command failed: {}", err);
            ExitCode::FAILURE
        }
    })
}

async fn run_settings(
    action: SettingsAction,
    settings_store: &SettingsStore,
    current: Settings,
) -> Result<ExitCode> {
    let settings = match action {
        SettingsAction::Show => current,
        SettingsAction::Set {
            image_quality,
            max_screenshots,
            auto_timestamp,
            prompt_caption,
            dark_mode,
        } => {
            let edit = SettingsEdit {
                image_quality,
                max_screenshots,
                auto_timestamp,
                prompt_caption,
                dark_mode,
            };
            let updated = edit.apply_to(&current);
            settings_store
                .save(&updated)
                .await
                .context("Failed to save settings")?;
            println!("Settings saved successfully!");
            updated
        }
    };

    println!("image_quality = {}", settings.image_quality);
    println!("max_screenshots = {}", settings.max_screenshots);
    println!("auto_timestamp = {}", settings.auto_timestamp);
    println!("prompt_caption = {}", settings.prompt_caption);
    println!("dark_mode = {}", settings.dark_mode);
    Ok(ExitCode::SUCCESS)
}

async fn capture_frame(ctx: &mut PageContext, caption: Option<String>) -> Result<(), PageError> {
    ctx.start().await?;
    let id = ctx.capture().await?;
    if let Some(caption) = caption {
        ctx.annotate(id, CaptionResponse::Save(caption)).await?;
    }
    ctx.settle_captions().await;
    Ok(())
}

fn open_media(args: &CaptureArgs) -> Result<Arc<dyn MediaElement>> {
    if let Some(path) = &args.frame {
        let frame = StillFrame::open(path, args.at)
            .with_context(|| format!("Failed to open frame {}", path.display()))?;
        return Ok(Arc::new(frame));
    }

    let dir = args.frames.as_ref().context("No frame source given")?;
    let sequence = FrameSequence::open(dir, args.fps)
        .with_context(|| format!("Failed to open frames in {}", dir.display()))?;
    sequence.seek(args.at);
    Ok(Arc::new(sequence))
}

fn notifier(config: &Config) -> Arc<dyn Notifier> {
    let runtime_handle = tokio::runtime::Handle::current();
    let display: Arc<dyn Notifier> = if config.notifications.desktop {
        let desktop = DesktopNotifier::new(&runtime_handle, config.notification_duration());
        Arc::new(MultiNotifier(vec![Arc::new(ConsoleNotifier), Arc::new(desktop)]))
    } else {
        Arc::new(ConsoleNotifier)
    };
    Arc::new(
        TransientNotifier::new(&runtime_handle, config.notification_duration())
            .with_display(display),
    )
}

fn page_context(
    config: &Config,
    storage: Arc<dyn KeyValueStore>,
    settings_store: &SettingsStore,
    page: StaticPage,
    save_prompt: Option<Arc<dyn SaveAsPrompt>>,
    fresh_install: bool,
) -> PageContext {
    let prompt = save_prompt.unwrap_or_else(|| Arc::new(AcceptSuggested));
    let downloads = Arc::new(FileSystemDownloads::new(
        config.downloads.directory.clone(),
        prompt,
    ));
    let mut connector = SpawnedHost::new(
        &tokio::runtime::Handle::current(),
        downloads,
        config.download_layout(),
    );
    if fresh_install {
        connector = connector.fresh_install();
    }

    PageContext::new(
        Arc::new(page),
        storage,
        Arc::new(connector),
        settings_store.subscribe(),
        notifier(config),
        config.page_options(),
    )
}

/// A page context for commands that do not capture.
fn idle_page_context(
    config: &Config,
    storage: Arc<dyn KeyValueStore>,
    settings_store: &SettingsStore,
    save_prompt: Option<Arc<dyn SaveAsPrompt>>,
    fresh_install: bool,
) -> PageContext {
    page_context(
        config,
        storage,
        settings_store,
        StaticPage::new(None, DEFAULT_LOCATION),
        save_prompt,
        fresh_install,
    )
}

fn confirm_reset(count: usize) -> bool {
    let mut stdout = io::stdout();
    if write!(
        stdout,
        "Are you sure you want to reset all {} captures? [y/N] ",
        count
    )
    .and_then(|_| stdout.flush())
    .is_err()
    {
        return false;
    }

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}
