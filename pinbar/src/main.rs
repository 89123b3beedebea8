mod app;
mod core;
mod effect;
mod error;
mod event;
mod ipc;
#[cfg(target_os = "macos")]
mod macos;
mod platform;

use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use ipc::IpcClient;
use pinbar_ipc::{Command, Response};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pinbar - pin application windows under menu bar icons
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Option<SubCommand>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum SubCommand {
    Start(StartCmd),
    Version(VersionCmd),
    List(ListCmd),
    Add(AddCmd),
    Remove(RemoveCmd),
    Toggle(ToggleCmd),
    Bind(BindCmd),
    Unbind(UnbindCmd),
    ResetSize(ResetSizeCmd),
    Icon(IconCmd),
    Quit(QuitCmd),
}

/// Start the pinbar daemon
#[derive(FromArgs)]
#[argh(subcommand, name = "start")]
struct StartCmd {}

/// Show version information
#[derive(FromArgs)]
#[argh(subcommand, name = "version")]
struct VersionCmd {}

/// List pinned applications
#[derive(FromArgs)]
#[argh(subcommand, name = "list")]
struct ListCmd {}

/// Pin an application
#[derive(FromArgs)]
#[argh(subcommand, name = "add")]
struct AddCmd {
    /// path to the .app bundle
    #[argh(positional)]
    app_path: PathBuf,
}

/// Unpin an application
#[derive(FromArgs)]
#[argh(subcommand, name = "remove")]
struct RemoveCmd {
    /// profile id or bundle identifier
    #[argh(positional)]
    id: String,
}

/// Show or hide a pinned application's window
#[derive(FromArgs)]
#[argh(subcommand, name = "toggle")]
struct ToggleCmd {
    /// profile id or bundle identifier
    #[argh(positional)]
    id: String,
}

/// Bind a global shortcut to a pinned application
#[derive(FromArgs)]
#[argh(subcommand, name = "bind")]
struct BindCmd {
    /// profile id or bundle identifier
    #[argh(positional)]
    id: String,
    /// shortcut (e.g., cmd-shift-n, ctrl-alt-space)
    #[argh(positional)]
    key: String,
}

/// Remove a pinned application's shortcut
#[derive(FromArgs)]
#[argh(subcommand, name = "unbind")]
struct UnbindCmd {
    /// profile id or bundle identifier
    #[argh(positional)]
    id: String,
}

/// Forget the remembered window size
#[derive(FromArgs)]
#[argh(subcommand, name = "reset-size")]
struct ResetSizeCmd {
    /// profile id or bundle identifier
    #[argh(positional)]
    id: String,
}

/// Choose what the menu bar item shows
#[derive(FromArgs)]
#[argh(subcommand, name = "icon")]
struct IconCmd {
    /// profile id or bundle identifier
    #[argh(positional)]
    id: String,
    /// show the application icon instead of its name
    #[argh(switch)]
    app_icon: bool,
    /// render the icon as a monochrome template image
    #[argh(switch)]
    template: bool,
}

/// Quit the pinbar daemon
#[derive(FromArgs)]
#[argh(subcommand, name = "quit")]
struct QuitCmd {}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        None => {
            // No subcommand - show help (simulate --help)
            let args: Vec<&str> = vec!["pinbar", "--help"];
            if let Err(e) = Cli::from_args(&args[..1], &args[1..]) {
                println!("{}", e.output);
            }
            Ok(())
        }
        Some(SubCommand::Start(_)) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .init();

            tracing::info!("pinbar {} starting", VERSION);
            start()
        }
        Some(SubCommand::Version(_)) => {
            println!("pinbar {}", VERSION);
            Ok(())
        }
        Some(subcmd) => run_cli(subcmd),
    }
}

#[cfg(target_os = "macos")]
fn start() -> Result<()> {
    app::App::run()
}

#[cfg(not(target_os = "macos"))]
fn start() -> Result<()> {
    anyhow::bail!("the pinbar daemon only runs on macOS")
}

fn run_cli(subcmd: SubCommand) -> Result<()> {
    let cmd = to_command(subcmd)?;
    let mut client = IpcClient::connect()?;
    let response = client.send(&cmd)?;

    match response {
        Response::Ok => {}
        Response::Error { message } => {
            eprintln!("Error: {}", message);
            std::process::exit(1);
        }
        Response::Profiles { profiles } => {
            for p in profiles {
                let hotkey = p
                    .hotkey
                    .map(|h| format!(" [{}]", h.display))
                    .unwrap_or_default();
                println!(
                    "{}: {} ({}){}",
                    p.id, p.display_name, p.bundle_id, hotkey
                );
            }
        }
        Response::ProfileId { id } => println!("{}", id),
    }
    Ok(())
}

fn to_command(subcmd: SubCommand) -> Result<Command> {
    let cmd = match subcmd {
        SubCommand::Start(_) | SubCommand::Version(_) => {
            unreachable!("handled in main")
        }
        SubCommand::List(_) => Command::ListProfiles,
        SubCommand::Add(cmd) => {
            // The daemon resolves paths from its own working directory
            let path = std::fs::canonicalize(&cmd.app_path)
                .with_context(|| format!("{} does not exist", cmd.app_path.display()))?;
            Command::AddProfile {
                app_path: path.to_string_lossy().into_owned(),
            }
        }
        SubCommand::Remove(cmd) => Command::RemoveProfile { id: cmd.id },
        SubCommand::Toggle(cmd) => Command::Toggle { id: cmd.id },
        SubCommand::Bind(cmd) => Command::Bind {
            id: cmd.id,
            key: cmd.key,
        },
        SubCommand::Unbind(cmd) => Command::Unbind { id: cmd.id },
        SubCommand::ResetSize(cmd) => Command::ResetWindowSize { id: cmd.id },
        SubCommand::Icon(cmd) => Command::SetIcon {
            id: cmd.id,
            use_app_icon: cmd.app_icon,
            use_template_icon: cmd.template,
        },
        SubCommand::Quit(_) => Command::Quit,
    };
    Ok(cmd)
}
