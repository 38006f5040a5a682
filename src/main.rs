//! pyrelay - CLI

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use rustyline::config::Config as EditorConfig;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use tracing::{debug, warn};

use pyrelay::kernel::{Console, ConsoleSink, Multiplexer, SharedConsole};
use pyrelay::util::config::{Config, ConsoleConfig};
use pyrelay::util::logger;
use pyrelay::{ChannelId, Kernel, TaskStatus, NAME, VERSION};

/// Run snippets on the pyrelay kernel
#[derive(Parser, Debug)]
#[command(name = "pyrelay")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a source file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the terminal status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate code from the command line
    Eval {
        /// Code to evaluate
        #[arg(value_name = "CODE")]
        code: String,

        /// Print the terminal status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an interactive shared console
    Repl,

    /// Print version information
    Version,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    if args.verbose {
        logger::init_debug();
        eprintln!("{} version: {}", NAME, VERSION);
        eprintln!("Host: {}", std::env::consts::OS);
    } else {
        logger::init_with_level(config.log.level);
    }

    let kernel = Kernel::new(config.kernel.clone());
    match args.command {
        Commands::Run { file, json } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read file: {}", file.display()))?;
            run_snippet(&kernel, &source, json, args.verbose)
                .with_context(|| format!("Failed to run: {}", file.display()))
        }
        Commands::Eval { code, json } => {
            run_snippet(&kernel, &code, json, args.verbose).context("Failed to evaluate code")
        }
        Commands::Repl => {
            repl(&kernel, &config.console).context("REPL failed")?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run one snippet on a console channel fed from host stdin
fn run_snippet(
    kernel: &Kernel,
    source: &str,
    json: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let channel = ChannelId::from("main");
    let mux = kernel.multiplexer();
    mux.open_channel(channel.clone(), ConsoleSink::new());
    forward_stdin(mux.clone(), channel.clone())?;

    let namespace = kernel.new_namespace();
    let status = kernel.submit(source, &channel, &namespace)?.join();
    report(&status, json, verbose)?;
    mux.close_channel(&channel);

    Ok(if status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Forward host stdin lines to the channel's input until EOF
fn forward_stdin(
    mux: Arc<Multiplexer>,
    channel: ChannelId,
) -> Result<()> {
    thread::Builder::new()
        .name("stdin-forwarder".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if !mux.send_input(&channel, line) {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                }
            }
            mux.close_input(&channel);
        })
        .context("Failed to start stdin forwarder")?;
    Ok(())
}

fn report(
    status: &TaskStatus,
    json: bool,
    verbose: bool,
) -> Result<()> {
    if json {
        let encoded = serde_json::to_string(status).context("Failed to encode status")?;
        println!("{}", encoded);
        return Ok(());
    }
    // Compile diagnostics only travel with the status
    if let TaskStatus::CompileError(detail) = status {
        eprintln!("{}", detail.red());
    }
    if verbose {
        if status.is_success() {
            eprintln!("{} {}", "status:".bold(), status.label().green());
        } else {
            eprintln!("{} {}", "status:".bold(), status.label().red());
        }
    }
    Ok(())
}

fn repl(
    kernel: &Kernel,
    config: &ConsoleConfig,
) -> Result<()> {
    let editor_config = EditorConfig::builder()
        .history_ignore_space(true)
        .max_history_size(config.history_size)?
        .build();
    let mut editor: Editor<(), FileHistory> = Editor::with_config(editor_config)?;
    if let Some(history_file) = &config.history_file {
        load_history(&mut editor, history_file);
    }

    // The editor owns the terminal, so guest reads see end of input
    let channel = ChannelId::from("repl");
    let mux = kernel.multiplexer();
    mux.open_channel(channel.clone(), ConsoleSink::new());
    mux.close_input(&channel);

    let mut console = SharedConsole::new();
    println!("{} {} - Ctrl+D to exit", NAME, VERSION);

    loop {
        let prompt = if console.buffer_mut().is_empty() {
            &config.prompt
        } else {
            &config.continuation_prompt
        };

        match editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    editor.add_history_entry(line.as_str())?;
                }
                if let Some(handle) = console.push_line(kernel, &line, &channel)? {
                    let status = handle.join();
                    debug!("repl snippet finished: {}", status);
                    report(&status, false, false)?;
                }
            }
            Err(ReadlineError::Interrupted) => {
                console.buffer_mut().reset();
                println!("KeyboardInterrupt");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    mux.close_channel(&channel);
    if let Some(history_file) = &config.history_file {
        if let Err(e) = editor.save_history(history_file) {
            warn!("failed to save history to {}: {}", history_file.display(), e);
        }
    }
    Ok(())
}

fn load_history(
    editor: &mut Editor<(), FileHistory>,
    path: &Path,
) {
    if path.exists() {
        if let Err(e) = editor.load_history(path) {
            warn!("failed to load history from {}: {}", path.display(), e);
        }
    }
}
