//! Terminal host for the preview widget.
//!
//! Every line read from stdin replaces the input value; the preview is printed as block
//! characters. `:png`, `:jpg` and `:copy` run the option actions, `:clear` empties the
//! input and `:quit` exits.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use qirust_preview::config::WidgetConfig;
use qirust_preview::dom::{Document, COPY_ID};
use qirust_preview::helper::to_block_string;
use qirust_preview::logging::{init_logging, LogConfig};
use qirust_preview::output::{DirectorySink, MemoryClipboard};
use qirust_preview::{ActionOutcome, RenderOutcome, Widget, WidgetParts};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser)]
#[command(name = "qirust-preview", version, about = "Live QR code preview in the terminal")]
struct Cli {
    /// TOML file overriding widget defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory receiving downloads.
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// More output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Less output (-q errors only, -qq silent).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_config = LogConfig {
        with_ansi: std::io::stderr().is_terminal(),
        ..LogConfig::from_verbosity(cli.verbose, cli.quiet)
    };
    init_logging(&log_config).context("failed to initialize logging")?;

    let config = match &cli.config {
        Some(path) => WidgetConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => WidgetConfig::default(),
    };
    let clipboard = Arc::new(MemoryClipboard::new());
    let parts = WidgetParts {
        config,
        downloads: Arc::new(DirectorySink::new(&cli.out_dir)),
        clipboard: clipboard.clone(),
        ..WidgetParts::default()
    };
    let document = Arc::new(Mutex::new(Document::host_page()));
    let widget = Widget::mount(document, parts)?;
    info!("Type text to preview; :png, :jpg, :copy, :clear, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" | ":q" => break,
            ":png" => report(widget.click("download-png").await, &clipboard),
            ":jpg" => report(widget.click("download-jpg").await, &clipboard),
            ":copy" => report(widget.click(COPY_ID).await, &clipboard),
            text => {
                let text = if text == ":clear" { "" } else { line.as_str() };
                match widget.type_text(text).await {
                    Ok(RenderOutcome::Shown(handle)) => print_symbol(&widget, handle.text()),
                    Ok(RenderOutcome::Cleared) => println!("(cleared)"),
                    Ok(RenderOutcome::Superseded) => {}
                    Err(err) => println!("error: {err}"),
                }
            }
        }
    }
    Ok(())
}

fn print_symbol(widget: &Widget, text: &str) {
    let Some(engine) = widget.loader().engine() else {
        return;
    };
    match engine.encode(text, widget.config().correct_level) {
        Ok(matrix) => print!("{}", to_block_string(&matrix, 2)),
        Err(err) => println!("error: {err}"),
    }
}

fn report(outcome: ActionOutcome, clipboard: &MemoryClipboard) {
    match outcome {
        ActionOutcome::Ignored => println!("nothing to export"),
        ActionOutcome::Downloaded(path) => println!("saved {}", path.display()),
        ActionOutcome::Copied => {
            let bytes: usize = clipboard.items().iter().map(|i| i.bytes.len()).sum();
            println!("copied {bytes} bytes to clipboard");
        }
        ActionOutcome::Failed(err) => println!("error: {err}"),
    }
}
