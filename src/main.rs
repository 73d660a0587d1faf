use std::path::PathBuf;

use tracing::{info, warn};

use quill::config::Config;
use quill::editor::Editor;
use quill::error::{Error, Result};
use quill::files::{self, FileService};
use quill::logging;
use quill::session::Session;

const USAGE: &str = "\
usage: quill [PATH]

Opens PATH, or an empty untitled document.

keys: ^N new  ^O open  ^S save  ^Z undo  ^Y redo  ^Q quit

options:
  -h, --help       show this help
  -V, --version    show the version";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("-h") | Some("--help") => {
            println!("{USAGE}");
            return Ok(());
        }
        Some("-V") | Some("--version") => {
            println!("quill {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }
    if args.len() > 1 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    // A broken config should not keep the editor from starting
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    if let Err(e) = logging::init(&config) {
        eprintln!("quill: logging disabled: {e}");
    }
    if let Some(e) = &config_error {
        warn!(error = %e, "using default config");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let session = match args.first() {
        Some(arg) => open_initial(&runtime, &config, PathBuf::from(arg))?,
        None => Session::new(config.tab_size, config.history.max_depth),
    };

    let files = FileService::new(runtime.handle().clone());
    let mut editor = Editor::new(config, session, files)?;
    if let Some(e) = config_error {
        editor.set_message(format!("Config ignored: {e}"));
    }
    info!("editor started");
    editor.run()?;
    Ok(())
}

// A path that does not exist yet starts an empty document bound to it.
// The path is made absolute so saving goes back to the same file.
fn open_initial(runtime: &tokio::runtime::Runtime, config: &Config, path: PathBuf) -> Result<Session> {
    let path = std::path::absolute(&path)?;
    let text = match runtime.block_on(files::read_text(&path)) {
        Ok(text) => text,
        Err(e) if e.is_not_found() => String::new(),
        Err(e) => return Err(Error::File(e)),
    };
    Ok(Session::with_text(
        &text,
        Some(path),
        config.tab_size,
        config.history.max_depth,
    ))
}
