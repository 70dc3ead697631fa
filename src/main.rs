mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use zipnav::config::{Config, Options, SavedSettings};
use zipnav::handle::LocalHandle;
use zipnav::ui::{ImportChoice, UiRequest};
use zipnav::{Downloads, Error, MemoryStore, Ui, Workspace};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zipnav=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = cli::parse_args();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    rt.block_on(run(args))
}

async fn load_options(args: &cli::Args) -> Options {
    let mut options = match Config::load().await {
        Ok(config) => config.options().await,
        Err(e) => {
            tracing::debug!(error = %e, "no config loaded, using defaults");
            Options::default()
        }
    };
    if args.unordered {
        options.keep_order = false;
    }
    if args.save_options {
        match SavedSettings::from_options(&options).save() {
            Ok(()) => tracing::info!("options saved"),
            Err(e) => tracing::warn!(error = %e, "failed to save options"),
        }
    }
    options
}

async fn run(args: cli::Args) -> ExitCode {
    let mut options = load_options(&args).await;
    // The password comes from the command line, never from a prompt
    options.prompt_for_export_password = false;

    let (ui, requests) = Ui::channel();
    let responder = tokio::spawn(respond(requests, args.password.clone()));

    let mut downloads = Downloads::new();
    let mut workspace = Workspace::new(MemoryStore::new(), ui, downloads.sink(), options);

    let mut items = Vec::new();
    let mut ok = true;
    for path in &args.paths {
        match LocalHandle::open(path).await {
            Ok(handle) => items.push(handle),
            Err(e) => {
                workspace.report::<()>(Err(e.annotate(path.display().to_string())));
                ok = false;
            }
        }
    }

    let dropped = workspace.drop_items(&items).await;
    ok &= workspace.report(dropped).is_some();

    let root = workspace.root();
    let output = match args.output {
        Some(path) => Some(path),
        None => workspace
            .report(workspace.default_export_filename(root))
            .map(PathBuf::from),
    };

    if let Some(output) = output {
        let filename = output.display().to_string();
        let exported = workspace
            .export_folder(root, &filename, args.password.clone())
            .await;
        ok &= workspace.report(exported).is_some();

        downloads.poll_updates();
        let finished = downloads
            .all()
            .iter()
            .rev()
            .find(|d| d.is_complete())
            .map(|d| d.id);
        if let Some(bytes) = finished.and_then(|id| downloads.take_output(id)) {
            match tokio::fs::write(&output, &bytes).await {
                Ok(()) => tracing::info!(path = %output.display(), size = bytes.len(), "archive written"),
                Err(e) => {
                    workspace.report::<()>(Err(Error::from(e).annotate(filename)));
                    ok = false;
                }
            }
        }
    } else {
        ok = false;
    }

    drop(workspace);
    let _ = responder.await;

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Non-interactive front end: archives given as input are imported, the
/// command-line password is offered once and errors are printed
async fn respond(mut requests: UnboundedReceiver<UiRequest>, password: Option<String>) {
    let mut password = password;
    while let Some(request) = requests.recv().await {
        match request {
            UiRequest::Password { reply, .. } => {
                if let Some(password) = password.take() {
                    let _ = reply.send(password);
                }
            }
            UiRequest::ChooseAction { reply, .. } => {
                let _ = reply.send(ImportChoice::ImportArchive);
            }
            UiRequest::Error(message) => eprintln!("error: {message}"),
        }
    }
}
