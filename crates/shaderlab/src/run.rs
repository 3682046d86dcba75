use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::thread;

use anyhow::{bail, Context, Result};
use crossbeam_channel::{select, unbounded, Sender};
use renderer::{Diagnostic, PreviewEvent, PreviewRuntime};
use shadergen::{
    GenerationConfig, GenerationWorker, HttpGenerationClient, ShaderGenerator, SubmitError,
    DEFAULT_API_URL,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::bootstrap::bootstrap_filesystem;
use crate::cli::{GenerateArgs, RunArgs};
use crate::config::{FileConfig, Settings};
use crate::editor::{AppEvent, EditWatcher, Editor, PreviewSink, GENERATING_STATUS};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config_path = args.config.clone().unwrap_or_else(|| paths.config_file());
    let file = load_file_config(Some(&config_path))?;
    let settings = Settings::resolve(&args, file, &paths)?;
    debug!(
        config = %paths.config_dir().display(),
        data = %paths.data_dir().display(),
        shader = %settings.shader_path.display(),
        api_url = %settings.api_url,
        "resolved shaderlab settings"
    );

    let initial = bootstrap_filesystem(&paths, &settings.shader_path)?;
    let client = HttpGenerationClient::new(GenerationConfig::new(&settings.api_url)?)
        .context("failed to construct generation client")?;

    let preview = match PreviewRuntime::spawn(settings.renderer_config(), initial.clone()) {
        Ok(preview) => preview,
        Err(err) => {
            if let Some(diagnostic) = err.downcast_ref::<Diagnostic>() {
                error!("{diagnostic}");
            }
            return Err(err.context("failed to open preview window"));
        }
    };

    let (app_tx, app_rx) = unbounded();
    let worker_tx = app_tx.clone();
    let worker = GenerationWorker::spawn(client, move |outcome| {
        let _ = worker_tx.send(AppEvent::Generated(outcome));
    })
    .context("failed to start generation worker")?;

    let _watcher = if settings.watch {
        Some(EditWatcher::spawn(&settings.shader_path, app_tx.clone())?)
    } else {
        info!("file watching disabled");
        None
    };
    spawn_prompt_reader(app_tx)?;

    let preview_events = preview.events().clone();
    let mut editor = Editor::new(preview, settings.shader_path.clone(), initial);
    if let Some(prompt) = args.prompt.as_deref() {
        submit_prompt(&worker, &editor, prompt);
    }
    info!("type a prompt and press enter to generate a shader");

    loop {
        select! {
            recv(app_rx) -> event => {
                let Ok(event) = event else { break };
                let outcome = match event {
                    AppEvent::FileChanged => editor.file_changed(),
                    AppEvent::Prompt(prompt) => {
                        submit_prompt(&worker, &editor, &prompt);
                        Ok(())
                    }
                    AppEvent::Generated(outcome) => editor.generated(outcome),
                };
                if let Err(err) = outcome {
                    warn!("{err:#}");
                }
            }
            recv(preview_events) -> event => match event {
                Ok(PreviewEvent::Closed) | Err(_) => break,
                Ok(event) => editor.preview_event(&event),
            },
        }
    }

    info!("preview closed; shutting down");
    drop(worker);
    editor.into_preview().shutdown()
}

fn submit_prompt<P: PreviewSink>(worker: &GenerationWorker, editor: &Editor<P>, prompt: &str) {
    let status = match worker.submit(prompt) {
        Ok(()) => GENERATING_STATUS.to_string(),
        Err(SubmitError::EmptyPrompt) => return,
        Err(err) => {
            warn!("{err}");
            err.to_string()
        }
    };
    if let Err(err) = editor.status(status) {
        warn!("{err:#}");
    }
}

fn spawn_prompt_reader(events: Sender<AppEvent>) -> Result<()> {
    thread::Builder::new()
        .name("shaderlab-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if events.send(AppEvent::Prompt(line)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("failed to read prompt from stdin: {err}");
                        break;
                    }
                }
            }
            debug!("prompt reader finished");
        })
        .context("failed to spawn prompt reader")?;
    Ok(())
}

pub fn generate(args: GenerateArgs, config: Option<&Path>) -> Result<()> {
    if args.prompt.trim().is_empty() {
        bail!("prompt must not be empty");
    }
    let api_url = match args.api_url {
        Some(url) => url,
        None => configured_api_url(config)?,
    };
    let client = HttpGenerationClient::new(GenerationConfig::new(&api_url)?)
        .context("failed to construct generation client")?;
    let fragment = client.generate(args.prompt.trim())?;

    match args.output {
        Some(path) => {
            fs::write(&path, &fragment)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote generated shader");
        }
        None => println!("{fragment}"),
    }
    Ok(())
}

/// API url from the config file, or the built-in default when it sets none.
fn configured_api_url(config: Option<&Path>) -> Result<String> {
    let file = load_file_config(config)?;
    Ok(file.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()))
}

fn load_file_config(config: Option<&Path>) -> Result<FileConfig> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => AppPaths::discover()?.config_file(),
    };
    FileConfig::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

pub fn print_paths(config: Option<&Path>) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config_path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.config_file());
    let file = load_file_config(Some(&config_path))?;
    let shader = file.shader.unwrap_or_else(|| paths.default_edit_file());

    println!("config dir:  {}", paths.config_dir().display());
    println!("data dir:    {}", paths.data_dir().display());
    println!("cache dir:   {}", paths.cache_dir().display());
    println!("config file: {}", config_path.display());
    println!("shader file: {}", shader.display());
    Ok(())
}
