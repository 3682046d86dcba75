use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const ENV_API_URL: &str = "SHADERLAB_API_URL";

#[derive(Parser, Debug)]
#[command(
    name = "shaderlab",
    author,
    version,
    about = "Live fragment shader editor with prompt-driven generation",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Fragment shader file to edit; every save rebuilds the preview.
    #[arg(long, value_name = "FILE")]
    pub shader: Option<PathBuf>,

    /// Generate a shader from this prompt once the window is up.
    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Base URL of the generation service.
    #[arg(long, value_name = "URL", env = ENV_API_URL)]
    pub api_url: Option<String>,

    /// Preview canvas size (e.g. `500x500`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Configuration file to use instead of `<config_dir>/shaderlab.toml`.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Do not watch the shader file for changes.
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Request one shader from the generation service and print its fragment source.
    Generate(GenerateArgs),
    /// Print resolved directories and files.
    Paths,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Description of the shader to generate.
    #[arg(value_name = "PROMPT")]
    pub prompt: String,

    /// Base URL of the generation service.
    #[arg(long, value_name = "URL", env = ENV_API_URL)]
    pub api_url: Option<String>,

    /// Write the fragment source here instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
