//! Command-line front end for frag templates.
//!
//! Renders a template file (or a named template from a directory) against a
//! JSON data file, and checks templates for structural problems.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{debug, warn};

use frag::TemplateCache;
use frag::exit_codes;
use frag::io::config::{CONFIG_FILE, load_config};
use frag::io::templates::{load_dir, read_template};
use frag::logging;
use frag::template::Template;

#[derive(Parser)]
#[command(
    name = "frag",
    version,
    about = "Expand string templates with placeholders and loops"
)]
struct Cli {
    /// Config file (defaults to `frag.toml` in the working directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the expansion of a template against JSON data.
    Render {
        /// Template file, or a template name when `--dir` is given.
        template: String,
        /// JSON file holding the data context (defaults to `{}`).
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Directory of `*.html` templates to resolve `template` from.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Report unclosed loops, stray `end` tags and malformed openers.
    Check {
        /// Template file to check.
        template: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Render {
            template,
            data,
            dir,
        } => cmd_render(cli.config.as_deref(), &template, data.as_deref(), dir.as_deref()),
        Command::Check { template } => cmd_check(&template),
    }
}

fn cmd_render(
    config: Option<&Path>,
    template: &str,
    data: Option<&Path>,
    dir: Option<&Path>,
) -> Result<i32> {
    let config_path = config.unwrap_or(Path::new(CONFIG_FILE));
    let cfg = load_config(config_path)?;
    let context = match data {
        Some(path) => read_json(path)?,
        None => Value::Object(Default::default()),
    };

    let mut cache = TemplateCache::with_options(cfg.render);
    match dir {
        Some(dir) => {
            load_dir(&mut cache, dir)?;
        }
        None => cache.set(template, &read_template(Path::new(template))?),
    }
    let Some(compiled) = cache.template(template) else {
        bail!(
            "no template named '{}' in {}",
            template,
            dir.map_or_else(|| ".".to_string(), |d| d.display().to_string())
        );
    };
    for diagnostic in compiled.diagnostics() {
        warn!(template, %diagnostic, "rendering template with structural problems");
    }

    debug!(template, "rendering");
    print!("{}", cache.get(template, &context));
    Ok(exit_codes::OK)
}

fn cmd_check(path: &Path) -> Result<i32> {
    let template = Template::compile(&read_template(path)?);
    if template.diagnostics().is_empty() {
        return Ok(exit_codes::OK);
    }
    for diagnostic in template.diagnostics() {
        println!("{}: {}", path.display(), diagnostic);
    }
    Ok(exit_codes::DIAGNOSTICS)
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}
