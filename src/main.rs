//! buildcfg CLI
//!
//! Entry point for the `buildcfg` command-line tool.

use buildcfg::emit::{self, EmitFormat, Emitter};
use buildcfg::error::ResolveError;
use buildcfg::source::{BuiltinDefaults, LayerRole, Locator, DEFAULT_ENV_PREFIX};
use buildcfg::{ConfigResolver, Schema, Variant};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "buildcfg")]
#[command(about = "Resolve layered build configuration into a packaging descriptor", version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve layers into a build descriptor
    Resolve {
        /// Build variant (debug or release)
        #[arg(long)]
        variant: Variant,

        /// Property file layer, lowest precedence first; prefix with
        /// `optional:` to allow it to be absent
        #[arg(long = "layer", required = true)]
        layers: Vec<LayerArg>,

        /// Secrets file holding signing.* keys (may be absent)
        #[arg(long)]
        secrets: Option<PathBuf>,

        /// Environment variable prefix for the environment layer
        #[arg(long, default_value = DEFAULT_ENV_PREFIX)]
        env_prefix: String,

        /// Skip the environment layer
        #[arg(long)]
        no_env: bool,

        /// Environment variable prefix for secrets (e.g. for CI)
        #[arg(long)]
        secrets_env_prefix: Option<String>,

        /// Schema file (TOML); defaults to the built-in Android schema
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Write the descriptor here instead of stdout
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Indented JSON instead of canonical JSON
        #[arg(long)]
        pretty: bool,

        /// Replace secret values with [REDACTED]
        #[arg(long)]
        redact: bool,
    },

    /// Print the built-in schema as TOML
    Schema,
}

/// `--layer` value
#[derive(Debug, Clone)]
struct LayerArg {
    path: PathBuf,
    optional: bool,
}

impl FromStr for LayerArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, optional) = match s.strip_prefix("optional:") {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        if path.is_empty() {
            return Err("layer path is empty".to_string());
        }
        Ok(Self {
            path: PathBuf::from(path),
            optional,
        })
    }
}

struct ResolveArgs {
    variant: Variant,
    layers: Vec<LayerArg>,
    secrets: Option<PathBuf>,
    env_prefix: Option<String>,
    secrets_env_prefix: Option<String>,
    schema: Option<PathBuf>,
    out: Option<PathBuf>,
    pretty: bool,
    redact: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version go to stdout; usage errors to stderr
            let _ = e.print();
            process::exit(usage_exit_code(&e));
        }
    };
    init_logging(cli.verbose);

    match cli.command {
        Commands::Resolve {
            variant,
            layers,
            secrets,
            env_prefix,
            no_env,
            secrets_env_prefix,
            schema,
            out,
            pretty,
            redact,
        } => {
            let args = ResolveArgs {
                variant,
                layers,
                secrets,
                env_prefix: (!no_env).then_some(env_prefix),
                secrets_env_prefix,
                schema,
                out,
                pretty,
                redact,
            };
            if let Err(e) = run_resolve(args) {
                report(&e);
                process::exit(e.exit_code());
            }
        }
        Commands::Schema => run_schema(),
    }
}

/// Exit code for a command line clap did not accept.
///
/// `--help` and `--version` succeed. Usage errors exit 1 so they never look
/// like a validation failure (2).
fn usage_exit_code(error: &clap::Error) -> i32 {
    if error.use_stderr() {
        1
    } else {
        0
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "buildcfg=debug" } else { "buildcfg=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Locators in precedence order: built-in defaults, files, environment,
/// then the secrets layers
fn build_locators(args: &ResolveArgs) -> Vec<Locator> {
    let mut locators = vec![Locator::Layer(BuiltinDefaults::default().to_layer())];

    let mut rank = 0;
    for layer in &args.layers {
        rank += 1;
        locators.push(if layer.optional {
            Locator::optional_file(&layer.path, rank)
        } else {
            Locator::file(&layer.path, rank)
        });
    }

    if let Some(prefix) = &args.env_prefix {
        locators.push(Locator::Environment {
            prefix: prefix.clone(),
            role: LayerRole::Config,
            rank: rank + 1,
        });
    }

    if let Some(path) = &args.secrets {
        locators.push(Locator::secrets_file(path, 0));
    }
    if let Some(prefix) = &args.secrets_env_prefix {
        locators.push(Locator::Environment {
            prefix: prefix.clone(),
            role: LayerRole::Secrets,
            rank: 1,
        });
    }

    locators
}

fn run_resolve(args: ResolveArgs) -> Result<(), ResolveError> {
    let schema = match &args.schema {
        Some(path) => Schema::from_file(path)?,
        None => Schema::builtin(),
    };
    tracing::debug!(schema = %schema.qualified_id(), variant = %args.variant, "resolving");

    let resolver = ConfigResolver::new(schema);
    let descriptor = resolver.resolve_locators(&build_locators(&args), args.variant)?;

    let format = if args.pretty {
        EmitFormat::Pretty
    } else {
        EmitFormat::Canonical
    };
    let bytes = Emitter::new(format)
        .redact_secrets(args.redact)
        .emit(&descriptor)?;
    let digest = emit::digest(&bytes);

    match &args.out {
        Some(path) => {
            fs::write(path, &bytes)?;
            tracing::info!(path = %path.display(), %digest, "wrote descriptor");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            if !args.pretty {
                stdout.write_all(b"\n")?;
            }
            stdout.flush()?;
            tracing::info!(%digest, "emitted descriptor");
        }
    }

    Ok(())
}

fn run_schema() {
    match Schema::builtin().to_toml() {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("Error rendering schema: {}", e);
            process::exit(1);
        }
    }
}

fn report(error: &ResolveError) {
    match error {
        ResolveError::Validation(violations) => {
            eprintln!(
                "Configuration invalid ({} violation(s)):",
                violations.len()
            );
            for v in violations {
                eprintln!("  {}", v);
            }
        }
        other => eprintln!("Error [{}]: {}", other.code(), other),
    }
}
