#![forbid(unsafe_code)]

mod client;
mod cmd;
mod output;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Context;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use pbl_core::ErrorCode;
use pbl_core::config::{Config, apply_env_overrides, load_config};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pblgen: PBL lecturer assignment generator",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output (alias for `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Backend base URL, e.g. `https://isme.example.ac.id/api`.
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Bearer token for the backend.
    #[arg(long, global = true, value_name = "TOKEN")]
    token: Option<String>,

    /// Config file to use instead of `.pblgen.toml` lookup.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Output mode from flags alone, used before config is available.
    fn flag_output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json, None)
    }

    /// Merge config file, environment, then flags.
    fn context(&self) -> anyhow::Result<Context> {
        let project_root = env::current_dir()?;
        let mut config = load_config(&project_root, self.config.as_deref()).map_err(|err| {
            let code = ErrorCode::ConfigParseError;
            CliError {
                message: format!("{err:#}"),
                suggestion: code.hint().map(str::to_string),
                error_code: Some(code.code().to_string()),
            }
        })?;
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        self.apply_flags(&mut config);

        let output = resolve_output_mode(self.format, self.json, config.output.as_deref());
        Ok(Context { config, output })
    }

    fn apply_flags(&self, config: &mut Config) {
        if let Some(url) = &self.api_url {
            config.api.base_url.clone_from(url);
        }
        if let Some(token) = &self.token {
            config.api.token = Some(token.clone());
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Allocation",
        about = "Generate lecturer assignments",
        long_about = "Allocate koordinator, tim blok and dosen mengajar for every PBL module of the active term and write them to the backend in one batch.",
        after_help = "EXAMPLES:\n    # Generate and write assignments\n    pblgen generate\n\n    # Preview with a reproducible tie-break\n    pblgen generate --dry-run --seed 42\n\n    # Start from a clean slate\n    pblgen generate --reset-first"
    )]
    Generate(cmd::generate::GenerateArgs),

    #[command(
        next_help_heading = "Allocation",
        about = "Plan assignments offline from a snapshot",
        long_about = "Run the allocator against a roster snapshot file. Nothing is written.",
        after_help = "EXAMPLES:\n    # Plan from a saved snapshot\n    pblgen plan --snapshot roster.json\n\n    # Deterministic output for diffing\n    pblgen plan --snapshot roster.json --stable --json"
    )]
    Plan(cmd::plan::PlanArgs),

    #[command(
        next_help_heading = "Allocation",
        about = "Clear assigned lecturers",
        long_about = "Remove lecturer assignments from the modules of the active term, or of the given courses only.",
        after_help = "EXAMPLES:\n    # Clear every module of the active term\n    pblgen reset\n\n    # Clear two courses\n    pblgen reset --course MK101 --course MK102"
    )]
    Reset(cmd::reset::ResetArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show assigned lecturers per module",
        after_help = "EXAMPLES:\n    # Everything in the active term\n    pblgen status\n\n    # One course from a snapshot\n    pblgen status --course MK101 --snapshot roster.json"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Read",
        about = "List kelompok kecil",
        after_help = "EXAMPLES:\n    # All semesters\n    pblgen groups\n\n    # One semester as JSON\n    pblgen groups --semester 3 --json"
    )]
    Groups(cmd::groups::GroupsArgs),

    #[command(
        next_help_heading = "Read",
        about = "Save backend data to a snapshot file",
        long_about = "Fetch everything the generator reads and save it as one JSON document for `pblgen plan`.",
        after_help = "EXAMPLES:\n    # Save the live roster\n    pblgen snapshot --out roster.json"
    )]
    Snapshot(cmd::snapshot::SnapshotArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    # Bash\n    pblgen completions bash > /etc/bash_completion.d/pblgen"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PBLGEN_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "pblgen=debug,pbl_core=debug,pbl_alloc=debug,info"
        } else {
            "pblgen=info,pbl_core=info,pbl_alloc=info,warn"
        })
    });

    let format = env::var("PBLGEN_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, ctx: &Context) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Generate(args) => cmd::generate::run_generate(args, ctx),
        Commands::Plan(args) => cmd::plan::run_plan(args, ctx),
        Commands::Reset(args) => cmd::reset::run_reset(args, ctx),
        Commands::Status(args) => cmd::status::run_status(args, ctx),
        Commands::Groups(args) => cmd::groups::run_groups(args, ctx),
        Commands::Snapshot(args) => cmd::snapshot::run_snapshot(args, ctx),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let (result, mode) = match cli.context() {
        Ok(ctx) => {
            debug!(base_url = %ctx.config.api.base_url, output = ?ctx.output, "resolved config");
            (run(&cli, &ctx), ctx.output)
        }
        Err(err) => (Err(err), cli.flag_output_mode()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Nothing else to do if stderr itself is gone.
            let _ = render_error(mode, &CliError::from_anyhow(&err));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["pblgen", "plan", "--snapshot", "r.json", "--json"]);
        assert!(cli.json);
        assert!(cli.flag_output_mode().is_json());
    }

    #[test]
    fn format_flag_wins_over_json() {
        let cli = Cli::parse_from(["pblgen", "--json", "--format", "text", "groups"]);
        assert_eq!(cli.flag_output_mode(), OutputMode::Text);
    }

    #[test]
    fn generate_flags_parse() {
        let cli = Cli::parse_from([
            "pblgen",
            "generate",
            "--dry-run",
            "--reset-first",
            "--seed",
            "42",
            "--term",
            "Genap",
        ]);
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert!(args.dry_run);
        assert!(args.reset_first);
        assert_eq!(args.allocation.seed, Some(42));
        assert_eq!(args.allocation.term.as_deref(), Some("Genap"));
    }

    #[test]
    fn stable_conflicts_with_seed() {
        let result = Cli::try_parse_from(["pblgen", "generate", "--stable", "--seed", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn plan_requires_snapshot() {
        assert!(Cli::try_parse_from(["pblgen", "plan"]).is_err());
    }

    #[test]
    fn reset_course_is_repeatable() {
        let cli = Cli::parse_from(["pblgen", "reset", "--course", "MK1", "--course", "MK2"]);
        let Commands::Reset(args) = cli.command else {
            panic!("expected reset");
        };
        assert_eq!(args.courses, vec!["MK1", "MK2"]);
    }

    #[test]
    fn connection_flags_override_config() {
        let cli = Cli::parse_from([
            "pblgen",
            "--api-url",
            "https://isme.test/api",
            "--token",
            "secret",
            "status",
        ]);
        let mut config = Config::default();
        cli.apply_flags(&mut config);
        assert_eq!(config.api.base_url, "https://isme.test/api");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["pblgen", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["pblgen", "generate"],
            vec!["pblgen", "plan", "--snapshot", "r.json"],
            vec!["pblgen", "reset"],
            vec!["pblgen", "status"],
            vec!["pblgen", "groups", "--semester", "1"],
            vec!["pblgen", "snapshot", "--out", "r.json"],
            vec!["pblgen", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
