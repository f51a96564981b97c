mod commands;
mod context;
mod examples;
mod output;
mod theme;
mod views;

use std::path::PathBuf;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{Styles, styling::AnsiColor},
};
use colored::{Color, Colorize};
use syncodex::GraphError;

use commands::{
    graph::{GraphCommands, handle_graph_commands},
    profile::{ProfileCommands, handle_profile_commands},
    project::{ProjectCommands, handle_project_commands},
};
use context::AppContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ARROW, COLOR_SUPPORTED, HELP};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("SYNCODEX_USER", "User id to act as (same as --as)"),
    ("REDIS_URL", "Redis connection URL for the redis backend"),
    ("RUST_LOG", "Log filter, e.g. syncodex=debug"),
];

#[derive(Parser)]
#[command(name = "syncodex")]
#[command(version)]
#[command(
    about = "Follow graph, profiles and channels for SynCodeX",
    long_about = r#"Command-line client for the SynCodeX social layer:

• Follow and unfollow users with both sides kept in sync
• List followers, following and mutual follows
• Edit your profile and publish projects to your channel

Store settings are read from .syncodex/config.toml in the current
directory or any parent, or from --config.
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to a config file instead of the discovered one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user id
    #[arg(long = "as", env = "SYNCODEX_USER", global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Parses with themed help; clap prints help, version and usage errors itself.
    fn parse_with_styles() -> Self {
        let matches = build_cli_command().get_matches();
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }
}

fn build_cli_command() -> Command {
    let use_color = *COLOR_SUPPORTED;
    let mut command = Cli::command()
        .styles(help_styles())
        .color(if use_color { ColorChoice::Auto } else { ColorChoice::Never })
        .after_long_help(render_appendix(use_color));
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            *subcommand = subcommand.clone().after_long_help(render_examples(example.groups, use_color));
        }
    }
    command
}

fn paint(text: &str, color: Color, use_color: bool) -> String {
    if use_color { text.color(color).to_string() } else { text.to_string() }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut lines = vec![paint("Examples:", HELP.heading, use_color)];
    for group in groups {
        lines.push(format!("  {}", paint(group.title, HELP.title, use_color)));
        lines.extend(
            group
                .commands
                .iter()
                .map(|command| format!("    {ARROW} {}", paint(command, HELP.literal, use_color))),
        );
    }
    lines.join("\n")
}

fn render_appendix(use_color: bool) -> String {
    let mut lines = vec![paint("Environment Variables:", HELP.heading, use_color)];
    lines.extend(
        ENVIRONMENT_VARIABLES
            .iter()
            .map(|(key, description)| format!("  {}  {description}", paint(key, HELP.key, use_color))),
    );
    lines.push(String::new());
    lines.push(format!(
        "{} Use 'syncodex <command> --help' to view examples for each command.",
        paint("Tip:", HELP.heading, use_color)
    ));
    lines.join("\n")
}

fn help_styles() -> Styles {
    Styles::styled()
        .usage(AnsiColor::BrightBlue.on_default().bold())
        .header(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Magenta.on_default())
        .placeholder(AnsiColor::BrightBlack.on_default())
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().bold())
}

#[derive(Subcommand)]
enum Commands {
    /// Create, view and edit profiles
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Publish and list channel projects
    #[command(subcommand)]
    Project(ProjectCommands),

    #[command(flatten)]
    Graph(GraphCommands),
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();
    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli, &output).await {
        // Library errors carry a friendlier message; the full chain goes to the log.
        match err.downcast_ref::<GraphError>() {
            Some(graph_err) => {
                log::debug!("{err:?}");
                output.error(&graph_err.user_message());
            }
            None => output.error(&format!("{err:#}")),
        }
        std::process::exit(1);
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let ctx = AppContext::connect(cli.config.as_deref(), cli.user.as_deref(), output).await?;

    match cli.command {
        Commands::Profile(command) => handle_profile_commands(command, &ctx, output).await?,
        Commands::Project(command) => handle_project_commands(command, &ctx, output).await?,
        Commands::Graph(command) => handle_graph_commands(command, &ctx, output).await?,
    }

    Ok(())
}
