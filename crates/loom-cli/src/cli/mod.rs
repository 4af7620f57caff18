//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "loom",
    bin_name = "loom",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Model a workspace, then generate code from it",
    long_about = "Loom keeps a project model as a tree of scopes and entities, \
                  edits it with undoable operations and runs generator plugins \
                  over it to produce source files.",
    after_help = "EXAMPLES:\n\
        \x20 loom new shop.loom.json --name \"Online Shop\"\n\
        \x20 loom scope add shop.loom.json Sales\n\
        \x20 loom entity add shop.loom.json Sales Order --table orders\n\
        \x20 loom generate shop.loom.json --out ./shop\n\
        \x20 loom completions bash > /usr/share/bash-completion/completions/loom",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new, empty workspace file.
    #[command(
        visible_alias = "n",
        about = "Create a new workspace",
        after_help = "EXAMPLES:\n\
            \x20 loom new shop.loom.json\n\
            \x20 loom new shop.loom.json --name \"Online Shop\"\n\
            \x20 loom new shop.loom.json --force"
    )]
    New(NewArgs),

    /// Print the artifact tree of a workspace.
    #[command(
        about = "Show a workspace",
        after_help = "EXAMPLES:\n\
            \x20 loom show shop.loom.json\n\
            \x20 loom show shop.loom.json --format json"
    )]
    Show(ShowArgs),

    /// Add, list, rename, remove, import or export scopes.
    #[command(about = "Manage scopes", subcommand)]
    Scope(ScopeCommands),

    /// Add or list entities inside a scope.
    #[command(about = "Manage entities", subcommand)]
    Entity(EntityCommands),

    /// Run a batch of edits against a workspace and save once.
    #[command(
        about = "Apply an edit script",
        after_help = "SCRIPT FORMAT (one step per line, '#' starts a comment):\n\
            \x20 scope add <NAME>\n\
            \x20 scope rename <OLD> <NEW>\n\
            \x20 scope remove <NAME>\n\
            \x20 entity add <SCOPE> <NAME> [TABLE]\n\
            \x20 set <PATH> <KEY>=<VALUE>\n\
            \x20 copy <PATH> | cut <PATH> | paste [SCOPE]\n\
            \x20 undo | redo\n\n\
            PATH is a scope name or <SCOPE>/<ENTITY>."
    )]
    Apply(ApplyArgs),

    /// Run the registered generators over a workspace.
    #[command(
        visible_alias = "gen",
        about = "Generate files from a workspace",
        after_help = "EXAMPLES:\n\
            \x20 loom generate shop.loom.json --out ./shop\n\
            \x20 loom generate shop.loom.json --out ./shop --dry-run"
    )]
    Generate(GenerateArgs),

    /// Inspect the builtin plugins.
    #[command(about = "Plugin information", subcommand)]
    Plugins(PluginCommands),

    /// Initialise a Loom configuration file.
    #[command(
        about = "Initialise configuration",
        after_help = "EXAMPLES:\n\
            \x20 loom init           # default location\n\
            \x20 loom init --local   # .loom.toml in CWD"
    )]
    Init(InitArgs),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 loom completions bash > ~/.local/share/bash-completion/completions/loom\n\
            \x20 loom completions zsh  > ~/.zfunc/_loom\n\
            \x20 loom completions fish > ~/.config/fish/completions/loom.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Loom configuration.
    #[command(
        about = "Configuration management",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 loom config get history.max_undo\n\
            \x20 loom config list\n\
            \x20 loom config path"
    )]
    Config(ConfigCommands),
}

// ── new / show ────────────────────────────────────────────────────────────────

/// Arguments for `loom new`.
#[derive(Debug, Args)]
pub struct NewArgs {
    /// Workspace document to create.
    #[arg(value_name = "FILE", help = "Workspace file to create")]
    pub file: PathBuf,

    /// Workspace name; defaults to the file stem.
    #[arg(short = 'n', long = "name", value_name = "NAME", help = "Workspace name")]
    pub name: Option<String>,

    /// Overwrite an existing file (destructive).
    #[arg(long = "force", help = "Overwrite an existing workspace file")]
    pub force: bool,
}

/// Arguments for `loom show`.
#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(value_name = "FILE", help = "Workspace file")]
    pub file: PathBuf,

    #[arg(long = "format", value_enum, default_value = "tree", help = "Output format")]
    pub format: ShowFormat,
}

/// Output format for `loom show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    /// Indented artifact tree.
    Tree,
    /// The saved JSON document.
    Json,
}

// ── scope / entity ────────────────────────────────────────────────────────────

/// Subcommands for `loom scope`.
#[derive(Debug, Subcommand)]
pub enum ScopeCommands {
    /// Add a scope.
    Add {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        name: String,
    },
    /// List scopes.
    #[command(visible_alias = "ls")]
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Rename a scope.
    Rename {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        from: String,
        to: String,
    },
    /// Remove a scope and everything in it.
    #[command(visible_alias = "rm")]
    Remove {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        name: String,
        /// Skip the confirmation prompt.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Import scopes from a JSON document or TOML schema.
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// File or directory to import.
        #[arg(value_name = "SOURCE")]
        source: PathBuf,
        /// Datasource provider id; inferred from the extension when omitted.
        #[arg(short = 'p', long = "provider", value_name = "ID")]
        provider: Option<String>,
    },
    /// Write one scope to a standalone JSON document.
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        name: String,
        /// Destination document.
        #[arg(short = 'o', long = "out", value_name = "PATH")]
        out: PathBuf,
    },
}

/// Subcommands for `loom entity`.
#[derive(Debug, Subcommand)]
pub enum EntityCommands {
    /// Add an entity to a scope.
    Add {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        scope: String,
        name: String,
        /// Table name; derived from the entity name when omitted.
        #[arg(short = 't', long = "table", value_name = "TABLE")]
        table: Option<String>,
    },
    /// List the entities of a scope.
    #[command(visible_alias = "ls")]
    List {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        scope: String,
    },
}

// ── apply / generate ──────────────────────────────────────────────────────────

/// Arguments for `loom apply`.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[arg(value_name = "FILE", help = "Workspace file")]
    pub file: PathBuf,

    #[arg(value_name = "SCRIPT", help = "Edit script")]
    pub script: PathBuf,

    /// Run the script without saving the result.
    #[arg(long = "dry-run", help = "Run the script but do not save")]
    pub dry_run: bool,
}

/// Arguments for `loom generate`.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[arg(value_name = "FILE", help = "Workspace file")]
    pub file: PathBuf,

    /// Directory to write generated files into; must not exist yet.
    #[arg(short = 'o', long = "out", value_name = "DIR", help = "Output directory")]
    pub out: PathBuf,

    /// Preview what would be written without touching the disk.
    #[arg(long = "dry-run", help = "Show what would be generated without writing")]
    pub dry_run: bool,

    /// Keep the workspace file as it is after writing the output.
    #[arg(long = "no-record", help = "Do not record the run in the workspace")]
    pub no_record: bool,
}

// ── plugins ───────────────────────────────────────────────────────────────────

/// Subcommands for `loom plugins`.
#[derive(Debug, Subcommand)]
pub enum PluginCommands {
    /// List registered plugins.
    #[command(visible_alias = "ls")]
    List {
        #[arg(long = "format", value_enum, default_value = "table")]
        format: ListFormat,
    },
}

/// Output format for list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Human-readable table.
    Table,
    /// One id per line.
    List,
    /// JSON array.
    Json,
    /// CSV rows.
    Csv,
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `loom init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Write to `.loom.toml` in the current directory.
    #[arg(
        long = "local",
        help = "Create local configuration in current directory"
    )]
    pub local: bool,

    /// Overwrite an existing config file.
    #[arg(short = 'f', long = "force", help = "Overwrite existing configuration")]
    pub force: bool,
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `loom completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: Shell,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `loom config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `history.max_undo`.
        key: String,
    },
    /// Print all configuration values.
    List,
    /// Print the path to the global configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_new_command() {
        let cli = Cli::parse_from(["loom", "new", "shop.json", "--name", "Online Shop"]);
        match cli.command {
            Commands::New(args) => {
                assert_eq!(args.file, PathBuf::from("shop.json"));
                assert_eq!(args.name.as_deref(), Some("Online Shop"));
                assert!(!args.force);
            }
            other => panic!("expected New command, got {other:?}"),
        }
    }

    #[test]
    fn parse_entity_add_with_table() {
        let cli = Cli::parse_from([
            "loom", "entity", "add", "shop.json", "Sales", "Order", "-t", "orders",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Entity(EntityCommands::Add { ref table, .. }) if table.as_deref() == Some("orders")
        ));
    }

    #[test]
    fn generate_requires_out() {
        let result = Cli::try_parse_from(["loom", "generate", "shop.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn gen_alias_resolves() {
        let cli = Cli::parse_from(["loom", "gen", "shop.json", "--out", "out", "--dry-run"]);
        assert!(matches!(cli.command, Commands::Generate(ref g) if g.dry_run));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["loom", "--quiet", "--verbose", "config", "list"]);
        assert!(result.is_err());
    }
}
