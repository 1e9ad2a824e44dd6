//! CLI argument parsing using clap derive

use std::path::PathBuf;

use cfgsync_store::Codec;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// cfgsync - Export and import configuration between stores
#[derive(Parser, Debug)]
#[command(name = "cfgsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Active configuration directory (defaults to the `active_dir` setting)
    #[arg(long, global = true, value_name = "DIR", env = "CFGSYNC_ACTIVE")]
    pub active: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Filter options shared by export and import
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    /// Force a module on or off: NAME=WEIGHT or NAME=disabled
    #[arg(long = "adjust", value_name = "NAME=VALUE")]
    pub adjust: Vec<String>,

    /// Leave records matching this pattern alone (trailing * for prefixes)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,
}

/// How to show pending changes before an import
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preview {
    /// Names grouped by collection and operation
    List,
    /// Unified diff of every changed record
    Diff,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Write the active configuration to the sync directory
    ///
    /// Examples:
    ///   cfgsync export                 # Export to the configured sync_dir
    ///   cfgsync export ../sync -y      # Export elsewhere without asking
    ///   cfgsync export --format json   # Write JSON files
    Export {
        /// Sync directory (defaults to the `sync_dir` setting)
        dir: Option<PathBuf>,

        /// File format of the sync directory
        #[arg(long)]
        format: Option<Codec>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Apply the sync directory to the active configuration
    ///
    /// Examples:
    ///   cfgsync import                  # Preview, confirm and import
    ///   cfgsync import --preview diff   # Show record diffs first
    ///   cfgsync import --partial -y     # Never delete, no prompt
    Import {
        /// Sync directory (defaults to the `sync_dir` setting)
        dir: Option<PathBuf>,

        /// How to show the changes before applying them
        #[arg(long, value_enum, default_value = "list")]
        preview: Preview,

        /// Keep active records that are missing from the sync directory
        #[arg(long)]
        partial: bool,

        #[command(flatten)]
        filters: FilterArgs,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show what an import would change
    Status {
        /// Sync directory (defaults to the `sync_dir` setting)
        dir: Option<PathBuf>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_import_with_options() {
        let cli = Cli::try_parse_from([
            "cfgsync",
            "--active",
            "/srv/active",
            "import",
            "sync",
            "--preview",
            "diff",
            "--partial",
            "--adjust",
            "devel=0",
            "--exclude",
            "devel.*",
            "-y",
        ])
        .unwrap();

        assert_eq!(cli.active, Some(PathBuf::from("/srv/active")));
        assert_eq!(
            cli.command,
            Some(Commands::Import {
                dir: Some(PathBuf::from("sync")),
                preview: Preview::Diff,
                partial: true,
                filters: FilterArgs {
                    adjust: vec!["devel=0".to_string()],
                    exclude: vec!["devel.*".to_string()],
                },
                yes: true,
            })
        );
    }

    #[test]
    fn parse_export_format() {
        let cli = Cli::try_parse_from(["cfgsync", "export", "--format", "json"]).unwrap();
        match cli.command {
            Some(Commands::Export { format, dir, .. }) => {
                assert_eq!(format, Some(Codec::Json));
                assert_eq!(dir, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["cfgsync", "export", "--format", "xml"]).is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["cfgsync", "status", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }
}
