use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "flowmap")]
#[command(about = "Join commuting flows with area centroids, export scenarios and serve queries")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = "flowmap.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every declared scenario and write one GeoJSON file per scenario
    Export(ExportArgs),
    /// Serve the flow query API
    Serve(ServeArgs),
    /// Show the busiest areas and suggest scenarios
    Analyze(AnalyzeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Only run the named scenarios (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    pub only: Vec<String>,

    /// Override monitoring setting from config
    #[arg(long)]
    pub monitor: Option<bool>,

    /// Override the output directory from config
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Show what would be exported without reading any data
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Number of areas listed per ranking
    #[arg(long, default_value = "10")]
    pub top: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export_flags() {
        let cli = CliConfig::parse_from([
            "flowmap",
            "export",
            "--only",
            "top1000-geral",
            "--only",
            "london-inflows-top5000",
            "--dry-run",
            "-c",
            "custom.toml",
        ]);
        assert_eq!(cli.config, "custom.toml");
        match cli.command {
            Command::Export(args) => {
                assert_eq!(args.only.len(), 2);
                assert!(args.dry_run);
                assert_eq!(args.monitor, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = CliConfig::parse_from(["flowmap", "serve", "--port", "8080"]);
        assert_eq!(cli.config, "flowmap.toml");
        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.host, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        CliConfig::command().debug_assert();
    }
}
