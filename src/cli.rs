use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::options::{parse_assignment, Mode, OptionValue};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "repkg-runner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch front-end for the RePKG wallpaper package tool")]
#[command(
    long_about = "repkg-runner expands the selected files and folders into .pkg/.tex inputs \
                  and runs RePKG once per input, one at a time, collecting a report of \
                  what succeeded and what failed."
)]
#[command(before_help = "📦 repkg-runner - RePKG batch runner")]
#[command(after_help = "EXAMPLES:\n  \
    repkg-runner scene.pkg\n  \
    repkg-runner ~/wallpapers --recursive --output extracted --overwrite\n  \
    repkg-runner --mode info scene.pkg --sortby size\n  \
    repkg-runner scene.pkg --set exts_only=png,jpg --tool /opt/repkg/RePKG\n  \
    repkg-runner --config-set extract.overwrite=true")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Files or folders to process
    #[arg(required_unless_present_any = ["generate_config", "config_get", "config_set"])]
    pub inputs: Vec<PathBuf>,

    /// RePKG operation
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Output directory for extracted files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to the RePKG executable
    #[arg(long, env = "REPKG_PATH")]
    pub tool: Option<PathBuf>,

    /// Descend into sub-folders of folder inputs
    #[arg(short, long)]
    pub recursive: bool,

    /// Extract: convert all TEX files into images
    #[arg(short = 't', long)]
    pub tex: bool,

    /// Extract: put every file into one directory
    #[arg(short = 's', long)]
    pub singledir: bool,

    /// Extract: use the project title as folder name
    #[arg(short = 'n', long)]
    pub usename: bool,

    /// Extract: do not convert TEX files
    #[arg(long)]
    pub no_tex_convert: bool,

    /// Extract: overwrite existing files
    #[arg(long)]
    pub overwrite: bool,

    /// Extract: copy project.json and preview.jpg next to the output
    #[arg(long)]
    pub copyproject: bool,

    /// Extract: only these extensions (comma-separated)
    #[arg(short = 'e', long, value_name = "EXTS")]
    pub exts_only: Option<String>,

    /// Extract: skip these extensions (comma-separated)
    #[arg(short = 'i', long, value_name = "EXTS")]
    pub exts_ignore: Option<String>,

    /// Info: sort entries by name, extension or size
    #[arg(long, value_name = "FIELD")]
    pub sortby: Option<String>,

    /// Info: sort entries
    #[arg(long)]
    pub sort: bool,

    /// Info: print package entries
    #[arg(long)]
    pub print_entries: bool,

    /// Info: print TEX details
    #[arg(long)]
    pub info_tex: bool,

    /// Info: project.json keys to print (comma-separated)
    #[arg(long, value_name = "KEYS")]
    pub project_info: Option<String>,

    /// Info: only show projects whose title contains this text
    #[arg(long, value_name = "TEXT")]
    pub title_filter: Option<String>,

    /// Set any RePKG option by key (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, OptionValue)>,

    /// Input file extensions to pick up (comma-separated)
    #[arg(long, value_name = "EXTS")]
    pub extensions: Option<String>,

    /// Run log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not write the run log
    #[arg(long)]
    pub no_log: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show the commands that would run without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,

    /// Print one configuration value (e.g. run.output_dir)
    #[arg(long, value_name = "KEY")]
    pub config_get: Option<String>,

    /// Change one configuration value and save the file
    #[arg(long, value_name = "KEY=VALUE")]
    pub config_set: Option<String>,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides::new()
            .with_tool_path(self.tool.clone())
            .with_mode(self.mode)
            .with_output_dir(self.output.clone())
            .with_extensions(self.extensions.clone())
            .with_log_enabled(self.no_log.then_some(false))
            .with_log_file(self.log_file.clone());

        for (key, value) in &self.set {
            overrides = overrides.with_option(key.clone(), value.clone());
        }

        // Switches only ever turn an option on; `--set key=false` turns it off.
        let switches = [
            ("recursive", self.recursive),
            ("tex", self.tex),
            ("singledir", self.singledir),
            ("usename", self.usename),
            ("no_tex_convert", self.no_tex_convert),
            ("overwrite", self.overwrite),
            ("copyproject", self.copyproject),
            ("sort", self.sort),
            ("printentries", self.print_entries),
            ("info_tex", self.info_tex),
        ];
        for (key, enabled) in switches {
            if enabled {
                overrides = overrides.with_option(key, OptionValue::Flag(true));
            }
        }

        let texts = [
            ("exts_only", &self.exts_only),
            ("exts_ignore", &self.exts_ignore),
            ("sortby", &self.sortby),
            ("projectinfo", &self.project_info),
            ("title_filter", &self.title_filter),
        ];
        for (key, value) in texts {
            if let Some(value) = value {
                overrides = overrides.with_option(key, OptionValue::Text(value.clone()));
            }
        }

        overrides
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}
