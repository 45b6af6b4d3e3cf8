use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use subtitle_proxy_cli::config::ConfigManager;
use subtitle_proxy_cli::error::CliError;
use subtitle_proxy_cli::output::{OutputFormat, create_formatter};
use subtitle_proxy_core::format;
use subtitle_proxy_core::{ProxyConfig, SearchCriteria, SubtitleFormat, SubtitleService};

#[derive(Parser)]
#[command(name = "subproxy")]
#[command(author, version, about = "Subtitle proxy - search, fetch and convert subtitles from OpenSubtitles", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Force JSON output
    #[arg(long, global = true)]
    json: bool,

    /// Read configuration from this file instead of the default location
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Remote(RemoteCommand),

    /// Convert a local subtitle file ('-' reads stdin)
    Convert {
        /// Input file, or '-' for stdin
        input: String,

        /// Source format (guessed from the file name or content when omitted)
        #[arg(long, value_enum)]
        from: Option<FormatArg>,

        /// Target format
        #[arg(long, value_enum)]
        to: FormatArg,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Commands that go through the subtitle service
#[derive(Subcommand)]
enum RemoteCommand {
    /// Search for subtitles
    Search(SearchArgs),

    /// Print a download link for a subtitle file
    Link {
        /// Subtitle file id from a search result
        file_id: String,

        /// Format the link serves
        #[arg(short, long, value_enum, default_value = "srt")]
        format: FormatArg,
    },

    /// Download the text of a subtitle file
    Content {
        /// Subtitle file id from a search result
        file_id: String,

        /// Format to return the content in
        #[arg(short, long, value_enum, default_value = "srt")]
        format: FormatArg,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a subtitle file over HTTP and convert it
    ConvertUrl {
        /// URL of the subtitle file
        url: String,

        /// Source format
        #[arg(long, value_enum)]
        from: FormatArg,

        /// Target format
        #[arg(long, value_enum)]
        to: FormatArg,
    },

    /// Show proxy status
    Status {
        /// Also query the remote ServerInfo method
        #[arg(long)]
        remote: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    target: SearchTargetArgs,

    /// File size in bytes, sent with --moviehash
    #[arg(long, requires = "moviehash")]
    size: Option<u64>,

    /// Comma-separated language codes (e.g. en,es)
    #[arg(short, long)]
    languages: Option<String>,

    /// Format of the returned download links
    #[arg(short, long, value_enum, default_value = "srt")]
    format: FormatArg,

    /// Include the subtitle text in each result
    #[arg(long)]
    content: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SearchTargetArgs {
    /// IMDb id, with or without the 'tt' prefix
    #[arg(long)]
    imdb_id: Option<String>,

    /// Free-text title query
    #[arg(short, long)]
    query: Option<String>,

    /// OpenSubtitles movie hash of a video file
    #[arg(long)]
    moviehash: Option<String>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the configuration file path
    Path,

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., remote.endpoint)
        key: String,
    },

    /// List all effective configuration values
    List,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Srt,
    Vtt,
}

impl From<FormatArg> for SubtitleFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Srt => SubtitleFormat::Srt,
            FormatArg::Vtt => SubtitleFormat::Vtt,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("subtitle_proxy_core", log::LevelFilter::Debug)
            .filter_module("subtitle_proxy_cli", log::LevelFilter::Debug)
            .filter_module("subproxy", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let debug = cli.debug;
    if let Err(error) = run(cli).await {
        let error = CliError::from(error);
        eprint!("{}", error.format_for_user(debug));
        std::process::exit(error.exit_code().code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let manager = ConfigManager::from_override(cli.config);
    let output_format = OutputFormat::detect(cli.json);

    match cli.command {
        Commands::Config { command } => config_command(&manager, command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        Commands::Convert {
            input,
            from,
            to,
            output,
        } => convert_command(&input, from.map(Into::into), to.into(), output.as_deref()),
        Commands::Remote(command) => {
            let config = manager.load()?;
            remote_command(&config, command, output_format).await
        }
    }
}

async fn remote_command(
    config: &ProxyConfig,
    command: RemoteCommand,
    output_format: OutputFormat,
) -> Result<()> {
    let service =
        SubtitleService::from_config(config).context("Failed to create subtitle service")?;
    let formatter = create_formatter(output_format);

    let result = async {
        match command {
            RemoteCommand::Search(args) => {
                let criteria = search_criteria(args);
                log::debug!("Searching with {criteria:?}");

                let results = service.search(&criteria).await.context("Search failed")?;
                print!("{}", formatter.format_results(&results)?);
            }
            RemoteCommand::Link { file_id, format } => {
                let link = service
                    .get_download_link_as(&file_id, format.into())
                    .await
                    .with_context(|| format!("Failed to get a link for {file_id}"))?;
                print!("{}", formatter.format_link(&link)?);
            }
            RemoteCommand::Content {
                file_id,
                format,
                output,
            } => {
                let text = match SubtitleFormat::from(format) {
                    SubtitleFormat::Srt => service.fetch_content(&file_id).await,
                    target => service.convert_and_cache(&file_id, target).await,
                }
                .with_context(|| format!("Failed to fetch content of {file_id}"))?;
                write_output(output.as_deref(), &text)?;
            }
            RemoteCommand::ConvertUrl { url, from, to } => {
                let text = service
                    .convert_url(&url, from.into(), to.into())
                    .await
                    .with_context(|| format!("Failed to convert {url}"))?;
                write_output(None, &text)?;
            }
            RemoteCommand::Status { remote } => {
                let status = service.status().await;
                print!("{}", formatter.format_status(&status)?);

                if remote {
                    let info = service
                        .server_info()
                        .await
                        .context("Failed to query server info")?;
                    if output_format == OutputFormat::Text {
                        println!("\n{}", "Server".bold());
                    }
                    print!("{}", formatter.format_server_info(&info)?);
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    service.shutdown().await;
    result
}

fn search_criteria(args: SearchArgs) -> SearchCriteria {
    let target = args.target;
    let criteria = if let Some(imdb_id) = target.imdb_id {
        SearchCriteria::imdb_id(imdb_id)
    } else if let Some(hash) = target.moviehash {
        SearchCriteria::movie_hash(hash, args.size)
    } else {
        SearchCriteria::query(target.query.unwrap_or_default())
    };

    let criteria = match args.languages {
        Some(languages) => criteria.with_languages([languages]),
        None => criteria,
    };

    criteria
        .with_format(args.format.into())
        .with_content(args.content)
}

fn convert_command(
    input: &str,
    from: Option<SubtitleFormat>,
    to: SubtitleFormat,
    output: Option<&Path>,
) -> Result<()> {
    let content = if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?
    };

    let from = from
        .or_else(|| SubtitleFormat::from_path(input))
        .or_else(|| format::detect_format(&content))
        .ok_or_else(|| {
            anyhow::Error::new(CliError::misuse(
                "Cannot tell the input format; pass --from srt or --from vtt",
            ))
        })?;

    let valid = match from {
        SubtitleFormat::Srt => format::validate_srt(&content),
        SubtitleFormat::Vtt => format::validate_vtt(&content),
    };
    if !valid {
        log::warn!("Input does not look like {from}; converting anyway");
    }

    write_output(output, &format::convert(&content, from, to))
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{}", format!("Wrote {}", path.display()).green());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn config_command(manager: &ConfigManager, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
        ConfigCommand::Get { key } => {
            println!("{}", manager.get(&key)?);
        }
        ConfigCommand::List => {
            let items = manager.list()?;

            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            // Group items by section
            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let (section, rest) = key.split_once('.').unwrap_or(("general", key.as_str()));
                sections
                    .entry(section.to_string())
                    .or_default()
                    .push((rest.to_string(), value));
            }

            for (section, items) in sections {
                println!("[{}]", section.yellow());
                for (key, value) in items {
                    println!("  {} = {}", key.cyan(), value);
                }
                println!();
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
