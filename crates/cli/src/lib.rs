pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use certtrack_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use clap::{Args, Parser, Subcommand};

use crate::commands::report::ReportAction;
use crate::commands::requirements::RequirementsArgs;

#[derive(Debug, Parser)]
#[command(
    name = "certtrack",
    about = "Material certification document requirements CLI",
    long_about = "Resolve which certification documents a material needs, inspect upload progress, and gate report submission.",
    after_help = "Examples:\n  certtrack requirements --class 1 --price \"Gia công\" --ul 5 --uploaded 2,3,4,5\n  certtrack progress --id CERT-42\n  certtrack upload --id CERT-42 --slot 6 --file ul-report.pdf\n  certtrack submit --id CERT-42"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a certtrack.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override api.base_url")]
    api_base_url: Option<String>,
    #[arg(long, global = true, help = "Override auth.username")]
    username: Option<String>,
    #[arg(long, global = true, help = "Override requirements.ul_cert_fallback")]
    ul_fallback: Option<u32>,
    #[arg(long, global = true, help = "Override logging.level")]
    log_level: Option<String>,
}

impl GlobalArgs {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                api_base_url: self.api_base_url.clone(),
                auth_username: self.username.clone(),
                ul_cert_fallback: self.ul_fallback,
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Evaluate document requirements offline from classification flags")]
    Requirements {
        #[arg(long = "class", help = "Material class id")]
        material_class: Option<u32>,
        #[arg(long = "price", help = "Price request label or alias (processing|reliability|both)")]
        price_request: Option<String>,
        #[arg(long = "ul", help = "UL certification tier")]
        ul_cert_status: Option<u32>,
        #[arg(long = "dated", help = "Report actual date (YYYY-MM-DD)")]
        report_date: Option<String>,
        #[arg(long, value_delimiter = ',', help = "Slots holding at least one file")]
        uploaded: Vec<u8>,
        #[arg(long, value_delimiter = ',', help = "History action tags, e.g. UPLOAD_PDF")]
        history: Vec<String>,
    },
    #[command(about = "Print the required-document rule table")]
    Rules,
    #[command(about = "Load a certification and report its document progress")]
    Progress {
        #[arg(long)]
        id: String,
    },
    #[command(about = "Upload a document into a slot")]
    Upload {
        #[arg(long)]
        id: String,
        #[arg(long)]
        slot: u8,
        #[arg(long)]
        file: PathBuf,
    },
    #[command(about = "Delete an uploaded document")]
    DeleteFile {
        #[arg(long)]
        id: String,
        #[arg(long)]
        file_id: String,
    },
    #[command(about = "Submit the certification report once every required slot is filled")]
    Submit {
        #[arg(long)]
        id: String,
    },
    #[command(about = "Resubmit a report that went through a previous submission cycle")]
    Resubmit {
        #[arg(long)]
        id: String,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

/// Logs to stderr so stdout carries only command payloads.
pub fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.global.load_options();
    init_logging(&AppConfig::load(options.clone()).unwrap_or_default());

    let result = match cli.command {
        Command::Requirements {
            material_class,
            price_request,
            ul_cert_status,
            report_date,
            uploaded,
            history,
        } => commands::requirements::run(
            options,
            RequirementsArgs {
                material_class,
                price_request,
                ul_cert_status,
                report_date,
                uploaded,
                history,
            },
        ),
        Command::Rules => commands::rules::run(),
        Command::Progress { id } => commands::progress::run(options, &id),
        Command::Upload { id, slot, file } => {
            commands::files::run_upload(options, &id, slot, &file)
        }
        Command::DeleteFile { id, file_id } => commands::files::run_delete(options, &id, &file_id),
        Command::Submit { id } => commands::report::run(options, ReportAction::Submit, &id),
        Command::Resubmit { id } => commands::report::run(options, ReportAction::Resubmit, &id),
        Command::Config => commands::config::run(options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
