use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use twdict_app::profile::load_config;
use twdict_app::service::QueryService;
use twdict_app::status::Status;
use twdict_config::DEFAULT_DICTIONARY;
use twdict_types::{DetailLevel, VersionCheck};

/// Taiwan MOE dictionary downloader and lookup tool.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[clap(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Root directory for datasets and metadata.json
    #[arg(global = true, long)]
    storage_path: Option<PathBuf>,

    /// JSON config file (defaults to $TWDICT_CONFIG)
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(global = true, long, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download or update a dictionary
    #[command(alias = "update")]
    Download {
        #[arg(long, default_value = DEFAULT_DICTIONARY)]
        dict_name: String,
        /// Download even when the installed version is current
        #[arg(long)]
        force: bool,
        /// Only report whether an update exists
        #[arg(long)]
        check_only: bool,
    },
    /// Look a word up
    Query {
        #[arg(long)]
        word: String,
        #[arg(long, default_value = DEFAULT_DICTIONARY)]
        dict_name: String,
        /// Include part of speech, examples and extra notes
        #[arg(long)]
        full: bool,
        /// List headwords starting with the word instead
        #[arg(long)]
        prefix: bool,
    },
    /// Check installed dictionaries for newer versions
    Check {
        #[arg(long, conflicts_with = "all")]
        dict_name: Option<String>,
        #[arg(long)]
        all: bool,
        /// Update every dictionary that has a newer version
        #[arg(long)]
        auto_update: bool,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(atty::is(atty::Stream::Stderr)).init();
    }
}

fn print<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::error!("cannot serialize output: {e}"),
    }
}

fn fail(status: Status, message: String) -> Status {
    print(&json!({ "status": "error", "code": status.code(), "message": message }));
    status
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.global.json_logs);

    let mut config = match load_config(cli.global.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(Status::Failure, format!("{e:#}")).into(),
    };
    if let Some(storage_path) = cli.global.storage_path {
        config.storage_path = storage_path;
    }

    let service = match QueryService::with_http(config) {
        Ok(service) => service,
        Err(e) => return fail(Status::Failure, e.to_string()).into(),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_signal.cancel();
        }
    });

    run(&service, cli.command, &cancel).await.into()
}

async fn run(service: &QueryService, command: Command, cancel: &CancellationToken) -> Status {
    match command {
        Command::Download {
            dict_name,
            force,
            check_only,
        } => {
            if check_only {
                return match service.check_updates(&dict_name).await {
                    Ok(check) => {
                        print(&check);
                        Status::Success
                    }
                    Err(e) => fail(Status::from(&e), e.to_string()),
                };
            }
            update(service, &dict_name, force, cancel).await
        }

        Command::Query {
            word,
            dict_name,
            full,
            prefix,
        } => {
            if let Err(e) = service.open().await {
                return fail(Status::Failure, e.to_string());
            }

            if prefix {
                let limit = service.config().lookup.prefix_limit;
                return match service.suggest(&dict_name, &word, limit).await {
                    Ok(headwords) if !headwords.is_empty() => {
                        print(&json!({ "dictionary_id": dict_name, "prefix": word, "headwords": headwords }));
                        Status::Success
                    }
                    Ok(_) => fail(Status::NotFound, format!("no headword starts with '{word}'")),
                    Err(e) => fail(Status::from(&e), e.to_string()),
                };
            }

            let detail = if full { DetailLevel::Full } else { DetailLevel::Brief };
            match service.lookup(&dict_name, &word, detail).await {
                Ok(response) => {
                    print(&response);
                    Status::Success
                }
                Err(e) => fail(Status::from(&e), e.to_string()),
            }
        }

        Command::Check {
            dict_name,
            all,
            auto_update,
        } => {
            let checks: Vec<VersionCheck> = match dict_name.filter(|_| !all) {
                Some(id) => match service.check_updates(&id).await {
                    Ok(check) => {
                        print(&check);
                        vec![check]
                    }
                    Err(e) => return fail(Status::from(&e), e.to_string()),
                },
                None => match service.check_all().await {
                    Ok(summary) => {
                        print(&summary);
                        summary.dictionaries
                    }
                    Err(e) => return fail(Status::Failure, e.to_string()),
                },
            };

            if !auto_update {
                return Status::Success;
            }

            let mut status = Status::Success;
            for check in checks.iter().filter(|c| c.update_available) {
                let result = update(service, &check.dictionary_id, false, cancel).await;
                if result != Status::Success {
                    status = result;
                }
            }
            status
        }
    }
}

async fn update(
    service: &QueryService,
    dictionary_id: &str,
    force: bool,
    cancel: &CancellationToken,
) -> Status {
    match service.request_update(dictionary_id, force, cancel).await {
        Ok(report) => {
            print(&report);
            Status::Success
        }
        Err(e) => fail(Status::from(&e), e.to_string()),
    }
}
