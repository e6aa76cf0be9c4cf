use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use logweaver_core::domain::{OverallStatus, TaskExecutionRef};
use logweaver_core::impls::InMemoryTaskLookup;
use logweaver_core::ports::TaskRecord;
use logweaver_core::{LogConfig, ServiceBuilder, Tailer, viewer_link};

#[derive(Parser)]
#[command(name = "logweaver", about = "Fetch task logs from local disk, worker log servers and the archive")]
struct Cli {
    /// TOML config; defaults are used when omitted
    #[arg(long, env = "LOGWEAVER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the whole log of a task execution
    Fetch {
        #[command(flatten)]
        task: TaskArgs,

        /// Latest try of the execution (used when --try-number is omitted)
        #[arg(long, default_value_t = 1)]
        latest_try: u32,

        /// Print the JSON view instead of text
        #[arg(long)]
        json: bool,
    },
    /// Follow a running task's log until Ctrl-C
    Tail {
        #[command(flatten)]
        task: TaskArgs,

        #[arg(long, default_value_t = 1)]
        latest_try: u32,

        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Print the "Worker Logs" link
    Link {
        #[command(flatten)]
        task: TaskArgs,

        #[arg(long, env = "LOGWEAVER_BASE_URL")]
        base_url: String,
    },
}

#[derive(Args)]
struct TaskArgs {
    #[arg(long)]
    workflow_id: String,

    #[arg(long)]
    task_id: String,

    /// RFC 3339, e.g. 2024-01-01T00:00:00+00:00
    #[arg(long)]
    execution_timestamp: String,

    #[arg(long)]
    try_number: Option<u32>,
}

impl TaskArgs {
    fn to_ref(&self) -> Result<TaskExecutionRef, Box<dyn std::error::Error>> {
        Ok(TaskExecutionRef::parse(
            Some(self.workflow_id.as_str()),
            Some(self.task_id.as_str()),
            Some(self.execution_timestamp.as_str()),
            self.try_number,
        )?)
    }
}

fn load_config(path: Option<&Path>) -> Result<LogConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            Ok(LogConfig::load(path)?)
        }
        None => Ok(LogConfig::default()),
    }
}

/// スケジューラ DB の代わりに、引数で渡された latest_try をそのまま使う
fn build_service(
    config: LogConfig,
    latest_try: u32,
) -> Result<logweaver_core::RetrievalService, Box<dyn std::error::Error>> {
    let lookup = InMemoryTaskLookup::new().with_default(TaskRecord::found(Vec::new(), latest_try));
    Ok(ServiceBuilder::new(config)
        .lookup(Arc::new(lookup))
        .with_default_backends()?
        .build()?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Fetch {
            task,
            latest_try,
            json,
        } => {
            let task = task.to_ref()?;
            let service = build_service(load_config(cli.config.as_deref())?, latest_try)?;
            let result = service.fetch_full(&task).await?;

            if json {
                println!("{}", result.to_json()?);
            } else {
                print!("{}", result.render_text());
            }
            if result.overall_status == OverallStatus::Failed {
                std::process::exit(2);
            }
        }
        Command::Tail {
            task,
            latest_try,
            interval_ms,
        } => {
            let task = task.to_ref()?;
            let service = Arc::new(build_service(load_config(cli.config.as_deref())?, latest_try)?);
            let (tailer, mut rx) = Tailer::spawn(service, task, Duration::from_millis(interval_ms));

            let mut failure = None;
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("interrupted");
                        break;
                    }
                    item = rx.recv() => match item {
                        Some(Ok(result)) => {
                            for chunk in result.chunks.iter().filter(|c| !c.content.is_empty()) {
                                print!("{}", chunk.text());
                            }
                        }
                        Some(Err(err)) => {
                            failure = Some(err);
                            break;
                        }
                        None => break,
                    },
                }
            }
            tailer.shutdown_and_join().await;
            if let Some(err) = failure {
                return Err(err.into());
            }
        }
        Command::Link { task, base_url } => {
            let task = task.to_ref()?;
            println!("{}", viewer_link(&base_url, &task)?);
        }
    }

    Ok(())
}
