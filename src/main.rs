//! MCore Jupyter kernel - main entry point.
//!
//! - `run -f <connection file>`: serve one frontend until shutdown
//! - `install`: write the kernelspec so Jupyter can find the kernel

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use mcore_kernel::ipc::{ConnectionInfo, KernelServer};
use mcore_kernel::kernel::Kernel;
use mcore_kernel::kernelspec::{self, KernelSpec};
use mcore_kernel::repl::ReplWrapper;
use mcore_kernel::{Config, Error};

#[derive(Debug, Parser)]
#[command(name = "mcore-kernel", version, about = "Jupyter kernel for MCore")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the kernel for a Jupyter connection file.
    Run {
        #[arg(short = 'f', long = "connection-file")]
        connection_file: PathBuf,

        /// JSON configuration file.
        #[arg(long, env = "MCORE_KERNEL_CONFIG")]
        config: Option<PathBuf>,

        /// Interpreter command line, e.g. "mi repl --no-line-edit".
        #[arg(long, env = "MCORE_REPL_COMMAND")]
        repl_command: Option<String>,

        /// Seconds to wait for a prompt; 0 waits forever.
        #[arg(long, env = "MCORE_REPL_TIMEOUT_SECS")]
        repl_timeout_secs: Option<u64>,
    },
    /// Install the kernelspec.
    Install {
        /// Install under <PREFIX>/share/jupyter instead of the user directory.
        #[arg(long)]
        prefix: Option<PathBuf>,

        #[arg(long, default_value = kernelspec::DEFAULT_NAME)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Run {
            connection_file,
            config,
            repl_command,
            repl_timeout_secs,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            if let Some(command_line) = repl_command {
                config.repl.set_command_line(&command_line)?;
            }
            if let Some(secs) = repl_timeout_secs {
                config.repl.timeout = (secs > 0).then(|| Duration::from_secs(secs));
            }
            config.repl.validate()?;

            mcore_kernel::observability::init_tracing(&config.observability);
            run(&connection_file, config).await?;
        }
        Command::Install { prefix, name } => {
            mcore_kernel::observability::init_tracing(&Config::default().observability);
            let exe = std::env::current_exe()?;
            let data_dir = kernelspec::data_dir(prefix.as_deref())?;
            let dir = kernelspec::install(&KernelSpec::mcore(&exe), &data_dir, &name)?;
            println!("Installed kernelspec {} in {}", name, dir.display());
        }
    }
    Ok(())
}

async fn run(connection_file: &std::path::Path, config: Config) -> mcore_kernel::Result<()> {
    let connection = ConnectionInfo::from_file(connection_file)?;

    tracing::info!(command = %config.repl.command, args = ?config.repl.args, "starting interpreter");
    let repl_config = config.repl.clone();
    let wrapper = tokio::task::spawn_blocking(move || ReplWrapper::spawn(&repl_config))
        .await
        .map_err(|e| Error::internal(format!("interpreter startup failed: {}", e)))??;
    let interrupter = wrapper.interrupter();

    let server = KernelServer::new(connection, Kernel::new(wrapper)).with_interrupter(interrupter);
    let cancel = server.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl-C, shutting down");
            cancel.cancel();
        }
    });

    server.serve().await
}
