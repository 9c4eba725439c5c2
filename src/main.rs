use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use relwatch::{Monitor, MonitorConfig, RunOutcome};

/// Release feed monitor with ntfy push notifications.
#[derive(Parser, Debug)]
#[command(name = "relwatch", version, about)]
struct Args {
    /// Send a test notification and exit.
    #[arg(long)]
    test: bool,

    /// Number of recent releases to check in one run.
    #[arg(long, default_value_t = 1)]
    limit: usize,

    /// Disable notifications (dry run; state is still updated).
    #[arg(long, env = "RELWATCH_NO_NOTIFY")]
    no_notify: bool,

    /// ntfy topic to publish to.
    #[arg(long, env = "RELWATCH_TOPIC", default_value = "jksr_notifications")]
    topic: String,

    /// Directory for persisted state.
    #[arg(long, env = "RELWATCH_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Release feed URL (JSON array of releases, newest first).
    #[arg(
        long,
        env = "RELWATCH_FEED_URL",
        default_value = "https://api.github.com/repos/n8n-io/n8n/releases"
    )]
    feed_url: String,

    /// Name of the monitored project, used in titles and tags.
    #[arg(long, env = "RELWATCH_PROJECT", default_value = "n8n")]
    project: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = MonitorConfig::new(&args.project, &args.topic, &args.feed_url)
        .data_dir(&args.data_dir);

    let monitor = match Monitor::new(config) {
        Ok(monitor) => monitor,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if args.test {
        let result = monitor.send_test_notification().await;
        if result.success {
            println!("Test notification sent to https://ntfy.sh/{}", args.topic);
            return ExitCode::SUCCESS;
        }
        eprintln!(
            "Test notification failed after {} attempts: {}",
            result.attempts_used,
            result.last_error.unwrap_or_default()
        );
        return ExitCode::FAILURE;
    }

    match monitor.run_multi_check(args.limit, !args.no_notify).await {
        Ok(RunOutcome::NoChange) => {
            println!("No changes");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Changed(reports)) => {
            for report in &reports {
                let sent = if report.delivery.attempts_used == 0 {
                    "skipped"
                } else if report.delivery.success {
                    "sent"
                } else {
                    "failed"
                };
                println!("{} (notification {sent})", report.event.title);
            }
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::FeedError { message, .. }) => {
            eprintln!("Feed error: {message}");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
