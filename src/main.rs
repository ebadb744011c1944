//! raincheck — personal automation toolkit.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;

use raincheck::config::Config;
use raincheck::constants;
use raincheck::env::Env;
use raincheck::mail::MailMonitor;
use raincheck::notify::{self, AtTargets, WebhookNotifier};
use raincheck::runner::{self, Job, JobOutcome};
use raincheck::secrets::SecretStore;
use raincheck::weather::RainReport;

use cli::args::{Cli, Command, MailArgs, NotifyArgs, RunArgs, SecretsAction};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let env = Env::real();
    let config =
        Config::load(Some(Path::new(".")), &env).context("failed to load configuration")?;

    let secrets_path = cli
        .secrets_file
        .clone()
        .or_else(|| config.secrets.file.clone())
        .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_SECRETS_FILE));
    let store = Arc::new(SecretStore::new(secrets_path));

    match cli.command {
        Command::Run(args) => run_all_jobs(store, &config, args).await,
        Command::Rain => run_rain(store, &config).await,
        Command::Mail(args) => run_mail(store, &config, args).await,
        Command::Notify(args) => run_notify(store, &config, args).await,
        Command::Secrets { action } => run_secrets(&store, action),
        Command::Version => run_version(),
    }
}

/// The webhook self-test job used by `run`.
struct NotifyJob {
    notifier: WebhookNotifier,
    message: String,
}

#[async_trait::async_trait]
impl Job for NotifyJob {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn run(&self) -> Result<String> {
        let response = self.notifier.send(&self.message).await?;
        Ok(format!("webhook accepted (errcode {})", response.errcode))
    }
}

/// The rain report job used by `run`.
struct RainJob {
    report: RainReport,
}

#[async_trait::async_trait]
impl Job for RainJob {
    fn name(&self) -> &'static str {
        "rain_report"
    }

    async fn run(&self) -> Result<String> {
        Ok(self.report.rain_or_not().await?)
    }
}

/// Preload credentials, show the diagnostic listing, and run all jobs.
async fn run_all_jobs(store: Arc<SecretStore>, config: &Config, args: RunArgs) -> Result<()> {
    store.load().context("failed to preload credentials")?;
    println!("{}", "= loaded credentials =".bold());
    println!("{}", store.list()?);
    println!("{}", "=".bold());

    let at = AtTargets::from_config(&config.notify);
    let notifier = WebhookNotifier::new(Arc::clone(&store), at.clone());
    let report = RainReport::new(
        Arc::clone(&store),
        WebhookNotifier::new(Arc::clone(&store), at),
        config.weather.clone(),
    );

    let jobs: Vec<Box<dyn Job>> = vec![
        Box::new(NotifyJob {
            notifier,
            message: args.message,
        }),
        Box::new(RainJob { report }),
    ];

    let outcomes = runner::run_all(jobs).await;
    let failed = render_outcomes(&outcomes);
    if failed > 0 {
        bail!("{failed} job(s) failed");
    }
    println!("all jobs finished");
    Ok(())
}

/// Print one line per job outcome; returns the number of failures.
fn render_outcomes(outcomes: &[JobOutcome]) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(summary) => println!(
                " {} {} ({:.2?}): {summary}",
                "✔".green().bold(),
                outcome.name.bold(),
                outcome.elapsed,
            ),
            Err(e) => {
                failed += 1;
                eprintln!(
                    " {} {} ({:.2?}): {e:#}",
                    "✖".red().bold(),
                    outcome.name.bold(),
                    outcome.elapsed,
                );
            }
        }
    }
    failed
}

/// Run the rain report once.
async fn run_rain(store: Arc<SecretStore>, config: &Config) -> Result<()> {
    let notifier = WebhookNotifier::new(Arc::clone(&store), AtTargets::from_config(&config.notify));
    let report = RainReport::new(store, notifier, config.weather.clone());
    let summary = report.rain_or_not().await.context("rain report failed")?;
    println!("{summary}");
    Ok(())
}

/// Poll the inbox and print message summaries.
async fn run_mail(store: Arc<SecretStore>, config: &Config, args: MailArgs) -> Result<()> {
    let mut mail_config = config.mail.clone();
    if let Some(folder) = args.folder {
        mail_config.folder = folder;
    }
    if let Some(criteria) = args.criteria {
        mail_config.criteria = criteria;
    }

    let monitor = MailMonitor::new(store, &mail_config);
    let summaries = monitor.poll().await.context("inbox poll failed")?;
    if summaries.is_empty() {
        println!("no matching messages");
        return Ok(());
    }

    for summary in &summaries {
        println!(
            "{} {}",
            format!("#{}", summary.seq).dimmed(),
            summary.subject.bold()
        );
        println!("   {} {}", "from:".dimmed(), summary.sender);
        if !summary.preview.is_empty() {
            println!("   {}", summary.preview);
        }
    }
    Ok(())
}

/// Send a one-off webhook message.
async fn run_notify(store: Arc<SecretStore>, config: &Config, args: NotifyArgs) -> Result<()> {
    let mut at = AtTargets::from_config(&config.notify);
    if args.at_mobiles.is_some() {
        at.mobiles = notify::parse_targets(args.at_mobiles.as_deref());
    }
    if args.at_userids.is_some() {
        at.user_ids = notify::parse_targets(args.at_userids.as_deref());
    }
    if args.at_all {
        at.at_all = true;
    }

    let notifier = WebhookNotifier::new(store, at);
    let response = notifier
        .send(&args.message)
        .await
        .context("failed to send notification")?;
    println!(
        " {} webhook accepted (errcode {})",
        "✔".green().bold(),
        response.errcode
    );
    Ok(())
}

/// Inspect the credential store.
fn run_secrets(store: &SecretStore, action: SecretsAction) -> Result<()> {
    match action {
        SecretsAction::List => {
            println!("{}", store.list().context("failed to load credentials")?);
        }
        SecretsAction::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}

/// Print version and build information.
fn run_version() -> Result<()> {
    println!(
        "{} {}",
        "raincheck".bold(),
        constants::VERSION.green().bold()
    );
    println!("{}     {}", "target:".dimmed(), constants::TARGET);
    Ok(())
}
