use std::{env, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;
use waitlist_funnel::{
    db::profile::ops::SqliteProfileStore,
    init_tracing,
    service::{HttpWaitlistService, WaitlistService},
    ui::{ExternalActions, Notification, Notifier, Severity},
    DashboardView, FunnelController, Outcome, TaskId, TaskInput, CONFIG,
};

const USAGE: &str = "usage: funnel_cli [--ref <code>] <command>

commands:
  status                  task progress and waitlist size
  email <address> [name]  join the waitlist
  wallet <address>        link an EVM wallet
  twitter <handle>        verify the Twitter follow
  discord <handle>        verify the Discord join
  enter                   open the dashboard once every task is done
  dashboard [page]        referral standing and leaderboard page
  watch                   keep the leaderboard fresh until Ctrl-C";

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let marker = match notification.severity {
            Severity::Info => "ok",
            Severity::Warning => "!!",
            Severity::Error => "xx",
        };
        println!("[{}] {}: {}", marker, notification.title, notification.message);
    }
}

struct ConsoleActions;

impl ExternalActions for ConsoleActions {
    fn open_url(&self, url: &str) {
        println!("open {}", url);
    }

    fn navigate(&self, path: &str) {
        println!("-> {}", path);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let referral_code = take_flag(&mut args, "--ref")?;
    let Some(command) = args.first().cloned() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = CONFIG.clone();
    let api_url = config
        .api_url
        .clone()
        .ok_or_else(|| anyhow!("WAITLIST_API_URL is not set"))?;
    let service = Arc::new(HttpWaitlistService::new(&api_url)?);
    let store = Arc::new(
        SqliteProfileStore::open(&config.database_path)
            .with_context(|| format!("opening {}", config.database_path))?,
    );
    info!(api = %api_url, db = %config.database_path, "funnel ready");

    let controller = FunnelController::new(
        store,
        service,
        Arc::new(ConsoleNotifier),
        Arc::new(ConsoleActions),
        config,
        referral_code,
    );

    match command.as_str() {
        "status" => status(&controller).await,
        "email" => {
            let email = arg(&args, 1, "email address")?;
            let name = (args.len() > 2).then(|| args[2..].join(" "));
            submit(&controller, TaskInput::Email { email, name }).await
        }
        "wallet" | "address" => {
            let wallet_address = arg(&args, 1, "wallet address")?;
            submit(&controller, TaskInput::Wallet { wallet_address }).await
        }
        "twitter" | "x" => {
            controller.begin(TaskId::Twitter);
            let username = arg(&args, 1, "Twitter handle")?;
            submit(&controller, TaskInput::Twitter { username }).await
        }
        "discord" => {
            controller.begin(TaskId::Discord);
            let username = arg(&args, 1, "Discord handle")?;
            submit(&controller, TaskInput::Discord { username }).await
        }
        "enter" => {
            if !controller.enter() {
                bail!("tasks outstanding: {}", outstanding(&controller));
            }
            Ok(())
        }
        "dashboard" => {
            let page = match args.get(1) {
                Some(raw) => raw.parse().with_context(|| format!("bad page {}", raw))?,
                None => 1,
            };
            let dashboard = controller.dashboard();
            dashboard.refresh().await?;
            if !dashboard.set_page(page).await {
                bail!("page {} is out of range", page);
            }
            print_dashboard(&dashboard.view().await);
            Ok(())
        }
        "watch" => {
            let mut dashboard = controller.dashboard();
            dashboard.mount();
            let mut refreshed = dashboard
                .subscribe()
                .ok_or_else(|| anyhow!("leaderboard poller did not start"))?;
            loop {
                tokio::select! {
                    changed = refreshed.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        print_dashboard(&dashboard.view().await);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            dashboard.unmount();
            Ok(())
        }
        other => bail!("unknown command {}\n\n{}", other, USAGE),
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} needs a value", flag);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn arg(args: &[String], index: usize, what: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| anyhow!("missing {}", what))
}

fn outstanding<W: WaitlistService>(controller: &FunnelController<W>) -> String {
    controller
        .outstanding()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

async fn submit<W: WaitlistService>(
    controller: &FunnelController<W>,
    input: TaskInput,
) -> Result<()> {
    match controller.submit(input).await {
        Outcome::Completed | Outcome::Unverified => Ok(()),
        Outcome::Rejected(err) => bail!(err),
        Outcome::Failed(err) => Err(err.into()),
    }
}

async fn status<W: WaitlistService>(controller: &FunnelController<W>) -> Result<()> {
    let count = controller.refresh_count().await;
    println!("{} people on the waitlist", count);
    if let Some(email) = controller.engine().profile().and_then(|profile| profile.email) {
        let policy = controller.engine().policy();
        println!("signed up as {} ({:?} social checks)", email, policy);
    }
    for task in TaskId::ALL {
        println!("  {:<8} {:?}", task.to_string(), controller.engine().slot(task));
    }
    if controller.can_enter() {
        println!("all tasks done, run `funnel_cli enter`");
    }
    Ok(())
}

fn print_dashboard(view: &DashboardView) {
    println!("referral link: {}", view.referral_link);
    match view.rank {
        Some(rank) => println!("rank #{} with {} referrals", rank, view.referral_count),
        None => println!("not ranked yet"),
    }
    if let Some(joined) = &view.joined {
        println!("joined {}", joined);
    }
    match view.fetched_at {
        Some(at) => println!(
            "page {}/{} (updated {})",
            view.current_page,
            view.total_pages,
            at.format("%H:%M:%S")
        ),
        None => println!("page {}/{}", view.current_page, view.total_pages),
    }
    for row in &view.rows {
        let marker = if row.is_you { "*" } else { " " };
        println!(
            "{}{:>4}  {:<32} {:>5}",
            marker,
            row.rank,
            row.name.as_deref().unwrap_or(&row.email),
            row.referral_count
        );
    }
}
