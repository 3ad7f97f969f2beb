use anyhow::{anyhow, bail, Context, Result};
use colored::{ColoredString, Colorize};
use serde_json::json;
use std::sync::Arc;

use crate::cli::{AuthCommands, NotifyCommands, PushCommands, ServerCommands};
use parkops_client::{ApiClient, AuthApi, HttpGateway};
use parkops_core::models::ChecklistTask;
use parkops_core::proto::{Mission, MissionId, MissionStatus, PushData};
use parkops_core::{
    AppendOutcome, Config, CredentialVault, GatewayError, IntakeOutcome, Locale, MissionFeed,
    MissionView, NotificationEvent, Session, SqliteStore, SyncError, Synchronizer, TaskChecklist,
    ViewOrigin,
};

type Store = Arc<SqliteStore>;
type MissionSync = Synchronizer<HttpGateway, Store>;

/// Everything a command needs: configuration, the on-device database and
/// the credentials kept in it.
pub struct App {
    config: Config,
    store: Store,
    vault: CredentialVault<Store>,
}

impl App {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let path = config.database_path()?;
        let store = Arc::new(
            SqliteStore::open(&path)
                .with_context(|| format!("Failed to open database: {}", path.display()))?,
        );
        tracing::debug!(database = %path.display(), "loaded configuration");
        Ok(Self {
            vault: CredentialVault::new(store.clone()),
            config,
            store,
        })
    }

    fn server_url(&self) -> Result<String> {
        self.vault
            .server_url()
            .or_else(|| self.config.server.url.clone())
            .context("No server configured. Run 'parkops server set <url>'")
    }

    fn locale(&self) -> Locale {
        self.vault.stored_locale().unwrap_or(self.config.ui.locale)
    }

    fn client(&self) -> Result<ApiClient> {
        let url = self.server_url()?;
        Ok(ApiClient::new(&url, self.config.timeout())?.with_locale(self.locale()))
    }

    fn session(&self) -> Result<Session> {
        self.vault
            .session()
            .context("Not logged in. Run 'parkops auth login <username>'")
    }

    fn synchronizer(&self) -> Result<MissionSync> {
        let session = self.session()?;
        let gateway = HttpGateway::new(self.client()?, &session);
        Ok(Synchronizer::new(
            &session,
            gateway,
            self.store.clone(),
            self.config.sync_settings(),
        ))
    }
}

/// Point at `auth login` when the backend no longer accepts the stored token.
fn sync_failure(err: SyncError) -> anyhow::Error {
    match &err {
        SyncError::Gateway(GatewayError::Unauthenticated(_)) => {
            anyhow!("{err}. Run 'parkops auth login <username>' again")
        }
        _ => err.into(),
    }
}

fn warn_not_saved(what: &str, err: &dyn std::fmt::Display, json: bool) {
    tracing::warn!(error = %err, "{what} not saved on this device");
    if !json {
        println!("{}", format!("Warning: {what} not saved on this device: {err}").yellow());
    }
}

fn status_label(status: MissionStatus) -> ColoredString {
    match status {
        MissionStatus::Unopened => "new".yellow().bold(),
        MissionStatus::InProgress => "in progress".cyan(),
        MissionStatus::Completed => "done".green(),
    }
}

fn check(done: bool) -> ColoredString {
    if done {
        "[x]".green()
    } else {
        "[ ]".normal()
    }
}

fn print_mission_line(mission: &Mission) {
    let payload = &mission.payload;
    println!(
        "#{} {} {} {}",
        mission.mission_id.as_str().bold(),
        status_label(mission.status),
        payload.machine_name.as_deref().unwrap_or("(unnamed machine)"),
        payload.date.as_deref().unwrap_or("").dimmed()
    );
}

fn print_mission_details(mission: &Mission) {
    let payload = &mission.payload;
    println!(
        "{} {}",
        format!("Mission {}", mission.mission_id).cyan().bold(),
        status_label(mission.status)
    );
    if let Some(machine) = &payload.machine_name {
        println!("  Machine: {machine}");
    }
    if let Some(cashier) = &payload.cashier {
        println!("  Cashier: {cashier}");
    }
    if let Some(date) = &payload.date {
        println!("  Date: {date}");
    }
    if let Some(qr) = &payload.qr_code {
        println!("  QR code: {}", qr.dimmed());
    }

    if let Some(collect) = &payload.collect {
        println!("  Collect:");
        if let Some(notes) = &collect.notes {
            println!("    {} notes {:.2}", check(notes.completed), notes.amount);
        }
        if let Some(coins) = &collect.coins {
            println!("    {} coins {:.2}", check(coins.completed), coins.amount);
        }
    }
    if let Some(refill) = &payload.refill {
        println!("  Refill:");
        for (label, task) in [("notes", &refill.notes), ("coins", &refill.coins)] {
            let Some(task) = task else { continue };
            println!("    {} {label} {:.2}", check(task.completed), task.amount);
            if let Some(denominations) = task.denominations() {
                for (value, count) in denominations {
                    println!("        {count} x {value}");
                }
            }
        }
    }
    if !payload.maintenance.is_empty() {
        println!("  Maintenance:");
        for (index, task) in payload.maintenance.iter().enumerate() {
            println!("    {index}. {} {}", check(task.is_completed()), task.description());
        }
    }
    if let Some(opened) = mission.opened_at {
        println!("  Opened: {}", opened.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"));
    }
    if let Some(completed) = mission.completed_at {
        println!(
            "  Completed: {}",
            completed.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        );
    }
}

fn print_feed(feed: &MissionFeed, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            json!({
                "missions": feed.missions,
                "pagination": feed.pagination,
            })
        );
        return Ok(());
    }

    if feed.is_empty() {
        println!("No missions assigned");
        return Ok(());
    }
    for mission in &feed.missions {
        print_mission_line(mission);
    }
    println!(
        "{}",
        format!(
            "page {}/{}{}",
            feed.current_page(),
            feed.total_pages(),
            if feed.has_more_pages() { ", more available (use --pages)" } else { "" }
        )
        .dimmed()
    );
    Ok(())
}

pub async fn server_command(cmd: &ServerCommands, json: bool) -> Result<()> {
    let app = App::load()?;
    let timeout = app.config.health_timeout();
    match cmd {
        ServerCommands::Set { url, skip_check } => {
            let healthy = AuthApi::validate_server_url(url, timeout).await;
            if !healthy && !skip_check {
                bail!("Server at {} did not pass the health check", url.trim());
            }
            let stored = app.vault.set_server_url(url)?;
            if json {
                println!("{}", json!({"server": stored, "healthy": healthy}));
            } else {
                println!("Server set to {}", stored.cyan());
                if !healthy {
                    println!("{}", "Warning: health check failed".yellow());
                }
            }
        }
        ServerCommands::Check => {
            let url = app.server_url()?;
            let healthy = AuthApi::validate_server_url(&url, timeout).await;
            if json {
                println!("{}", json!({"server": url, "healthy": healthy}));
            } else if healthy {
                println!("{} is {}", url.cyan(), "healthy".green());
            } else {
                println!("{} is {}", url.cyan(), "unreachable".red());
            }
        }
    }
    Ok(())
}

pub async fn auth_command(cmd: &AuthCommands, json: bool) -> Result<()> {
    let app = App::load()?;
    match cmd {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(password) => password.clone(),
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .interact()
                    .context("Failed to read password")?,
            };
            let auth = AuthApi::new(app.client()?);
            let session = auth.login(username.trim(), &password).await?;
            app.vault.save_session(&session)?;
            tracing::info!(operator = %session.operator.id, "logged in");
            if json {
                println!("{}", json!({"user": session.operator}));
            } else {
                println!("Logged in as {}", session.operator.username.cyan());
            }
        }
        AuthCommands::Logout => {
            let previous = app.vault.clear_session()?;
            tracing::info!(had_session = previous.is_some(), "logged out");
            if json {
                println!("{}", json!({"logged_out": previous.is_some()}));
            } else if let Some(session) = previous {
                println!("Logged out {}", session.operator.username.cyan());
            } else {
                println!("Not logged in");
            }
        }
        AuthCommands::Status => {
            let session = app.vault.session();
            let server = app.server_url().ok();
            if json {
                println!(
                    "{}",
                    json!({
                        "server": server,
                        "user": session.as_ref().map(|s| &s.operator),
                        "language": app.locale().as_str(),
                    })
                );
            } else {
                match &server {
                    Some(url) => println!("  Server: {}", url.cyan()),
                    None => println!("  Server: {}", "Not set".red()),
                }
                match &session {
                    Some(session) => println!(
                        "  Operator: {} (id {})",
                        session.operator.username.green(),
                        session.operator.id
                    ),
                    None => println!("  Operator: {}", "Not logged in".red()),
                }
                println!("  Language: {}", app.locale());
            }
        }
    }
    Ok(())
}

pub fn language(locale: Option<&str>, json: bool) -> Result<()> {
    let app = App::load()?;
    let locale = match locale {
        Some(raw) => {
            let locale: Locale = raw.parse().map_err(anyhow::Error::msg)?;
            app.vault.set_locale(locale)?;
            locale
        }
        None => app.locale(),
    };
    if json {
        println!("{}", json!({"language": locale.as_str()}));
    } else {
        println!("Language: {}", locale.as_str().cyan());
    }
    Ok(())
}

pub async fn list_missions(pages: u32, json: bool) -> Result<()> {
    let sync = App::load()?.synchronizer()?;
    match sync.refresh().await {
        Ok(_) => {}
        Err(SyncError::Storage(err)) => warn_not_saved("missions", &err, json),
        Err(err) => return Err(sync_failure(err)),
    }
    for _ in 1..pages {
        match sync.load_more().await.map_err(sync_failure)? {
            AppendOutcome::Appended { .. } => {}
            AppendOutcome::Exhausted | AppendOutcome::InFlight => break,
        }
    }
    print_feed(&sync.feed(), json)
}

pub async fn show_mission(id: &str, json: bool) -> Result<()> {
    let sync = App::load()?.synchronizer()?;
    let id = MissionId::from(id.trim());
    match sync.view_mission(&id).await.map_err(sync_failure)? {
        MissionView::Found {
            mission,
            origin,
            open_ack,
        } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&mission)?);
                return Ok(());
            }
            print_mission_details(&mission);
            if let Some(Err(err)) = open_ack {
                println!("{}", format!("Backend not told about opening: {err}").yellow());
            }
            if origin == ViewOrigin::Cache {
                println!("{}", "Offline: showing the saved copy".yellow());
            }
            Ok(())
        }
        MissionView::Missing => bail!("Mission {id} not found"),
    }
}

pub async fn open_mission(id: &str, json: bool) -> Result<()> {
    let sync = App::load()?.synchronizer()?;
    let outcome = sync
        .open_mission(&MissionId::from(id.trim()))
        .await
        .map_err(sync_failure)?;
    if let Err(err) = &outcome.saved {
        warn_not_saved("opened status", err, json);
    }
    if json {
        println!(
            "{}",
            json!({
                "mission": outcome.mission,
                "saved": outcome.saved.is_ok(),
                "acknowledged": outcome.remote.is_ok(),
            })
        );
    } else {
        println!(
            "Mission {} is {}",
            outcome.mission.mission_id,
            status_label(outcome.mission.status)
        );
        if let Err(err) = outcome.remote {
            println!("{}", format!("Backend not told about opening: {err}").yellow());
        }
    }
    Ok(())
}

pub struct SubmitFlags<'a> {
    pub collect_notes: bool,
    pub collect_coins: bool,
    pub refill_notes: bool,
    pub refill_coins: bool,
    pub maintenance: &'a [usize],
}

pub async fn submit_mission(id: &str, flags: SubmitFlags<'_>, json: bool) -> Result<()> {
    let sync = App::load()?.synchronizer()?;
    let id = MissionId::from(id.trim());
    let mission = sync
        .store()
        .read_one(sync.partition(), &id)?
        .with_context(|| format!("Mission {id} is not saved on this device. Run 'parkops ls' first"))?;

    let mut checklist = TaskChecklist::from_payload(&mission.payload);
    let ticked = [
        (ChecklistTask::CollectNotes, flags.collect_notes),
        (ChecklistTask::CollectCoins, flags.collect_coins),
        (ChecklistTask::RefillNotes, flags.refill_notes),
        (ChecklistTask::RefillCoins, flags.refill_coins),
    ];
    for (task, done) in ticked {
        if done {
            checklist.set(task, true);
        }
    }
    for &index in flags.maintenance {
        if !checklist.set(ChecklistTask::Maintenance(index), true) {
            bail!("Mission {id} has no maintenance task {index}");
        }
    }

    let submitted = sync.submit(&id, &checklist).await.map_err(sync_failure)?;
    if let Err(err) = &submitted.saved {
        warn_not_saved("completed mission", err, json);
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&submitted.mission)?);
    } else {
        println!(
            "Mission {} {} at {}",
            submitted.mission_id,
            status_label(MissionStatus::Completed),
            submitted
                .completed_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn notify(cmd: &NotifyCommands, json: bool) -> Result<()> {
    let sync = App::load()?.synchronizer()?;
    let (raw, tapped) = match cmd {
        NotifyCommands::New { data } => (data, false),
        NotifyCommands::Tap { data } => (data, true),
    };
    let data: PushData =
        serde_json::from_str(raw).context("Push data must be a JSON object with an \"id\"")?;
    let event = NotificationEvent::from_push_data(data, tapped)?;
    tracing::debug!(mission = %event.mission_id(), tapped, "delivering notification");

    match sync.handle_notification(event).await? {
        IntakeOutcome::Stored(mission) => {
            if json {
                println!("{}", json!({"stored": mission}));
            } else {
                println!("New mission saved:");
                print_mission_line(&mission);
            }
        }
        IntakeOutcome::Duplicate => {
            if json {
                println!("{}", json!({"stored": null, "duplicate": true}));
            } else {
                println!("Mission already saved, nothing to do");
            }
        }
        IntakeOutcome::Dropped { reason } => {
            bail!("Notification ignored: unreadable mission payload ({reason})");
        }
        IntakeOutcome::ViewRequested(id) => {
            drop(sync);
            return show_mission(id.as_str(), json).await;
        }
    }
    Ok(())
}

pub async fn push_command(cmd: &PushCommands, json: bool) -> Result<()> {
    let app = App::load()?;
    let session = app.session()?;
    let auth = AuthApi::new(app.client()?);
    let (action, token) = match cmd {
        PushCommands::Register { token } => {
            auth.register_push_token(&session, token).await?;
            ("registered", token)
        }
        PushCommands::Remove { token } => {
            auth.remove_push_token(&session, token).await?;
            ("removed", token)
        }
    };
    if json {
        println!("{}", json!({"push_token": token, "status": action}));
    } else {
        println!("Push token {action}");
    }
    Ok(())
}

pub fn clear_missions(json: bool) -> Result<()> {
    let sync = App::load()?.synchronizer()?;
    sync.clear()?;
    if json {
        println!("{}", json!({"cleared": sync.partition().as_str()}));
    } else {
        println!("Cached missions cleared");
    }
    Ok(())
}
