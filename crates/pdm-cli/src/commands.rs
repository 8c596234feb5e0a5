use std::path::{Path, PathBuf};

use colored::Colorize;
use pdm_sdk::{
    CheckIn, ClientConfig, DiffStatus, Direction, LifecycleState, PdmClient, Track, TrackedFile,
    UserId, VersionNumber, PDM_DIR,
};
use serde::Serialize;
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let root = workspace_root(&cli);
    let format = cli.format;
    if let Command::Init(args) = &cli.command {
        return cmd_init(&root, cli.user.clone(), args);
    }

    let user = cli.user.as_deref().map(UserId::new).transpose()?;
    let client = PdmClient::open_as(&root, user)?;
    let result = match cli.command {
        Command::Init(_) => Ok(()),
        Command::Track(args) => cmd_track(&client, args, format).await,
        Command::Checkout(args) => cmd_checkout(&client, args, format).await,
        Command::Release(args) => cmd_release(&client, args, format).await,
        Command::Checkin(args) => cmd_checkin(&client, args, format).await,
        Command::Log(args) => cmd_log(&client, args, format).await,
        Command::Status(args) => cmd_status(&client, args, format).await,
        Command::Goto(args) => cmd_goto(&client, args, format).await,
        Command::State(args) => cmd_state(&client, args, format).await,
        Command::Meta(args) => cmd_meta(&client, args, format).await,
        Command::Verify(args) => cmd_verify(&client, args, format).await,
        Command::Locks => cmd_locks(&client, format).await,
    };
    client.flush_activity().await;
    result
}

pub fn workspace_root(cli: &Cli) -> PathBuf {
    cli.root.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Log level from the workspace config, if there is one.
pub fn configured_log_level(root: &Path) -> Option<tracing::Level> {
    ClientConfig::load(&ClientConfig::path_in(root))
        .ok()
        .and_then(|config| config.log_level.parse().ok())
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce()) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(),
    }
    Ok(())
}

fn cmd_init(root: &Path, user: Option<String>, args: &InitArgs) -> anyhow::Result<()> {
    std::fs::create_dir_all(root)?;
    let config = ClientConfig {
        user,
        state_dir: args.state_dir.clone().unwrap_or_else(|| PathBuf::from(PDM_DIR)),
        record_activity: !args.no_activity,
        ..ClientConfig::default()
    };
    let path = PdmClient::init_workspace(root, &config)?;
    println!("{} Initialized PDM workspace in {}", "✓".green().bold(), root.display().to_string().bold());
    match &config.user {
        Some(user) => println!("  User: {}", user.cyan()),
        None => println!("  Set {} in {}", "user".yellow(), path.display()),
    }
    Ok(())
}

async fn cmd_track(client: &PdmClient, args: TrackArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut options = Track::default();
    if let Some(message) = args.message {
        options = options.with_comment(message);
    }
    if let Some(revision) = args.revision {
        options = options.with_revision(revision);
    }
    if let Some(title) = args.title {
        options = options.with_title(title);
    }
    if let Some(part_number) = args.part_number {
        options = options.with_part_number(part_number);
    }
    let file = client.track(&args.path, options).await?;
    emit(format, &file, || {
        println!(
            "{} Tracking {} as {} ({})",
            "✓".green().bold(),
            file.relative_path.bold(),
            file.head_version.to_string().yellow(),
            file.id.short().dimmed()
        );
    })
}

async fn cmd_checkout(client: &PdmClient, args: FileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = client.resolve(&args.file).await?;
    let lock = client.checkout(&file.id).await?;
    emit(format, &lock, || {
        println!("{} Checked out {}", "✓".green().bold(), file.relative_path.bold());
    })
}

async fn cmd_release(client: &PdmClient, args: FileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = client.resolve(&args.file).await?;
    client.release(&file.id).await?;
    emit(format, &json!({ "file_id": file.id, "released": true }), || {
        println!("{} Released {}", "✓".green().bold(), file.relative_path.bold());
    })
}

async fn cmd_checkin(client: &PdmClient, args: CheckinArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = client.resolve(&args.file).await?;
    let mut request = CheckIn::new(args.message);
    if let Some(revision) = args.revision {
        request = request.with_revision(revision);
    }
    if args.keep {
        request = request.keep_lock();
    }
    let result = client.check_in(&file.id, request).await?;
    emit(format, &result, || {
        println!(
            "{} Checked in {} as {}",
            "✓".green().bold(),
            file.relative_path.bold(),
            result.record.version.to_string().yellow()
        );
        if result.based_on != file.head_version {
            println!("  Based on {}", result.based_on.to_string().cyan());
        }
        if result.lock_released {
            println!("  Lock released");
        }
    })
}

async fn cmd_log(client: &PdmClient, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = client.resolve(&args.file).await?;
    let versions = client.list_versions(&file.id).await?;
    let active = client
        .get_local_state(&file.id)
        .await?
        .active_version(file.head_version);
    let shown: Vec<_> = versions.into_iter().take(args.limit).collect();
    emit(format, &shown, || {
        println!("{} ({})", file.relative_path.bold(), file.lifecycle_state.to_string().cyan());
        for record in &shown {
            let marker = if record.version == active { "*".green().bold() } else { " ".normal() };
            let head = if record.version == file.head_version { " (head)".green().to_string() } else { String::new() };
            println!(
                "{} {}{}  {}  {}  rev {}",
                marker,
                record.version.to_string().yellow().bold(),
                head,
                record.created_at.format("%Y-%m-%d %H:%M"),
                record.author,
                record.revision
            );
            println!("    {}  {}", record.content_hash.short_hex().dimmed(), record.comment);
        }
    })
}

async fn cmd_status(client: &PdmClient, args: StatusArgs, format: OutputFormat) -> anyhow::Result<()> {
    if args.refresh {
        client.refresh_all().await?;
    }
    let rows = client.status().await?;
    emit(format, &rows, || {
        if rows.is_empty() {
            println!("No tracked files.");
            return;
        }
        for row in &rows {
            let status = match row.diff_status {
                DiffStatus::Synced => "synced".green(),
                DiffStatus::Modified => "modified".red(),
                DiffStatus::Unknown => "unknown".yellow(),
            };
            let position = if row.is_behind_head() {
                format!("{} of {}", row.active_version, row.file.head_version).yellow()
            } else {
                row.active_version.to_string().normal()
            };
            let lock = match &row.lock {
                Some(lock) if lock.is_held_by(client.user()) => "checked out".cyan().to_string(),
                Some(lock) => format!("locked by {}", lock.holder).red().to_string(),
                None => String::new(),
            };
            println!("  {:<40} {:<10} {:<9} {}", row.file.relative_path, position, status, lock);
        }
    })
}

async fn cmd_goto(client: &PdmClient, args: GotoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = client.resolve(&args.file).await?;
    let target: VersionNumber = args.version.parse()?;
    let outcome = client.rollback_or_roll_forward(&file.id, target).await?;
    emit(format, &outcome, || {
        if !outcome.changed {
            println!("{} Already at {}", "✓".green().bold(), outcome.to_version.to_string().yellow());
            return;
        }
        let verb = match outcome.direction {
            Direction::Rollback => "Rolled back",
            Direction::RollForward => "Rolled forward",
            Direction::Reapply => "Restored",
        };
        println!(
            "{} {} {} {} → {} (head {})",
            "✓".green().bold(),
            verb,
            file.relative_path.bold(),
            outcome.from_version,
            outcome.to_version.to_string().yellow(),
            outcome.head_version
        );
    })
}

async fn cmd_state(client: &PdmClient, args: StateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = client.resolve(&args.file).await?;
    let state: LifecycleState = args.state.parse()?;
    let updated = client.set_lifecycle_state(&file.id, state).await?;
    emit(format, &updated, || print_file_line("State", &updated, &updated.lifecycle_state.to_string()))
}

async fn cmd_meta(client: &PdmClient, args: MetaArgs, format: OutputFormat) -> anyhow::Result<()> {
    let file = client.resolve(&args.file).await?;
    let mut metadata = file.metadata.clone();
    if let Some(title) = args.title {
        metadata.title = Some(title);
    }
    if let Some(part_number) = args.part_number {
        metadata.part_number = Some(part_number);
    }
    if let Some(description) = args.description {
        metadata.description = Some(description);
    }
    let updated = client.update_metadata(&file.id, metadata).await?;
    emit(format, &updated, || {
        let title = updated.metadata.title.clone().unwrap_or_default();
        print_file_line("Metadata", &updated, &title);
    })
}

fn print_file_line(what: &str, file: &TrackedFile, value: &str) {
    println!("{} {} of {}: {}", "✓".green().bold(), what, file.relative_path.bold(), value.cyan());
}

async fn cmd_verify(client: &PdmClient, args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let files = match &args.file {
        Some(query) => vec![client.resolve(query).await?],
        None => client.list_files().await?,
    };
    let mut reports = Vec::with_capacity(files.len());
    for file in &files {
        reports.push((file, client.verify_history(&file.id).await?));
    }
    let invalid = reports.iter().filter(|(_, r)| !r.is_valid()).count();

    let summary: Vec<_> = reports
        .iter()
        .map(|(file, report)| {
            json!({
                "file_id": file.id,
                "path": file.relative_path,
                "versions": report.record_count,
                "valid": report.is_valid(),
                "violations": report.violations.iter().map(|v| v.description.clone()).collect::<Vec<_>>(),
            })
        })
        .collect();
    emit(format, &summary, || {
        for (file, report) in &reports {
            if report.is_valid() {
                println!("{} {} ({} versions)", "✓".green(), file.relative_path, report.record_count);
            } else {
                println!("{} {}", "✗".red().bold(), file.relative_path.bold());
                for violation in &report.violations {
                    println!("    {:?} at {}: {}", violation.kind, violation.version, violation.description);
                }
            }
        }
    })?;

    if invalid > 0 {
        anyhow::bail!("{invalid} file(s) failed history validation");
    }
    Ok(())
}

async fn cmd_locks(client: &PdmClient, format: OutputFormat) -> anyhow::Result<()> {
    let locks = client.locks().await?;
    let mut rows = Vec::with_capacity(locks.len());
    for lock in &locks {
        let path = client
            .tracked_file(&lock.file_id)
            .await
            .map(|f| f.relative_path)
            .unwrap_or_else(|_| lock.file_id.to_string());
        rows.push((path, lock));
    }
    emit(format, &locks, || {
        if rows.is_empty() {
            println!("No checkout locks.");
        }
        for (path, lock) in &rows {
            println!(
                "  {:<40} {}  since {}",
                path,
                lock.holder.to_string().cyan(),
                lock.acquired_at.format("%Y-%m-%d %H:%M")
            );
        }
    })
}
