use anyhow::{Result, anyhow, bail};
use chrono::Local;
use std::str::FromStr;

use hijra::config::AppConfig;
use hijra::db::LocalStore;
use hijra::models::{DayRecord, PrayerSlot, PrayerStatus};
use hijra::stats::{MAX_LEVEL, completion_level, daily_summaries};
use hijra::sync::{DayTracker, META_LAST_SYNC, SyncReport, SyncService, WriteState};
use hijra::utils::format::{completion_glyph, format_time_local, parse_date_arg, progress_bar, status_glyph};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

fn status_color(status: PrayerStatus) -> &'static str {
    match status {
        PrayerStatus::OnTime => GREEN,
        PrayerStatus::Late => AMBER,
        PrayerStatus::Missed => RED,
        PrayerStatus::NoEntry => DIM,
    }
}

/// `--user` wins over the configured id.
pub fn resolve_user(flag: Option<&str>, config: &AppConfig) -> Result<String> {
    let user = flag.unwrap_or(&config.user.id).trim();
    if user.is_empty() {
        bail!("No user id. Pass --user ID or save one with `hijra config --user ID`");
    }
    Ok(user.to_string())
}

// ─── Show ────────────────────────────────────────────────────────────────────

pub async fn handle_show(service: &SyncService, user: &str, date: Option<&str>) -> Result<()> {
    let date = parse_date_arg(date)?;
    let record = service.resolve_day(user, date).await;
    print_day(&record, service.connectivity().is_online());
    Ok(())
}

fn print_day(record: &DayRecord, online: bool) {
    println!();
    println_colored!(GOLD, "  Prayers — {} ({})", record.date, record.user_id);
    println!();
    for entry in &record.entries {
        let time = entry.timestamp.as_ref().map(format_time_local).unwrap_or_default();
        println_colored!(
            status_color(entry.status),
            "  {} {:<8}  {:<15} {}",
            status_glyph(entry.status),
            entry.slot.display_name(),
            entry.status.label(),
            time
        );
    }
    println!();
    println!(
        "  {}/5  {}",
        record.completed_count(),
        progress_bar(record.completed_count(), 5, 10)
    );
    if record.synced {
        println_colored!(DIM, "  synced");
    } else if online {
        println_colored!(AMBER, "  sync pending");
    } else {
        println_colored!(AMBER, "  offline — saved on this device");
    }
    println!();
}

// ─── Mark prayer ─────────────────────────────────────────────────────────────

pub async fn handle_mark(
    tracker: &mut DayTracker,
    user: &str,
    prayer: &str,
    date: Option<&str>,
    times: u8,
) -> Result<()> {
    let slot = PrayerSlot::from_str(prayer)
        .map_err(|_| anyhow!("Unknown prayer '{}'. Use: fajr, dhuhr, asr, maghrib, isha", prayer))?;
    let date = parse_date_arg(date)?;

    for _ in 0..times {
        let Some(write) = tracker.update_status(user, date, slot.index()).await else {
            bail!("Could not update {} for {}", slot, date);
        };
        if write.state() == WriteState::RolledBack {
            println_colored!(RED, "  ✗ Could not save {} — kept {}", slot, write.previous.status.label());
            return Ok(());
        }
    }

    if let Some(day) = tracker.day(user, date) {
        let entry = day.entry(slot);
        println_colored!(
            status_color(entry.status),
            "  {} {} → {}",
            status_glyph(entry.status),
            slot.display_name(),
            entry.status.label()
        );
    }
    Ok(())
}

// ─── Sync ────────────────────────────────────────────────────────────────────

pub async fn handle_sync(service: &SyncService) -> Result<()> {
    let report = service.sync_all().await;
    print_report(&report);
    Ok(())
}

pub fn print_report(report: &SyncReport) {
    if report.offline {
        println_colored!(AMBER, "  Offline — {} days synced before stopping", report.days_synced);
    } else if report.days_attempted == 0 {
        println_colored!(GREEN, "  ✓ Nothing to sync");
    } else if report.is_clean() {
        println_colored!(
            GREEN,
            "  ✓ Synced {} days ({} prayers)",
            report.days_synced,
            report.slots_pushed
        );
    } else {
        println_colored!(
            AMBER,
            "  Synced {}/{} days — {} prayers failed and will be retried",
            report.days_synced,
            report.days_attempted,
            report.slots_failed
        );
    }
}

pub fn handle_pending(local: &LocalStore) -> Result<()> {
    let pending = local.get_unsynced()?;
    println!();
    if pending.is_empty() {
        println_colored!(GREEN, "  ✓ Everything is synced");
    } else {
        println_colored!(AMBER, "  Waiting to sync ({} days)", pending.len());
        println!();
        for record in &pending {
            let glyphs: String = record.entries.iter().map(|e| status_glyph(e.status)).collect();
            println!("  {}  {:<12} {}", record.date, record.user_id, glyphs);
        }
    }
    if let Some(last) = local.get_meta(META_LAST_SYNC)? {
        println!();
        println_colored!(DIM, "  Last sync: {}", last);
    }
    println!();
    Ok(())
}

// ─── Stats ───────────────────────────────────────────────────────────────────

pub fn handle_stats(service: &SyncService, user: &str, config: &AppConfig) -> Result<()> {
    let today = Local::now().date_naive();
    let stats = service.prayer_stats(user, today, config.sync.history_days);

    println!();
    println_colored!(GOLD, "  Statistics ({})", user);
    println!();
    println_colored!(
        BOLD,
        "  Streak:      {} days current  |  {} days best",
        stats.current_streak,
        stats.longest_streak
    );
    println!("  Today:       {}/5", stats.completed_today);
    println!("  This week:   {} prayers", stats.total_completed_this_week);
    println!();
    for (slot, slot_stats) in &stats.prayer_stats {
        println!(
            "  {:<8}  {}  {}/{}  streak {}",
            slot.display_name(),
            progress_bar(slot_stats.completed, slot_stats.total, 7),
            slot_stats.completed,
            slot_stats.total,
            slot_stats.streak
        );
    }
    println!();
    Ok(())
}

pub fn handle_heatmap(service: &SyncService, user: &str, days: usize) -> Result<()> {
    let today = Local::now().date_naive();
    let grid = daily_summaries(&service.recent_days(user, today, days));

    println!();
    println_colored!(DIM, "  Last {} days  (● = 5/5, ◕ = 4, ◑ = 2-3, ◔ = 1, ○ = 0/5)", days);
    println!();
    print!("  ");
    for stat in &grid {
        let level = completion_level(stat.prayers_done);
        let color = match level {
            0 => DIM,
            MAX_LEVEL => GREEN,
            _ => AMBER,
        };
        print!("{}{}\x1b[0m ", color, completion_glyph(level));
    }
    println!();
    println!();
    for stat in &grid {
        let cells: String = stat.statuses.iter().map(|s| status_glyph(*s)).collect();
        println!("  {}  {}  {}/5", stat.date, cells, stat.prayers_done);
    }
    println!();
    Ok(())
}

// ─── Config ──────────────────────────────────────────────────────────────────

pub fn handle_config(config: &mut AppConfig, user: Option<String>, online: Option<bool>) -> Result<()> {
    if user.is_none() && online.is_none() {
        println!("  Config file: {}", AppConfig::config_path()?.display());
        println!("  User:        {}", if config.user.id.is_empty() { "(none)" } else { config.user.id.as_str() });
        println!("  Online:      {}", config.sync.online);
        println!("  Policy:      {:?}", config.sync.policy);
        return Ok(());
    }
    if let Some(user) = user {
        config.user.id = user.trim().to_string();
    }
    if let Some(online) = online {
        config.sync.online = online;
    }
    config.save()?;
    println_colored!(GREEN, "  ✓ Saved {}", AppConfig::config_path()?.display());
    Ok(())
}
