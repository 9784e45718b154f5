//! Profile commands: show and update the baby profile.

use std::io::Write;

use anyhow::{Context, Result, bail};
use babysteps_core::{BabyProfile, ProfileUpdate};
use babysteps_db::Database;
use chrono::NaiveDate;
use clap::Subcommand;

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// Show the profile.
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Update one or more profile fields.
    Set {
        #[arg(long)]
        name: Option<String>,

        /// Birthday (YYYY-MM-DD).
        #[arg(long)]
        birthday: Option<NaiveDate>,

        /// IANA time zone, e.g. America/New_York.
        #[arg(long)]
        timezone: Option<String>,
    },
}

pub fn show<W: Write>(writer: &mut W, db: &Database, json: bool, today: NaiveDate) -> Result<()> {
    let profile = db.load_profile().context("failed to load profile")?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&profile)?)?;
        return Ok(());
    }
    write_profile(writer, &profile, today)
}

pub fn set<W: Write>(
    writer: &mut W,
    db: &mut Database,
    update: ProfileUpdate,
    today: NaiveDate,
) -> Result<()> {
    if update.is_empty() {
        bail!("nothing to update: pass --name, --birthday or --timezone");
    }
    if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        bail!("name cannot be empty");
    }
    let profile = db.update_profile(update)?;
    writeln!(writer, "Profile updated")?;
    write_profile(writer, &profile, today)
}

fn write_profile<W: Write>(writer: &mut W, profile: &BabyProfile, today: NaiveDate) -> Result<()> {
    writeln!(writer, "Name: {}", profile.name)?;
    match (profile.birthday, profile.age_days(today)) {
        (Some(birthday), Some(days)) => writeln!(writer, "Birthday: {birthday} ({days} days old)")?,
        (Some(birthday), None) => writeln!(writer, "Birthday: {birthday}")?,
        (None, _) => writeln!(writer, "Birthday: not set")?,
    }
    writeln!(writer, "Timezone: {}", profile.timezone)?;
    writeln!(writer, "Id: {}", profile.id)?;
    Ok(())
}
