//! Invite commands: record and list pending caregiver invitations.

use std::io::Write;

use anyhow::{Context, Result};
use babysteps_core::Role;
use babysteps_db::Database;
use chrono::{DateTime, TimeZone, Utc};

use super::util::format_local;

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    email: &str,
    role: Role,
    now: DateTime<Utc>,
) -> Result<()> {
    let invite = db
        .invite_caregiver_at(email, role, now)
        .context("failed to record invite")?;
    writeln!(
        writer,
        "Invited {} as {} ({}) [{}]",
        invite.email, invite.role, invite.status, invite.id
    )?;
    Ok(())
}

pub fn list<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    json: bool,
    tz: &Tz,
) -> Result<()> {
    let invites = db.query_invites()?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&invites)?)?;
        return Ok(());
    }
    if invites.is_empty() {
        writeln!(writer, "No invites.")?;
        return Ok(());
    }
    for invite in invites {
        writeln!(
            writer,
            "- {} ({}, {}) invited {}",
            invite.email,
            invite.role,
            invite.status,
            format_local(invite.created_at, tz)
        )?;
    }
    Ok(())
}
