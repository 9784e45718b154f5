//! Quick command: one-word tap actions read from stdin.
//!
//! Volume taps (`bottle`, `food`, `nursing`, `pumping`) accumulate until the
//! quick window passes without another tap of the same action. Other actions
//! are logged straight away.

use std::io::{BufRead, BufReader, Read, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use anyhow::Result;
use babysteps_core::{
    DiaperType, EventKind, NewEvent, QUICK_WINDOW, Session, SessionToken, TimerMetadata,
    TimerType, VolumeAccumulator, VolumeAction,
};
use babysteps_db::Database;
use chrono::{Duration, Utc};

use super::log::report_logged;

/// Tap actions that do not accumulate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InstantAction {
    Diaper(DiaperType),
    ToggleSleep,
    Misc(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tap {
    Volume(VolumeAction),
    Instant(InstantAction),
}

fn parse_tap(line: &str) -> Option<Tap> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let word = word.to_lowercase();
    if let Ok(action) = word.parse::<VolumeAction>() {
        return Some(Tap::Volume(action));
    }
    let instant = match word.as_str() {
        "wet" => InstantAction::Diaper(DiaperType::Wet),
        "dirty" => InstantAction::Diaper(DiaperType::Dirty),
        "sleep" => InstantAction::ToggleSleep,
        "misc" if !rest.trim().is_empty() => InstantAction::Misc(rest.trim().to_string()),
        _ => return None,
    };
    Some(Tap::Instant(instant))
}

/// Reads tap lines from `input` until end of input, logging as it goes.
pub fn run<R, W>(input: R, writer: &mut W, db: &mut Database, session: &Session) -> Result<()>
where
    R: Read + Send + 'static,
    W: Write,
{
    run_with_window(input, writer, db, session, QUICK_WINDOW)
}

/// Like [`run`], committing volume sessions after `window` without a tap.
pub fn run_with_window<R, W>(
    input: R,
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    window: Duration,
) -> Result<()>
where
    R: Read + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::channel::<String>();
    let reader = thread::spawn(move || -> std::io::Result<()> {
        for line in BufReader::new(input).lines() {
            if tx.send(line?).is_err() {
                break;
            }
        }
        Ok(())
    });

    let mut accumulator = VolumeAccumulator::with_window(window);
    loop {
        let received = match accumulator.pending() {
            Some((token, deadline)) => {
                let wait = (deadline - Utc::now()).to_std().unwrap_or_default();
                match rx.recv_timeout(wait) {
                    Ok(line) => Some(line),
                    Err(RecvTimeoutError::Timeout) => {
                        expire(writer, db, session, &mut accumulator, token)?;
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => None,
                }
            }
            None => rx.recv().ok(),
        };

        let Some(line) = received else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_tap(&line) {
            Some(Tap::Volume(action)) => {
                let outcome = accumulator.tap(action, Utc::now());
                if let Some(finished) = outcome.finalized {
                    log(writer, db, session, finished)?;
                }
                writeln!(
                    writer,
                    "{action}: {} {} (commits after {}s without another tap)",
                    outcome.amount,
                    action.unit(),
                    window.num_seconds()
                )?;
            }
            Some(Tap::Instant(action)) => instant(writer, db, session, action)?,
            None => writeln!(writer, "Unknown action: {}", line.trim())?,
        }
    }

    if let Some(finished) = accumulator.finalize() {
        log(writer, db, session, finished)?;
    }
    match reader.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("stdin reader thread panicked"),
    }
    Ok(())
}

fn expire<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    accumulator: &mut VolumeAccumulator,
    token: SessionToken,
) -> Result<()> {
    if let Some(finished) = accumulator.expire(token, Utc::now()) {
        log(writer, db, session, finished)?;
    }
    Ok(())
}

fn log<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    new: NewEvent,
) -> Result<()> {
    let logged = db.log_event(session, new)?;
    report_logged(writer, &logged)
}

fn instant<W: Write>(
    writer: &mut W,
    db: &mut Database,
    session: &Session,
    action: InstantAction,
) -> Result<()> {
    let kind = match action {
        InstantAction::Diaper(diaper_type) => EventKind::Diaper { diaper_type },
        InstantAction::Misc(description) => EventKind::Misc { description },
        InstantAction::ToggleSleep => {
            match db.running_timer(&session.baby_id, TimerType::Sleep)? {
                Some(timer) => {
                    if let Some(logged) = db.stop_timer(&timer.id, &TimerMetadata::new())? {
                        report_logged(writer, &logged)?;
                    }
                }
                None => {
                    let timer = db.start_timer(session, TimerType::Sleep, TimerMetadata::new())?;
                    writeln!(writer, "Started sleep timer [{}]", timer.id)?;
                }
            }
            return Ok(());
        }
    };
    log(writer, db, session, NewEvent::new(kind))
}
