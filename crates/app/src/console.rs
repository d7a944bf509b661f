//! Line-oriented operator console
//!
//! Each input line is parsed as one command. Manager-only commands check the
//! session before touching the ledger.

use std::io::{BufRead, Write};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use lamesa_core::{
    AttendanceRepository, Capability, EndSession, Error, LedgerRow, Result, Role,
    UserRepository, PLACEHOLDER,
};

use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum ConsoleCommand {
    /// Create a staff account
    Register {
        username: String,
        password: String,
        /// manager, employee or none
        #[arg(value_parser = parse_role, default_value = "employee")]
        role: Role,
    },
    /// Sign in and clock in
    Login { username: String, password: String },
    /// Clock out and sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show the current shift
    Status,
    /// Show recent attendance
    History {
        /// Rows to show (defaults to the configured limit)
        limit: Option<u32>,
    },
    /// Staff roster with latest shift status (managers)
    Employees,
    /// Change a user's role (managers)
    Role {
        username: String,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
    /// Delete a staff account (managers)
    Remove { username: String },
    /// Leave the console
    #[command(alias = "exit")]
    Quit,
}

fn parse_role(s: &str) -> std::result::Result<Role, String> {
    s.parse::<Role>().map_err(|e| e.to_string())
}

/// Result of one console line
#[derive(Debug, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Parse and run one line. Errors are rendered into the reply text.
pub fn handle_line(state: &AppState, line: &str) -> Reply {
    if line.trim().is_empty() {
        return Reply::Text(String::new());
    }

    match ConsoleLine::try_parse_from(line.split_whitespace()) {
        Ok(parsed) => match execute(state, parsed.command) {
            Ok(reply) => reply,
            Err(e) => Reply::Text(format!("error: {}", e)),
        },
        Err(e) => Reply::Text(e.to_string().trim_end().to_string()),
    }
}

fn execute(state: &AppState, command: ConsoleCommand) -> Result<Reply> {
    let text = match command {
        ConsoleCommand::Register {
            username,
            password,
            role,
        } => {
            let user = state.register(&username, &password, role)?;
            format!("Registered {} as {}", user.username, user.role)
        }
        ConsoleCommand::Login { username, password } => {
            let report = state.login(&username, &password)?;
            match report.clock_in {
                Ok(record) => format!(
                    "Welcome, {} ({}). Clocked in at {}",
                    report.identity.username,
                    report.identity.role,
                    record.login_time.format("%H:%M:%S")
                ),
                Err(e) => format!(
                    "Welcome, {} ({}). Clock-in was not recorded: {}",
                    report.identity.username, report.identity.role, e
                ),
            }
        }
        ConsoleCommand::Logout => match state.logout()? {
            None => "Nobody is signed in".to_string(),
            Some(EndSession::NoActiveSession) => {
                "Signed out. No open shift was found to clock out".to_string()
            }
            Some(EndSession::Closed(row)) => {
                format!("Signed out. Worked {} ({})", row.hours_display(), row.status())
            }
        },
        ConsoleCommand::Whoami => match state.session.current_user() {
            Some(identity) => format!("{} ({})", identity.username, identity.role),
            None => "Not signed in".to_string(),
        },
        ConsoleCommand::Status => status(state)?,
        ConsoleCommand::History { limit } => {
            state.require(Capability::ViewOwnAttendance)?;
            let username = state.current_username()?;
            let limit = limit.unwrap_or_else(|| state.ledger.history_limit());
            let rows = state.ledger.fetch_history(&username, limit)?;
            history_table(&rows)
        }
        ConsoleCommand::Employees => {
            state.require(Capability::ManageEmployees)?;
            roster(state)?
        }
        ConsoleCommand::Role { username, role } => {
            state.require(Capability::ManageEmployees)?;
            if !state.ledger.database().update_role(&username, role)? {
                return Err(Error::NotFound(format!("user '{}'", username)));
            }
            format!("{} is now {}", username, role)
        }
        ConsoleCommand::Remove { username } => {
            state.require(Capability::ManageEmployees)?;
            if state.session.username().as_deref() == Some(username.as_str()) {
                return Err(Error::InvalidOperation(
                    "cannot remove the signed-in account".to_string(),
                ));
            }
            if !state.ledger.database().delete_user(&username)? {
                return Err(Error::NotFound(format!("user '{}'", username)));
            }
            format!("Removed {}", username)
        }
        ConsoleCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

fn status(state: &AppState) -> Result<String> {
    let username = state.current_username()?;
    let mut lines = vec![format!("User: {} ({})", username, state.session.role())];

    let since = match state.ledger.member_since(&username) {
        Ok(Some(first)) => first.format("%B %-d, %Y").to_string(),
        Ok(None) => "Today".to_string(),
        Err(Error::MalformedTimestamp { .. }) => "Unknown".to_string(),
        Err(e) => return Err(e),
    };
    lines.push(format!("Member since: {}", since));

    let session = match state.ledger.active_session(&username)? {
        Some(LedgerRow::Record(record)) => {
            format_elapsed(record.login_time, state.ledger.now())
        }
        Some(LedgerRow::Malformed(_)) => PLACEHOLDER.to_string(),
        None => "No active session".to_string(),
    };
    lines.push(format!("Session: {}", session));

    Ok(lines.join("\n"))
}

/// "2h 15m 30s"
fn format_elapsed(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let secs = to.signed_duration_since(from).num_seconds().max(0);
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn history_table(rows: &[LedgerRow]) -> String {
    if rows.is_empty() {
        return "No attendance records found".to_string();
    }

    let mut out = format!(
        "{:<12} {:<10} {:<10} {:<12} {}",
        "Date", "Login", "Logout", "Hours", "Status"
    );
    for row in rows {
        let (date, login, logout) = match row {
            LedgerRow::Record(r) => (
                r.login_time.format("%Y-%m-%d").to_string(),
                r.login_time.format("%H:%M:%S").to_string(),
                r.logout_time
                    .map(|t| t.format("%H:%M:%S").to_string())
                    .unwrap_or_else(|| "Active".to_string()),
            ),
            LedgerRow::Malformed(m) => (
                PLACEHOLDER.to_string(),
                PLACEHOLDER.to_string(),
                if m.logout_time.is_some() {
                    PLACEHOLDER.to_string()
                } else {
                    "Active".to_string()
                },
            ),
        };
        out.push_str(&format!(
            "\n{:<12} {:<10} {:<10} {:<12} {}",
            date,
            login,
            logout,
            row.hours_display(),
            row.status()
        ));
    }
    out
}

fn roster(state: &AppState) -> Result<String> {
    let classifier = state.ledger.classifier();
    let rows = state.ledger.database().list_overview()?;
    if rows.is_empty() {
        return Ok("No staff accounts".to_string());
    }

    let mut out = format!(
        "{:<16} {:<10} {:<20} {:<20} {}",
        "Username", "Role", "Last login", "Last logout", "Shift"
    );
    for row in rows {
        let status = classifier.roster_status(row.last_login.as_deref(), row.last_logout.as_deref());
        out.push_str(&format!(
            "\n{:<16} {:<10} {:<20} {:<20} {}",
            row.username,
            row.role.as_str(),
            row.last_login.as_deref().unwrap_or("Never logged in"),
            row.last_logout.as_deref().unwrap_or(PLACEHOLDER),
            status
        ));
    }
    Ok(out)
}

/// Read commands until EOF or `quit`
pub fn run<R: BufRead, W: Write>(state: &AppState, input: R, mut output: W) -> std::io::Result<()> {
    write!(output, "> ")?;
    output.flush()?;

    for line in input.lines() {
        match handle_line(state, &line?) {
            Reply::Quit => break,
            Reply::Text(text) => {
                if !text.is_empty() {
                    writeln!(output, "{}", text)?;
                }
            }
        }
        write!(output, "> ")?;
        output.flush()?;
    }

    // Leaving the console ends the shift like a logout would
    if state.session.is_authenticated() {
        if let Err(e) = state.logout() {
            writeln!(output, "error: {}", e)?;
        }
    }
    Ok(())
}
