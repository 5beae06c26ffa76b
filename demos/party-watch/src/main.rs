//! Joins a party and prints every member update as a JSON line.
//!
//! ```text
//! PARTYLINE_ENDPOINT=https://party.example.com/ws \
//! PARTYLINE_PASSPHRASE="correct horse" \
//! RUST_LOG=info,partyline=debug \
//! cargo run -p party-watch --features tls
//! ```
//!
//! `PARTYLINE_MEMBER_ID` pins the member id; otherwise a random one is used.

use std::env;
use std::process::ExitCode;

use partyline::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,partyline=debug";

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

struct Settings {
    endpoint: String,
    passphrase: String,
    member_id: Option<MemberId>,
}

impl Settings {
    fn from_env() -> Result<Self, String> {
        let endpoint = required("PARTYLINE_ENDPOINT")?;
        let passphrase = required("PARTYLINE_PASSPHRASE")?;
        let member_id = match env::var("PARTYLINE_MEMBER_ID") {
            Ok(raw) => Some(MemberId(raw.trim().parse().map_err(|e| {
                format!("PARTYLINE_MEMBER_ID must be an integer: {e}")
            })?)),
            Err(_) => None,
        };
        Ok(Self {
            endpoint,
            passphrase,
            member_id,
        })
    }
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{name} is not set"))
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(message) => {
            eprintln!("party-watch: {message}");
            return ExitCode::FAILURE;
        }
    };

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "party-watch failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), PartylineError> {
    let mut tracker = PartyTracker::websocket(ConnectionConfig::new(settings.endpoint));
    tracing::info!(session_id = tracker.connection().session_id(), "starting");

    tracker.connect().await?;
    let (party_id, member_id) = tracker
        .join_party(&settings.passphrase, settings.member_id)
        .await?;
    tracing::info!(%party_id, %member_id, "watching party");

    loop {
        tokio::select! {
            event = tracker.next_event() => match event {
                Some(event) => report(event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, leaving party");
                if let Err(e) = tracker.leave_party().await {
                    tracing::warn!(error = %e, "leave failed");
                }
                tracker.disconnect().await;
                break;
            }
        }
    }
    Ok(())
}

fn report(event: TrackerEvent) {
    let line = match event {
        TrackerEvent::MemberUpdate { member_id, state } => {
            json!({"event": "update", "member": member_id, "state": state})
        }
        TrackerEvent::MemberRemoved(member_id) => json!({"event": "removed", "member": member_id}),
        TrackerEvent::MemberJoined { member_id, .. } => json!({"event": "joined", "member": member_id}),
        TrackerEvent::CustomData {
            member_id,
            type_name,
            value,
        } => json!({"event": "custom", "member": member_id, "type": type_name, "value": value}),
        TrackerEvent::Connected => {
            tracing::info!("connected");
            return;
        }
        TrackerEvent::Disconnected(info) => {
            tracing::info!(%info, "disconnected");
            return;
        }
        TrackerEvent::Error(e) => {
            tracing::warn!(error = %e, "party error");
            return;
        }
    };
    println!("{line}");
}
