use chrono::{Duration, Utc};
use storefront_db::migrations;
use storefront_db::repositories::{SessionRepository, SqlSessionRepository};

use crate::commands::{load_config, open_pool, runtime, CommandResult, StepFailure};

/// Deletes sessions idle longer than `max_age_secs`, falling back to
/// `session.max_age_secs` from the loaded config.
pub fn purge(max_age_secs: Option<u64>) -> CommandResult {
    let config = match load_config("sessions purge") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let max_age_secs = max_age_secs.unwrap_or(config.session.max_age_secs);
    let Some(cutoff) = i64::try_from(max_age_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|max_age| Utc::now().checked_sub_signed(max_age))
    else {
        return CommandResult::failure(
            "sessions purge",
            "config_validation",
            format!("session max age `{max_age_secs}`s is out of range"),
            2,
        );
    };
    let runtime = match runtime("sessions purge") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let purged = SqlSessionRepository::new(pool.clone())
            .purge_older_than(cutoff)
            .await
            .map_err(|error| ("session_purge", error.to_string(), 7u8));
        pool.close().await;
        purged
    });

    match result {
        Ok(purged) => CommandResult::success("sessions purge", purge_message(purged, max_age_secs)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("sessions purge", error_class, message, exit_code)
        }
    }
}

fn purge_message(purged: u64, max_age_secs: u64) -> String {
    let noun = if purged == 1 { "session" } else { "sessions" };
    format!("purged {purged} {noun} idle for more than {max_age_secs}s")
}
