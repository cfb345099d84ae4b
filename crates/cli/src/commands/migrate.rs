use crate::commands::{load_config, open_pool, runtime, CommandResult, StepFailure};
use storefront_db::migrations;

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let applied = migrations::MIGRATOR.iter().count();
        pool.close().await;
        Ok::<usize, StepFailure>(applied)
    });

    match result {
        Ok(applied) => CommandResult::success(
            "migrate",
            format!("applied pending migrations ({applied} known)"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
