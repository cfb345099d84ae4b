use crate::commands::{load_config, open_pool, runtime, CommandResult, StepFailure};
use storefront_db::{migrations, CatalogSeedDataset, SeedResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = CatalogSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = CatalogSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let failed_checks = verification
            .checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(*check))
            .collect::<Vec<_>>();
        let run_result: Result<SeedResult, StepFailure> = if verification.all_present {
            Ok(seed_result)
        } else {
            Err(("seed_verification", verification_failure_message(&failed_checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", success_message(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn success_message(seeded: &SeedResult) -> String {
    format!(
        "demo catalog loaded: {} categories, {} products ({})",
        seeded.categories_seeded,
        seeded.products_seeded.len(),
        seeded.products_seeded.join(", ")
    )
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
