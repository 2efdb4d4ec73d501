//! `run` command implementation.

use std::time::Duration;

use actor_factory::{classify, Backoff, Classification, MockConfig, RetryPolicy, SpawnPointResolver};
use anyhow::{Context, Result};
use contracts::{RuntimeSettings, SpawnPointOverrides};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_spawner(args: &RunArgs) -> Result<()> {
    let path = &args.objects_definition_file;
    info!(file = %path.display(), "Loading objects definition");

    let definition = config_loader::ConfigLoader::load_from_path(path)
        .map_err(|e| CliError::config_load(path, e))?;

    let settings = runtime_settings(args, config_loader::overrides_from_env());
    info!(
        objects = definition.objects.len(),
        sensors_only = settings.sensors_only,
        overrides = settings.overrides.len(),
        "Objects definition loaded"
    );

    // Dry run - classify, print the plan and exit
    if args.dry_run {
        let classification = classify(definition.objects, settings.sensors_only)
            .map_err(|e| CliError::config_load(path, e))?;
        info!("Dry run mode - objects definition is valid, exiting");
        print_plan(&classification, &settings);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let session = Session::new(SessionConfig {
        definition,
        settings,
        retry: retry_policy(args),
        host: args.host.clone(),
        port: args.port,
        backend: MockConfig::default(),
    });

    let stats = session
        .run(shutdown_signal())
        .await
        .context("Spawn session failed")?;

    info!(
        destroyed = stats.teardown.destroyed.len(),
        failed = stats.teardown.failed.len(),
        duration_secs = stats.duration.as_secs_f64(),
        "Session finished"
    );
    stats.print_summary();

    info!("CARLA Spawner finished");
    Ok(())
}

/// Environment overrides first, `--spawn-point` flags win
fn runtime_settings(args: &RunArgs, env_overrides: SpawnPointOverrides) -> RuntimeSettings {
    let mut overrides = env_overrides;
    overrides.merge(args.spawn_points.iter().cloned().collect());
    RuntimeSettings {
        sensors_only: args.spawn_sensors_only,
        overrides,
    }
}

fn retry_policy(args: &RunArgs) -> RetryPolicy {
    let policy = match args.max_spawn_attempts {
        0 => RetryPolicy::unbounded(),
        n => RetryPolicy::bounded(n),
    };
    match args.retry_interval_ms {
        0 => policy,
        ms => policy.with_backoff(Backoff::Fixed(Duration::from_millis(ms))),
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print the spawn plan for dry-run mode
fn print_plan(classification: &Classification, settings: &RuntimeSettings) {
    let resolver = SpawnPointResolver::new(&settings.overrides);

    println!("\n=== Spawn Plan ===\n");
    println!(
        "Mode: {}",
        if settings.sensors_only {
            "sensors only"
        } else {
            "normal"
        }
    );

    println!("\nGlobal sensors ({}):", classification.global_sensors.len());
    for sensor in &classification.global_sensors {
        println!("  - {}", sensor.sensor_name());
    }

    println!("\nVehicles / walkers ({}):", classification.entities.len());
    for entity in &classification.entities {
        let sensor_count = entity.sensors.as_ref().map_or(0, Vec::len);
        if settings.sensors_only {
            println!(
                "  - {} ({}) - {} sensors, attached by role name",
                entity.id, entity.object_type, sensor_count
            );
        } else {
            let resolution = resolver.resolve(entity);
            println!(
                "  - {} ({}) - {} sensors, spawn point: {}",
                entity.id,
                entity.object_type,
                sensor_count,
                resolution.source.as_str()
            );
            for error in &resolution.errors {
                println!("      ! {}", error);
            }
        }
    }

    if !classification.ignored.is_empty() {
        println!("\nIgnored ({}):", classification.ignored.len());
        for object in &classification.ignored {
            println!("  - {} ({})", object.id, object.object_type);
        }
    }

    println!();
}
