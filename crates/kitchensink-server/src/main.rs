// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::process::ExitCode;

use clap::Parser;
use kitchensink_server::{commands, logging, version, AppState, Args, Command};
use kitchensink_server_config::{load_config, load_config_with_file};
use kitchensink_server_db::{create_pool, run_migrations};
use kitchensink_server_identity::IdentityError;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	dotenvy::dotenv().ok();
	let args = Args::parse();

	match &args.command {
		Command::Version => {
			println!("{}", version::format_version_info());
			return Ok(ExitCode::SUCCESS);
		}
		Command::Keygen { key_version } => {
			print_json(&commands::keygen(*key_version))?;
			return Ok(ExitCode::SUCCESS);
		}
		_ => {}
	}

	let config = match &args.config {
		Some(path) => load_config_with_file(path)?,
		None => load_config()?,
	};
	logging::init_tracing(&config.logging);

	tracing::info!(database = %config.database.url, "opening database");
	let pool = create_pool(&config.database.url).await?;
	run_migrations(&pool).await?;

	let ctx = args.operation_context();
	let state = AppState::new(pool, &config).await?;
	let result = commands::execute(&state, &ctx, args.command).await;
	state.shutdown().await;

	match result {
		Ok(output) => {
			print_json(&output)?;
			Ok(ExitCode::SUCCESS)
		}
		Err(e) => match e.downcast_ref::<IdentityError>() {
			Some(err) => {
				tracing::debug!(error = %err, "command rejected");
				print_json(&json!({ "error": err.public_body() }))?;
				Ok(ExitCode::FAILURE)
			}
			None => Err(e),
		},
	}
}

fn print_json(value: &Value) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
