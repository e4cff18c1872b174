use clap::{Parser, Subcommand};
use registration_core::constants::DEFAULT_DATA_DIR;
use registration_core::{
    AddressFields, FileSources, FormStateReconciler, Observer, PatientUuidMap, RegistrationConfig,
    StateEvent,
};
use registration_types::PatientUuid;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "reg")]
#[command(about = "Patient registration form-state CLI")]
struct Cli {
    /// Registration data directory
    #[arg(long, env = "REGISTRATION_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Registration configuration file (YAML)
    #[arg(long, env = "REGISTRATION_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blank form state for a new registration
    New,
    /// Reconciled form state for editing a patient
    Edit {
        /// Patient UUID
        patient_uuid: String,
        /// Print every state transition to stderr
        #[arg(long)]
        trace: bool,
    },
    /// Form state pre-filled from a master patient index record
    Import {
        /// Master patient index source identifier
        source_id: String,
    },
    /// Uuids of a patient's stored name, address and attribute records
    UuidMap {
        /// Patient UUID
        patient_uuid: String,
    },
    /// Initial address field values for a patient
    Address {
        /// Patient UUID
        patient_uuid: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn transition_printer() -> Observer<registration_core::FormState> {
    Arc::new(|event| match event {
        StateEvent::Applied { source, .. } => eprintln!("applied {source}"),
        StateEvent::Replaced { .. } => eprintln!("replaced"),
        StateEvent::SourceFailed { source, error } => eprintln!("{source} failed: {error}"),
        StateEvent::Anomaly { source, message } => eprintln!("{source}: {message}"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("registration=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    tracing::debug!("reading registration data from {}", cli.data_dir.display());
    let config = Arc::new(RegistrationConfig::load_or_default(cli.config.as_deref())?);
    let sources = Arc::new(FileSources::new(&cli.data_dir));
    let reconciler = FormStateReconciler::from_sources(config, sources);

    match cli.command {
        Commands::New => {
            let mut handle = reconciler.local_edit(None);
            print_json(&handle.settled().await?)?;
        }
        Commands::Edit {
            patient_uuid,
            trace,
        } => {
            let patient_uuid = PatientUuid::parse(&patient_uuid)?;
            let reconciler = if trace {
                reconciler.with_observer(transition_printer())
            } else {
                reconciler
            };
            let mut handle = reconciler.local_edit(Some(patient_uuid));
            print_json(&handle.settled().await?)?;
        }
        Commands::Import { source_id } => {
            let mut handle = reconciler.master_index_import(&source_id);
            print_json(&handle.settled().await?)?;
        }
        Commands::UuidMap { patient_uuid } => {
            let patient_uuid = PatientUuid::parse(&patient_uuid)?;
            let mut handle =
                reconciler.patient_uuid_map(Some(patient_uuid), PatientUuidMap::default());
            print_json(&handle.settled().await?)?;
        }
        Commands::Address { patient_uuid } => {
            let patient_uuid = PatientUuid::parse(&patient_uuid)?;
            let mut handle =
                reconciler.initial_address_field_values(Some(patient_uuid), AddressFields::new());
            print_json(&handle.settled().await?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_edit_with_trace() {
        let cli = Cli::try_parse_from([
            "reg",
            "--data-dir",
            "/tmp/registration",
            "edit",
            "8673ee4f-e2ab-4077-ba55-4980f408773e",
            "--trace",
        ])
        .expect("valid arguments");

        assert_eq!(cli.data_dir, PathBuf::from("/tmp/registration"));
        match cli.command {
            Commands::Edit {
                patient_uuid,
                trace,
            } => {
                assert_eq!(patient_uuid, "8673ee4f-e2ab-4077-ba55-4980f408773e");
                assert!(trace);
            }
            _ => panic!("expected edit"),
        }
    }
}
