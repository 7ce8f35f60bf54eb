//! Incydent CLI — report an incident from the command line.
//!
//! Set INCYDENT_ACCESS_TOKEN for the storage provider and SMTP_HOST /
//! SMTP_FROM (plus credentials) for the outgoing mail.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use incydent_cli::init_tracing;
use incydent_core::{
    AccessCredential, Config, Coordinates, FileStore, PersonalProfile, ProfileStore, Session,
    SessionStore, UserProfile,
};
use incydent_geocode::{acquire_position, CachedPosition, FixedPositionSource, LocationResolver};
use incydent_storage::DriveStorage;
use incydent_workflow::{ReportWorkflow, SmtpMailer, RECIPIENT_DIRECTORY};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "incydent", about = "Zgłaszanie incydentów z dowodami")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// File a report: upload evidence and send the mail
    Report {
        /// Evidence files (photos, videos, documents)
        #[arg(required = true)]
        evidence: Vec<PathBuf>,
        /// Report title (mail subject)
        #[arg(long)]
        title: String,
        /// Incident description
        #[arg(long)]
        description: String,
        /// Location as free text; skips the reverse lookup
        #[arg(long)]
        location: Option<String>,
        /// Latitude of the incident (with --lng, reverse-geocoded)
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        /// Longitude of the incident
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
        /// Recipient address; repeatable
        #[arg(long = "to")]
        to: Vec<String>,
        /// Directory entry index (see `incydent directory`); repeatable
        #[arg(long = "directory")]
        directory: Vec<usize>,
    },
    /// Search for a location by free text
    Locate {
        /// Search query
        query: String,
    },
    /// Manage the personal profile appended to reports
    Profile {
        #[command(subcommand)]
        sub: ProfileCommands,
    },
    /// List the built-in recipient directory
    Directory,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Save name, phone and address
    Set {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
    },
    /// Show the saved profile
    Show,
    /// Remove the saved profile
    Clear,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<Arc<FileStore>> {
    let store = match &config.data_dir {
        Some(dir) => FileStore::open(dir.clone()),
        None => FileStore::open_default(),
    }
    .context("Failed to open local data store")?;
    Ok(Arc::new(store))
}

fn session_from(config: &Config, store: Arc<FileStore>) -> anyhow::Result<Session> {
    let cached = SessionStore::new(store).load();
    let credential = match (&config.access_token, &cached) {
        (Some(token), _) => AccessCredential::new(token.clone()),
        (None, Some(session)) => session.credential.clone(),
        (None, None) => bail!(
            "No access credential. Set INCYDENT_ACCESS_TOKEN or sign in so a session is cached"
        ),
    };
    let profile = cached.map(|s| s.profile).unwrap_or(UserProfile {
        email: String::new(),
        name: String::new(),
        picture: None,
    });
    Ok(Session {
        credential,
        profile,
    })
}

async fn run_report(
    config: Config,
    evidence: Vec<PathBuf>,
    title: String,
    description: String,
    location: Option<String>,
    coordinates: Option<Coordinates>,
    mut to: Vec<String>,
    directory: Vec<usize>,
) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let session = session_from(&config, Arc::clone(&store))?;

    let smtp = config
        .smtp
        .as_ref()
        .context("Mail transport not configured. Set SMTP_HOST and SMTP_FROM")?;
    let mailer = Arc::new(SmtpMailer::from_config(smtp).context("Failed to set up SMTP")?);
    let storage = Arc::new(
        DriveStorage::new(config.storage_api_base.clone(), config.upload_chunk_bytes)
            .context("Failed to set up storage client")?,
    );

    for index in directory {
        let entry = RECIPIENT_DIRECTORY
            .get(index)
            .with_context(|| format!("No directory entry {}", index))?;
        to.push(entry.email.to_string());
    }
    if to.is_empty() {
        bail!("At least one recipient is required (--to or --directory)");
    }

    let mut flow = ReportWorkflow::new(&config, session, storage, mailer, store);
    for path in &evidence {
        flow.add_evidence(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
    }
    for item in flow.evidence() {
        tracing::info!(kind = item.kind.label(), name = %item.display_name, "Dowód dodany");
    }

    flow.advance_to_details()?;
    if let Some(mut progress) = flow.upload_progress() {
        tokio::spawn(async move {
            while progress.changed().await.is_ok() {
                tracing::info!(percent = *progress.borrow(), "Przesyłanie dowodów");
            }
        });
    }

    // Resolve a pinned position to a display address; free text is taken
    // as-is. With neither, fall back to the configured device position.
    match (location, coordinates) {
        (Some(address), pin) => flow.set_location(address, pin),
        (None, pin) => {
            let pin = match (pin, config.default_position) {
                (Some(pin), _) => pin,
                (None, Some(fallback)) => {
                    let source = CachedPosition::new(
                        Arc::new(FixedPositionSource(fallback)),
                        config.position_cache_tolerance,
                    );
                    acquire_position(&source, config.position_timeout)
                        .await
                        .context("Position acquisition failed")?
                }
                (None, None) => bail!(
                    "Location is required (--location, --lat/--lng, or INCYDENT_DEFAULT_LAT/LNG)"
                ),
            };
            let resolver =
                LocationResolver::from_config(&config).context("Failed to set up geocoding")?;
            let address = resolver.resolve(pin.lat, pin.lng).await;
            flow.set_location(address, Some(pin));
        }
    }
    flow.set_title(title);
    flow.set_description(description);
    flow.advance_to_recipients()?;

    for address in &to {
        flow.add_recipient(address)
            .with_context(|| format!("Recipient rejected: {}", address))?;
    }

    flow.send().await?;

    let folder = flow
        .draft()
        .evidence_folder_reference
        .clone()
        .unwrap_or_default();
    println!("Zgłoszenie wysłane. Dowody: {}", folder);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            evidence,
            title,
            description,
            location,
            lat,
            lng,
            to,
            directory,
        } => {
            let coordinates = match (lat, lng) {
                (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
                _ => None,
            };
            run_report(
                config,
                evidence,
                title,
                description,
                location,
                coordinates,
                to,
                directory,
            )
            .await?;
        }
        Commands::Locate { query } => {
            let resolver =
                LocationResolver::from_config(&config).context("Failed to set up geocoding")?;
            let hit = resolver.search(&query).await?;

            #[derive(Serialize)]
            struct Located {
                lat: f64,
                lng: f64,
                address: String,
            }
            print_json(&Located {
                lat: hit.lat,
                lng: hit.lng,
                address: hit.address,
            })?;
        }
        Commands::Profile { sub } => {
            let store = open_store(&config)?;
            let profiles = ProfileStore::new(store);
            match sub {
                ProfileCommands::Set {
                    name,
                    phone,
                    address,
                } => {
                    let profile = PersonalProfile {
                        name,
                        phone,
                        address,
                    };
                    profiles.save(&profile).context("Failed to save profile")?;
                    if !profile.is_complete() {
                        tracing::warn!(
                            "Profile saved but incomplete; it will not be attached to reports"
                        );
                    }
                }
                ProfileCommands::Show => match profiles.load() {
                    Some(profile) => print_json(&profile)?,
                    None => println!("No saved profile"),
                },
                ProfileCommands::Clear => {
                    profiles.clear().context("Failed to clear profile")?;
                }
            }
        }
        Commands::Directory => {
            for (index, entry) in RECIPIENT_DIRECTORY.iter().enumerate() {
                println!("{:>2}  {}  <{}>", index, entry.name, entry.email);
            }
        }
    }

    Ok(())
}
