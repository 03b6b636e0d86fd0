//! vpnbot: WireGuard Config Bot
//!
//! Main entry point. Loads settings, sets up logging, builds the
//! provisioning service and FAQ store, then runs the bot on the console
//! transport.
//!
//! Settings path: first CLI argument, else `$VPNBOT_CONFIG`, else built-in
//! defaults.

mod console;
mod handler;
mod settings;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vpnbot_faq::{FaqStore, StaticFaqStore};
use vpnbot_provision::{
    DryRunRegistrar, KeySource, LocalKeySource, PeerConfigService, PeerRegistrar, WgKeySource,
    WgRegistrar,
};

use crate::handler::Bot;
use crate::settings::{KeyBackend, RegistrarBackend, Settings};

// Use mimalloc as the global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vpnbot=info,vpnbot_provision=info,vpnbot_faq=info".into()),
        )
        .init();

    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("VPNBOT_CONFIG"))
        .map(PathBuf::from);

    let settings = Settings::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("loading settings from {}", path.display()),
        None => "loading default settings".to_string(),
    })?;
    if config_path.is_none() {
        warn!("No settings file given, using built-in defaults");
    }

    info!("vpnbot starting...");

    let provision = &settings.provision;
    let keys: Arc<dyn KeySource> = match settings.backend.keys {
        KeyBackend::Wg => Arc::new(WgKeySource::new(provision.wg_program.clone())),
        KeyBackend::Local => Arc::new(LocalKeySource),
    };
    let registrar: Arc<dyn PeerRegistrar> = match settings.backend.registrar {
        RegistrarBackend::Wg => Arc::new(WgRegistrar::new(
            provision.wg_program.clone(),
            provision.interface.clone(),
            provision.use_sudo,
        )),
        RegistrarBackend::DryRun => Arc::new(DryRunRegistrar),
    };

    let service = PeerConfigService::new(provision.clone(), keys, registrar)
        .await
        .context("initializing peer provisioning")?;

    let faq_store: Arc<dyn FaqStore> = match &settings.faq.path {
        Some(path) => Arc::new(
            StaticFaqStore::load(path)
                .with_context(|| format!("loading FAQ from {}", path.display()))?,
        ),
        None => Arc::new(StaticFaqStore::default()),
    };

    let mut bot = Bot::new(
        Arc::new(service),
        faq_store,
        settings.faq.texts(),
        settings.texts.clone(),
    );

    console::run(&mut bot, &settings.console).await?;

    info!("vpnbot shutting down");
    Ok(())
}
