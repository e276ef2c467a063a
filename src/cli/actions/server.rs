use crate::authmock::new;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::upstream::{CallbackVerifier, StaticSecret, UpstreamClient, UpstreamConfig};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server {
            port,
            callback_fail_open,
        } => {
            let config = UpstreamConfig::new(
                &globals.api_server_url,
                &globals.api_code,
                SecretString::from(globals.api_secret.expose_secret().to_owned()),
            )
            .context("Invalid upstream configuration")?;

            info!("Forwarding to {}", config.base_url());

            let upstream = UpstreamClient::new(Arc::new(config))
                .context("Failed to build upstream client")?;

            let secrets = StaticSecret::new(SecretString::from(
                globals.api_secret.expose_secret().to_owned(),
            ));
            let verifier = CallbackVerifier::new(Arc::new(secrets)).fail_open(callback_fail_open);

            if callback_fail_open {
                warn!("Callbacks with a bad checksum will be acknowledged");
            }

            new(port, Arc::new(upstream), Arc::new(verifier)).await?;
        }
    }

    Ok(())
}
