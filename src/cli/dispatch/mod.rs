use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::{anyhow, Result};
use secrecy::SecretString;

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .ok_or_else(|| anyhow!("missing required argument: --{name}"))
}

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let globals = GlobalArgs::new(
        required(matches, "api-server-url")?,
        required(matches, "api-code")?,
        SecretString::from(required(matches, "api-secret")?),
    );

    let action = Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        callback_fail_open: matches.get_flag("callback-fail-open"),
    };

    Ok((action, globals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler() {
        temp_env::with_vars(
            [
                ("AUTHMOCK_PORT", None::<&str>),
                ("AUTHMOCK_CALLBACK_FAIL_OPEN", None),
            ],
            || {
                let matches = commands::new().get_matches_from([
                    "authmock",
                    "--api-server-url",
                    "http://backend:8889",
                    "--api-code",
                    "code",
                    "--api-secret",
                    "secret",
                    "--callback-fail-open",
                ]);

                let (Action::Server { port, callback_fail_open }, globals) =
                    handler(&matches).unwrap();

                assert_eq!(port, 8080);
                assert!(callback_fail_open);
                assert_eq!(globals.api_server_url, "http://backend:8889");
                assert_eq!(globals.api_code, "code");
                assert_eq!(globals.api_secret.expose_secret(), "secret");
            },
        );
    }
}
