use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("authmock")
        .about("Mock authentication service with signed upstream calls")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("AUTHMOCK_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("api-server-url")
                .long("api-server-url")
                .help("Backend base URL, example: https://auth.tld:8889")
                .env("AUTHMOCK_API_SERVER_URL")
                .required(true),
        )
        .arg(
            Arg::new("api-code")
                .long("api-code")
                .help("API code sent as X-API-CODE")
                .env("AUTHMOCK_API_CODE")
                .required(true),
        )
        .arg(
            Arg::new("api-secret")
                .long("api-secret")
                .help("Shared secret used for request and callback checksums")
                .env("AUTHMOCK_API_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("callback-fail-open")
                .long("callback-fail-open")
                .help("Acknowledge callbacks even when their checksum does not match")
                .env("AUTHMOCK_CALLBACK_FAIL_OPEN")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("AUTHMOCK_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
