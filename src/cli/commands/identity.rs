use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_TOKEN_URL: &str = "token-url";
pub const ARG_API_KEY: &str = "api-key";
pub const ARG_TOKEN_TIMEOUT_SECONDS: &str = "token-timeout-seconds";

const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_URL)
                .long(ARG_TOKEN_URL)
                .help("Identity provider secure-token endpoint used to refresh ID tokens")
                .env("GATEHOUSE_TOKEN_URL")
                .default_value(DEFAULT_TOKEN_URL),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long(ARG_API_KEY)
                .help("Identity provider API key")
                .env("GATEHOUSE_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TIMEOUT_SECONDS)
                .long(ARG_TOKEN_TIMEOUT_SECONDS)
                .help("Timeout for token refresh requests in seconds")
                .env("GATEHOUSE_TOKEN_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub token_url: String,
    pub api_key: SecretString,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse identity provider arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // Filter empty strings which clap passes through if env vars are set to ""
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            token_url: read_required(ARG_TOKEN_URL)?,
            api_key: SecretString::from(read_required(ARG_API_KEY)?),
            timeout_seconds: matches
                .get_one::<u64>(ARG_TOKEN_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(10),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn command() -> Command {
        with_args(Command::new("gatehouse"))
    }

    #[test]
    fn parse_defaults() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_TOKEN_URL", None::<&str>),
                ("GATEHOUSE_API_KEY", None::<&str>),
                ("GATEHOUSE_TOKEN_TIMEOUT_SECONDS", None::<&str>),
            ],
            || {
                let matches = command().get_matches_from(vec!["gatehouse", "--api-key", "k"]);
                let options = Options::parse(&matches).ok();
                assert_eq!(
                    options.as_ref().map(|o| o.token_url.as_str()),
                    Some(DEFAULT_TOKEN_URL)
                );
                assert_eq!(
                    options.as_ref().map(|o| o.api_key.expose_secret().to_string()),
                    Some("k".to_string())
                );
                assert_eq!(options.map(|o| o.timeout_seconds), Some(10));
            },
        );
    }

    #[test]
    fn empty_api_key_env_is_rejected() {
        temp_env::with_vars([("GATEHOUSE_API_KEY", Some(""))], || {
            let matches = command().try_get_matches_from(vec!["gatehouse"]);
            let result = matches.map_err(anyhow::Error::from).and_then(|m| Options::parse(&m));
            assert!(result.is_err());
        });
    }
}
