use crate::verbosity::Verbosity;
use anyhow::{Context, Error, Result, anyhow};
use clap::builder::PossibleValuesParser;
use clap::{Parser, builder::TypedValueParser};
use const_format::{concatcp, formatcp};
use ipapi_lib::Fields;
use ipapi_lib::config::{
    DEFAULT_CAPACITY, DEFAULT_ENDPOINT, DEFAULT_MAX_ATTEMPTS, DEFAULT_REMAINING_HEADER,
    DEFAULT_RESET_HEADER, DEFAULT_USER_AGENT,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::io::{self, BufRead};
use std::path::Path;
use std::{fs, path::PathBuf, str::FromStr, time::Duration};
use strum::{Display, EnumIter, VariantNames};
use url::Url;

pub(crate) const IPAPI_CONFIG_FILE: &str = "ipapi.toml";

/// Lines starting with this marker are ignored when reading addresses
const COMMENT_MARKER: &str = "#";

const DEFAULT_BACKOFF_BUFFER: &str = "1s";
const DEFAULT_FALLBACK_BACKOFF: &str = "10s";
const DEFAULT_TIMEOUT: &str = "10s";

// this exists because clap requires `&str` type values for defaults
// whereas serde expects owned `String` types
const CAPACITY_STR: &str = concatcp!(DEFAULT_CAPACITY);
const MAX_ATTEMPTS_STR: &str = concatcp!(DEFAULT_MAX_ATTEMPTS);
// We use a custom help message here because we want to show the default
// value of the config file, but also be able to check if the user has
// provided a custom value. If they didn't, we won't throw an error if
// the file doesn't exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    IPAPI_CONFIG_FILE,
);

/// The format to print lookup results in
#[derive(
    Debug, Deserialize, Default, Clone, Copy, Display, EnumIter, VariantNames, PartialEq, Eq,
)]
#[non_exhaustive]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub(crate) enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// `<query> <status> <country> <city>`, one result per line
    Compact,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "compact" | "string" => Ok(OutputFormat::Compact),
            _ => Err(anyhow!("Unknown format {format}")),
        }
    }
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    endpoint: String = DEFAULT_ENDPOINT.to_string();
    capacity: usize = DEFAULT_CAPACITY;
    max_attempts: u32 = DEFAULT_MAX_ATTEMPTS;
    backoff_buffer: Duration = parse_default_duration(DEFAULT_BACKOFF_BUFFER);
    fallback_backoff: Duration = parse_default_duration(DEFAULT_FALLBACK_BACKOFF);
    timeout: Duration = parse_default_duration(DEFAULT_TIMEOUT);
    remaining_header: String = DEFAULT_REMAINING_HEADER.to_string();
    reset_header: String = DEFAULT_RESET_HEADER.to_string();
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    verbosity: Verbosity = Verbosity::default();
}

/// Parse one of the duration constants above
fn parse_default_duration(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or_default()
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// ipapi looks up the geolocation of IP addresses and hostnames with the
/// free ip-api.com endpoint, without ever exceeding its rate limit.
///
/// All lookups go through a single queue which waits whenever the
/// upstream reports an exhausted request window.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct IpapiOptions {
    /// Addresses to look up
    #[arg(
        name = "addresses",
        long_help = "Addresses to look up. These can be IPv4 or IPv6 addresses as well as
hostnames. Use `-` to read addresses from standard input, one per line; lines
starting with `#` are ignored.

Without any address, the public IP of this machine is looked up."
    )]
    raw_addresses: Vec<String>,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

impl IpapiOptions {
    /// Get the addresses to look up, reading from stdin for `-`
    pub(crate) fn addresses(&self) -> Result<Vec<String>> {
        let mut addresses = Vec::new();
        for raw in &self.raw_addresses {
            if raw == "-" {
                let stdin = io::stdin();
                let from_stdin =
                    read_addresses(stdin.lock()).context("Cannot read addresses from stdin")?;
                addresses.extend(from_stdin);
            } else {
                addresses.push(raw.trim().to_string());
            }
        }

        if self.raw_addresses.is_empty() {
            // An empty address makes the upstream use the caller's address
            addresses.push(String::new());
        }
        Ok(addresses)
    }
}

/// Read addresses line by line; ignore empty lines and comments
pub(crate) fn read_addresses<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let lines: Vec<_> = reader.lines().collect::<Result<_, _>>()?;
    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
        .collect())
}

/// The main configuration for ipapi
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Base URL of the lookup endpoint
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    #[serde(default = "endpoint")]
    pub(crate) endpoint: String,

    /// Response fields to request
    #[arg(
        short,
        long,
        long_help = "Response fields to request.

Either a comma-separated list of field names, e.g. `status,country,city,query`,
or the numeric code from the field generator of the upstream documentation,
e.g. `61439`. Defaults to the fields of the free endpoint's default response."
    )]
    #[serde(default)]
    pub(crate) fields: Option<Fields>,

    /// Localize city, region and country names, e.g. `de`, `pt-BR` or `zh-CN`
    #[arg(short, long)]
    #[serde(default)]
    pub(crate) lang: Option<String>,

    /// API key for the commercial endpoint
    #[arg(long, env = "IPAPI_KEY", hide_env_values = true)]
    #[serde(default)]
    pub(crate) api_key: Option<SecretString>,

    /// Maximum number of lookups to queue at once
    #[arg(long, default_value = &CAPACITY_STR)]
    #[serde(default = "capacity")]
    pub(crate) capacity: usize,

    /// Maximum number of upstream attempts per lookup while rate limited
    #[arg(long, default_value = &MAX_ATTEMPTS_STR)]
    #[serde(default = "max_attempts")]
    pub(crate) max_attempts: u32,

    /// Safety margin added to every rate limit reset, e.g. `500ms`
    #[arg(long, value_parser = humantime::parse_duration, default_value = DEFAULT_BACKOFF_BUFFER)]
    #[serde(default = "backoff_buffer", with = "humantime_serde")]
    pub(crate) backoff_buffer: Duration,

    /// How long to wait when throttled without rate limit headers
    #[arg(long, value_parser = humantime::parse_duration, default_value = DEFAULT_FALLBACK_BACKOFF)]
    #[serde(default = "fallback_backoff", with = "humantime_serde")]
    pub(crate) fallback_backoff: Duration,

    /// Timeout of a single upstream request, e.g. `5s`
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = DEFAULT_TIMEOUT)]
    #[serde(default = "timeout", with = "humantime_serde")]
    pub(crate) timeout: Duration,

    /// Header holding the number of requests left in the rate limit window
    #[arg(long, default_value = DEFAULT_REMAINING_HEADER)]
    #[serde(default = "remaining_header")]
    pub(crate) remaining_header: String,

    /// Header holding the seconds until the rate limit window resets
    #[arg(long, default_value = DEFAULT_RESET_HEADER)]
    #[serde(default = "reset_header")]
    pub(crate) reset_header: String,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Output format of the lookup results
    #[arg(
        short = 'o',
        long,
        default_value = "json",
        value_parser = PossibleValuesParser::new(OutputFormat::VARIANTS)
            .try_map(|s| s.parse::<OutputFormat>())
    )]
    #[serde(default)]
    pub(crate) format: OutputFormat,

    /// Number of threads to utilize.
    /// Defaults to number of cores available to the system
    #[arg(short = 'T', long)]
    #[serde(default)]
    pub(crate) threads: Option<usize>,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        // Read configuration file
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        // If the config file has an API key, but the CLI doesn't,
        // use the key from the config file.
        // This is outside of fold_in! because SecretBox doesn't implement Eq.
        if self.api_key.is_none() && toml.api_key.is_some() {
            self.api_key = toml.api_key;
        }

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..api_key,

                // Keys with defaults to assign
                verbose: Verbosity::default(),
                endpoint: DEFAULT_ENDPOINT,
                fields: None,
                lang: None,
                capacity: DEFAULT_CAPACITY,
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                backoff_buffer: parse_default_duration(DEFAULT_BACKOFF_BUFFER),
                fallback_backoff: parse_default_duration(DEFAULT_FALLBACK_BACKOFF),
                timeout: parse_default_duration(DEFAULT_TIMEOUT),
                remaining_header: DEFAULT_REMAINING_HEADER,
                reset_header: DEFAULT_RESET_HEADER,
                user_agent: DEFAULT_USER_AGENT,
                format: OutputFormat::default(),
                threads: None,
            }
        }
    }

    /// Turn the command-line configuration into a lookup configuration
    pub(crate) fn lookup_config(&self) -> Result<ipapi_lib::Config> {
        let endpoint = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid lookup endpoint `{}`", self.endpoint))?;

        Ok(ipapi_lib::Config::builder()
            .endpoint(endpoint)
            .fields(self.fields.clone().unwrap_or_default())
            .lang(self.lang.clone())
            .api_key(self.api_key.clone())
            .capacity(self.capacity)
            .max_attempts(self.max_attempts)
            .backoff_buffer(self.backoff_buffer)
            .fallback_backoff(self.fallback_backoff)
            .timeout(self.timeout)
            .remaining_header(self.remaining_header.clone())
            .reset_header(self.reset_header.clone())
            .user_agent(self.user_agent.clone())
            .build())
    }
}
