use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub exhibition: ExhibitionConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let storage = StorageConfig {
            database_path: optional_var("DATABASE_PATH").map(PathBuf::from),
            federations_csv: optional_var("FEDERATIONS_CSV").map(PathBuf::from),
            staff_token: optional_var("STAFF_TOKEN"),
        };

        let native_language = match optional_var("NATIVE_LANGUAGE") {
            Some(raw) => NativeLanguage::parse(&raw)?,
            None => NativeLanguage::default(),
        };

        let appointments_authorization_key = match optional_var("APPOINTMENTS_AUTHORIZATION_KEY")
        {
            Some(key) => key,
            None if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingAuthorizationKey)
            }
            None => "KEY".to_string(),
        };

        let exhibition = ExhibitionConfig {
            name: optional_var("EXHIBITION_NAME")
                .unwrap_or_else(|| "Philatelic Exhibition".to_string()),
            url: optional_var("EXHIBITION_URL").unwrap_or_default(),
            email: optional_var("EXHIBITION_EMAIL").unwrap_or_default(),
            native_language,
            appointments_authorization_key,
            entry_forms_disabled_message: optional_var("ENTRY_FORMS_DISABLED_MESSAGE"),
            entry_forms_submit_message: optional_var("ENTRY_FORMS_SUBMIT_MESSAGE"),
            general_commissioner_email: optional_var("GENERAL_COMMISSIONER_EMAIL"),
        };

        let only_additional_recipients = match optional_var("MAIL_ONLY_ADDITIONAL_RECIPIENTS") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "MAIL_ONLY_ADDITIONAL_RECIPIENTS",
            })?,
            None => false,
        };

        let mail = MailConfig {
            sender: optional_var("MAIL_SENDER").unwrap_or_else(|| "noreply@localhost".to_string()),
            no_commissioner_email: optional_var("MAIL_NO_COMMISSIONER_EMAIL"),
            additional_recipients: optional_var("MAIL_ADDITIONAL_RECIPIENTS")
                .map(|raw| split_addresses(&raw))
                .unwrap_or_default(),
            only_additional_recipients,
            spool_dir: optional_var("MAIL_SPOOL_DIR").map(PathBuf::from),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage,
            exhibition,
            mail,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Splits a comma separated address list, dropping blanks.
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where records live and who may read them in bulk.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
    pub federations_csv: Option<PathBuf>,
    pub staff_token: Option<String>,
}

/// Communication language offered next to English.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeLanguage {
    pub code: String,
    pub label: String,
}

impl NativeLanguage {
    /// Parses `CODE:Label`, e.g. `EL:Greek`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (code, label) = raw
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidNativeLanguage(raw.to_string()))?;
        let code = code.trim().to_ascii_uppercase();
        let label = label.trim();
        if code.len() != 2 || label.is_empty() || code == "EN" {
            return Err(ConfigError::InvalidNativeLanguage(raw.to_string()));
        }
        Ok(Self {
            code,
            label: label.to_string(),
        })
    }
}

impl Default for NativeLanguage {
    fn default() -> Self {
        Self {
            code: "EL".to_string(),
            label: "Greek".to_string(),
        }
    }
}

/// Exhibition identity and entry form switches.
#[derive(Debug, Clone)]
pub struct ExhibitionConfig {
    pub name: String,
    pub url: String,
    pub email: String,
    pub native_language: NativeLanguage,
    pub appointments_authorization_key: String,
    pub entry_forms_disabled_message: Option<String>,
    pub entry_forms_submit_message: Option<String>,
    pub general_commissioner_email: Option<String>,
}

impl ExhibitionConfig {
    /// Name with spaces replaced, suitable for archive and file names.
    pub fn slug(&self) -> String {
        self.name.trim().replace(' ', "-")
    }
}

impl Default for ExhibitionConfig {
    fn default() -> Self {
        Self {
            name: "Philatelic Exhibition".to_string(),
            url: String::new(),
            email: String::new(),
            native_language: NativeLanguage::default(),
            appointments_authorization_key: "KEY".to_string(),
            entry_forms_disabled_message: None,
            entry_forms_submit_message: None,
            general_commissioner_email: None,
        }
    }
}

/// Outbound notice routing.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender: String,
    pub no_commissioner_email: Option<String>,
    pub additional_recipients: Vec<String>,
    pub only_additional_recipients: bool,
    pub spool_dir: Option<PathBuf>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: "noreply@localhost".to_string(),
            no_commissioner_email: None,
            additional_recipients: Vec::new(),
            only_additional_recipients: false,
            spool_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { name: &'static str },
    InvalidNativeLanguage(String),
    MissingAuthorizationKey,
    MissingDatabasePath,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { name } => {
                write!(f, "{name} must be one of true/false/1/0/yes/no")
            }
            ConfigError::InvalidNativeLanguage(raw) => write!(
                f,
                "NATIVE_LANGUAGE must look like CODE:Label with a two letter code other than EN (got '{raw}')"
            ),
            ConfigError::MissingAuthorizationKey => write!(
                f,
                "APPOINTMENTS_AUTHORIZATION_KEY is required in production"
            ),
            ConfigError::MissingDatabasePath => {
                write!(f, "DATABASE_PATH must point at the registry database")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
