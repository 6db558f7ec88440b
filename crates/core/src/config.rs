use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub marketing: MarketingConfig,
    pub email: EmailConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub random_seed: u64,
    pub test_fraction: f64,
    pub n_estimators: usize,
    pub max_tree_depth: usize,
    pub confidence_threshold: f64,
}

#[derive(Clone, Debug)]
pub struct MarketingConfig {
    pub high_value_threshold: u64,
    pub low_engagement_threshold: u64,
    pub high_value_discount: f64,
    pub regular_discount: f64,
    pub voucher_amount: u32,
    pub max_recommendations: usize,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub password: SecretString,
    pub use_tls: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub random_seed: Option<u64>,
    pub test_fraction: Option<f64>,
    pub n_estimators: Option<usize>,
    pub confidence_threshold: Option<f64>,
    pub max_recommendations: Option<usize>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig {
                random_seed: 42,
                test_fraction: 0.2,
                n_estimators: 100,
                max_tree_depth: 12,
                confidence_threshold: 0.6,
            },
            marketing: MarketingConfig {
                high_value_threshold: 10,
                low_engagement_threshold: 3,
                high_value_discount: 0.20,
                regular_discount: 0.05,
                voucher_amount: 200,
                max_recommendations: 5,
            },
            email: EmailConfig {
                host: "smtp.gmail.com".to_string(),
                port: 587,
                from_address: String::new(),
                password: String::new().into(),
                use_tls: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("cartwise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(model) = patch.model {
            if let Some(random_seed) = model.random_seed {
                self.model.random_seed = random_seed;
            }
            if let Some(test_fraction) = model.test_fraction {
                self.model.test_fraction = test_fraction;
            }
            if let Some(n_estimators) = model.n_estimators {
                self.model.n_estimators = n_estimators;
            }
            if let Some(max_tree_depth) = model.max_tree_depth {
                self.model.max_tree_depth = max_tree_depth;
            }
            if let Some(confidence_threshold) = model.confidence_threshold {
                self.model.confidence_threshold = confidence_threshold;
            }
        }

        if let Some(marketing) = patch.marketing {
            if let Some(high_value_threshold) = marketing.high_value_threshold {
                self.marketing.high_value_threshold = high_value_threshold;
            }
            if let Some(low_engagement_threshold) = marketing.low_engagement_threshold {
                self.marketing.low_engagement_threshold = low_engagement_threshold;
            }
            if let Some(high_value_discount) = marketing.high_value_discount {
                self.marketing.high_value_discount = high_value_discount;
            }
            if let Some(regular_discount) = marketing.regular_discount {
                self.marketing.regular_discount = regular_discount;
            }
            if let Some(voucher_amount) = marketing.voucher_amount {
                self.marketing.voucher_amount = voucher_amount;
            }
            if let Some(max_recommendations) = marketing.max_recommendations {
                self.marketing.max_recommendations = max_recommendations;
            }
        }

        if let Some(email) = patch.email {
            if let Some(host) = email.host {
                self.email.host = host;
            }
            if let Some(port) = email.port {
                self.email.port = port;
            }
            if let Some(from_address) = email.from_address {
                self.email.from_address = from_address;
            }
            if let Some(password_value) = email.password {
                self.email.password = secret_value(password_value);
            }
            if let Some(use_tls) = email.use_tls {
                self.email.use_tls = use_tls;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CARTWISE_MODEL_RANDOM_SEED") {
            self.model.random_seed = parse_u64("CARTWISE_MODEL_RANDOM_SEED", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MODEL_TEST_FRACTION") {
            self.model.test_fraction = parse_f64("CARTWISE_MODEL_TEST_FRACTION", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MODEL_N_ESTIMATORS") {
            self.model.n_estimators = parse_usize("CARTWISE_MODEL_N_ESTIMATORS", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MODEL_MAX_TREE_DEPTH") {
            self.model.max_tree_depth = parse_usize("CARTWISE_MODEL_MAX_TREE_DEPTH", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MODEL_CONFIDENCE_THRESHOLD") {
            self.model.confidence_threshold =
                parse_f64("CARTWISE_MODEL_CONFIDENCE_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("CARTWISE_MARKETING_HIGH_VALUE_THRESHOLD") {
            self.marketing.high_value_threshold =
                parse_u64("CARTWISE_MARKETING_HIGH_VALUE_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MARKETING_LOW_ENGAGEMENT_THRESHOLD") {
            self.marketing.low_engagement_threshold =
                parse_u64("CARTWISE_MARKETING_LOW_ENGAGEMENT_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MARKETING_HIGH_VALUE_DISCOUNT") {
            self.marketing.high_value_discount =
                parse_f64("CARTWISE_MARKETING_HIGH_VALUE_DISCOUNT", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MARKETING_REGULAR_DISCOUNT") {
            self.marketing.regular_discount =
                parse_f64("CARTWISE_MARKETING_REGULAR_DISCOUNT", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MARKETING_VOUCHER_AMOUNT") {
            self.marketing.voucher_amount =
                parse_u32("CARTWISE_MARKETING_VOUCHER_AMOUNT", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_MARKETING_MAX_RECOMMENDATIONS") {
            self.marketing.max_recommendations =
                parse_usize("CARTWISE_MARKETING_MAX_RECOMMENDATIONS", &value)?;
        }

        if let Some(value) = read_env("CARTWISE_EMAIL_HOST") {
            self.email.host = value;
        }
        if let Some(value) = read_env("CARTWISE_EMAIL_PORT") {
            self.email.port = parse_u16("CARTWISE_EMAIL_PORT", &value)?;
        }
        if let Some(value) = read_env("CARTWISE_EMAIL_FROM_ADDRESS") {
            self.email.from_address = value;
        }
        if let Some(value) = read_env("CARTWISE_EMAIL_PASSWORD") {
            self.email.password = secret_value(value);
        }
        if let Some(value) = read_env("CARTWISE_EMAIL_USE_TLS") {
            self.email.use_tls = parse_bool("CARTWISE_EMAIL_USE_TLS", &value)?;
        }

        let log_level =
            read_env("CARTWISE_LOGGING_LEVEL").or_else(|| read_env("CARTWISE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARTWISE_LOGGING_FORMAT").or_else(|| read_env("CARTWISE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(random_seed) = overrides.random_seed {
            self.model.random_seed = random_seed;
        }
        if let Some(test_fraction) = overrides.test_fraction {
            self.model.test_fraction = test_fraction;
        }
        if let Some(n_estimators) = overrides.n_estimators {
            self.model.n_estimators = n_estimators;
        }
        if let Some(confidence_threshold) = overrides.confidence_threshold {
            self.model.confidence_threshold = confidence_threshold;
        }
        if let Some(max_recommendations) = overrides.max_recommendations {
            self.marketing.max_recommendations = max_recommendations;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_model(&self.model)?;
        validate_marketing(&self.marketing)?;
        validate_email(&self.email)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cartwise.toml"), PathBuf::from("config/cartwise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_model(model: &ModelConfig) -> Result<(), ConfigError> {
    if model.test_fraction <= 0.0 || model.test_fraction >= 1.0 {
        return Err(ConfigError::Validation(
            "model.test_fraction must be strictly between 0 and 1".to_string(),
        ));
    }

    if model.n_estimators == 0 || model.n_estimators > 1000 {
        return Err(ConfigError::Validation(
            "model.n_estimators must be in range 1..=1000".to_string(),
        ));
    }

    if model.max_tree_depth == 0 || model.max_tree_depth > 64 {
        return Err(ConfigError::Validation(
            "model.max_tree_depth must be in range 1..=64".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&model.confidence_threshold) {
        return Err(ConfigError::Validation(
            "model.confidence_threshold must be in range 0.0..=1.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_marketing(marketing: &MarketingConfig) -> Result<(), ConfigError> {
    if marketing.high_value_threshold <= marketing.low_engagement_threshold {
        return Err(ConfigError::Validation(
            "marketing.high_value_threshold must be greater than marketing.low_engagement_threshold"
                .to_string(),
        ));
    }

    if !(0.0..1.0).contains(&marketing.high_value_discount) {
        return Err(ConfigError::Validation(
            "marketing.high_value_discount must be in range 0.0..1.0".to_string(),
        ));
    }

    if !(0.0..1.0).contains(&marketing.regular_discount) {
        return Err(ConfigError::Validation(
            "marketing.regular_discount must be in range 0.0..1.0".to_string(),
        ));
    }

    if marketing.voucher_amount == 0 {
        return Err(ConfigError::Validation(
            "marketing.voucher_amount must be greater than zero".to_string(),
        ));
    }

    if marketing.max_recommendations == 0 {
        return Err(ConfigError::Validation(
            "marketing.max_recommendations must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    if email.port == 0 {
        return Err(ConfigError::Validation(
            "email.port must be greater than zero".to_string(),
        ));
    }

    // Empty credentials stay valid: campaigns are planned, never delivered,
    // so the SMTP account is optional.
    let from_address = email.from_address.trim();
    if !from_address.is_empty() && !from_address.contains('@') {
        return Err(ConfigError::Validation(
            "email.from_address must be a full address containing `@`".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    model: Option<ModelPatch>,
    marketing: Option<MarketingPatch>,
    email: Option<EmailPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ModelPatch {
    random_seed: Option<u64>,
    test_fraction: Option<f64>,
    n_estimators: Option<usize>,
    max_tree_depth: Option<usize>,
    confidence_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MarketingPatch {
    high_value_threshold: Option<u64>,
    low_engagement_threshold: Option<u64>,
    high_value_discount: Option<f64>,
    regular_discount: Option<f64>,
    voucher_amount: Option<u32>,
    max_recommendations: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    host: Option<String>,
    port: Option<u16>,
    from_address: Option<String>,
    password: Option<String>,
    use_tls: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_pass_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.model.random_seed == 42, "default random seed should be 42")?;
        ensure(config.model.n_estimators == 100, "default forest size should be 100")?;
        ensure(config.marketing.voucher_amount == 200, "default voucher amount should be 200")?;
        ensure(config.email.from_address.is_empty(), "default sender address should be empty")?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SMTP_PASSWORD", "hunter2-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cartwise.toml");
            fs::write(
                &path,
                r#"
[email]
from_address = "offers@example.com"
password = "${TEST_SMTP_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.email.password.expose_secret() == "hunter2-from-env",
                "smtp password should be loaded from environment",
            )?;
            ensure(
                config.email.from_address == "offers@example.com",
                "sender address should be loaded from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SMTP_PASSWORD"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTWISE_LOG_LEVEL", "warn");
        env::set_var("CARTWISE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["CARTWISE_LOG_LEVEL", "CARTWISE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTWISE_MODEL_N_ESTIMATORS", "250");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("cartwise.toml");
            fs::write(
                &path,
                r#"
[model]
random_seed = 7
n_estimators = 50

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    random_seed: Some(99),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.model.random_seed == 99, "override random seed should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.model.n_estimators == 250,
                "env forest size should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["CARTWISE_MODEL_N_ESTIMATORS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTWISE_MODEL_TEST_FRACTION", "1.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("model.test_fraction")
            );
            ensure(has_message, "validation failure should mention model.test_fraction")
        })();

        clear_vars(&["CARTWISE_MODEL_TEST_FRACTION"]);
        result
    }

    #[test]
    fn malformed_env_override_names_the_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTWISE_MODEL_N_ESTIMATORS", "plenty");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env parse failure".to_string()),
                Err(error) => error,
            };
            let names_key = matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "CARTWISE_MODEL_N_ESTIMATORS"
            );
            ensure(names_key, "env parse failure should name the offending variable")
        })();

        clear_vars(&["CARTWISE_MODEL_N_ESTIMATORS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CARTWISE_EMAIL_PASSWORD", "smtp-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("smtp-secret-value"),
                "debug output should not contain smtp password",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["CARTWISE_EMAIL_PASSWORD"]);
        result
    }

    #[test]
    fn missing_required_file_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let missing = std::path::PathBuf::from("definitely/not/here/cartwise.toml");
        let error = match AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing file error".to_string()),
            Err(error) => error,
        };

        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref path) if *path == missing),
            "missing file error should carry the expected path",
        )
    }
}
