use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cartwise_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run(config_path: Option<PathBuf>) -> String {
    let options = LoadOptions {
        require_file: config_path.is_some(),
        config_path: config_path.clone(),
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path(config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_keys: &[&str]| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push(
        "model.random_seed",
        &config.model.random_seed.to_string(),
        &["CARTWISE_MODEL_RANDOM_SEED"],
    );
    push(
        "model.test_fraction",
        &config.model.test_fraction.to_string(),
        &["CARTWISE_MODEL_TEST_FRACTION"],
    );
    push(
        "model.n_estimators",
        &config.model.n_estimators.to_string(),
        &["CARTWISE_MODEL_N_ESTIMATORS"],
    );
    push(
        "model.max_tree_depth",
        &config.model.max_tree_depth.to_string(),
        &["CARTWISE_MODEL_MAX_TREE_DEPTH"],
    );
    push(
        "model.confidence_threshold",
        &config.model.confidence_threshold.to_string(),
        &["CARTWISE_MODEL_CONFIDENCE_THRESHOLD"],
    );

    push(
        "marketing.high_value_threshold",
        &config.marketing.high_value_threshold.to_string(),
        &["CARTWISE_MARKETING_HIGH_VALUE_THRESHOLD"],
    );
    push(
        "marketing.low_engagement_threshold",
        &config.marketing.low_engagement_threshold.to_string(),
        &["CARTWISE_MARKETING_LOW_ENGAGEMENT_THRESHOLD"],
    );
    push(
        "marketing.high_value_discount",
        &config.marketing.high_value_discount.to_string(),
        &["CARTWISE_MARKETING_HIGH_VALUE_DISCOUNT"],
    );
    push(
        "marketing.regular_discount",
        &config.marketing.regular_discount.to_string(),
        &["CARTWISE_MARKETING_REGULAR_DISCOUNT"],
    );
    push(
        "marketing.voucher_amount",
        &config.marketing.voucher_amount.to_string(),
        &["CARTWISE_MARKETING_VOUCHER_AMOUNT"],
    );
    push(
        "marketing.max_recommendations",
        &config.marketing.max_recommendations.to_string(),
        &["CARTWISE_MARKETING_MAX_RECOMMENDATIONS"],
    );

    push("email.host", &config.email.host, &["CARTWISE_EMAIL_HOST"]);
    push("email.port", &config.email.port.to_string(), &["CARTWISE_EMAIL_PORT"]);
    push("email.from_address", &config.email.from_address, &["CARTWISE_EMAIL_FROM_ADDRESS"]);
    let password = if config.email.password.expose_secret().trim().is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    };
    push("email.password", password, &["CARTWISE_EMAIL_PASSWORD"]);
    push("email.use_tls", &config.email.use_tls.to_string(), &["CARTWISE_EMAIL_USE_TLS"]);

    push(
        "logging.level",
        &config.logging.level,
        &["CARTWISE_LOGGING_LEVEL", "CARTWISE_LOG_LEVEL"],
    );
    push(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["CARTWISE_LOGGING_FORMAT", "CARTWISE_LOG_FORMAT"],
    );

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("cartwise.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/cartwise.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    for env_key in env_keys {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
