use std::env;

pub const DEFAULT_JWT_SECRET: &str = "change-me-to-a-secure-random-string";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub app_env: String,
    pub cors_origins: Vec<String>,
    /// Lowercased emails of platform operators. Operators manage shared
    /// data (sports, demo requests); organization admins do not.
    pub operator_emails: Vec<String>,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub mail: MailConfig,
    pub storage: StorageConfig,
    pub import: ImportConfig,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub access_expiry_secs: i64,
    pub refresh_expiry_secs: i64,
}

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
    pub form_submit_max: u32,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub api_key: String,
    pub domain: String,
    pub api_base: String,
    pub from: String,
    pub notify_to: String,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// `None` keeps fallback records in memory only.
    pub fallback_path: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ImportConfig {
    pub upload_chunk_size: usize,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env_or_parse("PORT", 3000),
            app_env: env_or("APP_ENV", "development"),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            operator_emails: env_or("OPERATOR_EMAILS", "")
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "nil_tracker"),
                user: env_or("DB_USER", "postgres"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 1),
                pool_max: env_or_parse("DB_POOL_MAX", 10),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", DEFAULT_JWT_SECRET),
                access_expiry_secs: parse_duration_to_secs(&env_or("JWT_ACCESS_EXPIRY", "1h")),
                refresh_expiry_secs: parse_duration_to_secs(&env_or("JWT_REFRESH_EXPIRY", "30d")),
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: env_or_parse("RATE_LIMIT_MAX", 300),
                form_submit_max: env_or_parse("RATE_LIMIT_FORMS", 5),
            },
            mail: MailConfig {
                api_key: env_or("MAIL_API_KEY", ""),
                domain: env_or("MAIL_DOMAIN", ""),
                api_base: env_or("MAIL_API_BASE", "https://api.mailgun.net"),
                from: env_or("MAIL_FROM", "NIL Tracker <no-reply@niltracker.app>"),
                notify_to: env_or("MAIL_NOTIFY_TO", ""),
            },
            storage: StorageConfig {
                fallback_path: env::var("FALLBACK_STORE_PATH")
                    .ok()
                    .filter(|s| !s.is_empty())
                    .or_else(|| Some("data/fallback.json".to_string())),
            },
            import: ImportConfig {
                upload_chunk_size: env_or_parse("UPLOAD_CHUNK_SIZE", 100usize).max(1),
            },
        }
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    pub fn is_operator(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.operator_emails.iter().any(|o| *o == email)
    }

    /// Names of the environment variables the debug probe reports on.
    pub const PROBED_ENV_VARS: &'static [&'static str] = &[
        "DATABASE_URL",
        "JWT_SECRET",
        "MAIL_API_KEY",
        "MAIL_DOMAIN",
        "MAIL_FROM",
        "MAIL_NOTIFY_TO",
        "FALLBACK_STORE_PATH",
        "CORS_ORIGINS",
        "OPERATOR_EMAILS",
    ];
}

pub fn parse_duration_to_secs(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        return 3600;
    }
    let Some(unit) = s.chars().last() else {
        return 3600;
    };
    let num_str = &s[..s.len() - unit.len_utf8()];
    let num: i64 = match num_str.parse() {
        Ok(n) => n,
        Err(_) => return s.parse().unwrap_or(3600),
    };
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        _ => return s.parse().unwrap_or(3600),
    };
    num.checked_mul(scale).unwrap_or(3600)
}

#[cfg(test)]
impl Config {
    /// Defaults used by unit and router tests; never touches the environment.
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            app_env: "test".to_string(),
            cors_origins: vec![],
            operator_emails: vec!["ops@niltracker.app".to_string()],
            db: DbConfig {
                host: "localhost".to_string(),
                port: 5432,
                database: "nil_tracker_test".to_string(),
                user: "postgres".to_string(),
                password: String::new(),
                pool_min: 0,
                pool_max: 1,
            },
            jwt: JwtConfig {
                secret: "test-secret".to_string(),
                access_expiry_secs: 3600,
                refresh_expiry_secs: 86400,
            },
            rate_limit: RateLimitConfig {
                window_secs: 60,
                max_requests: 1000,
                form_submit_max: 2,
            },
            mail: MailConfig {
                api_key: String::new(),
                domain: String::new(),
                api_base: "http://127.0.0.1:9".to_string(),
                from: "test@example.com".to_string(),
                notify_to: String::new(),
            },
            storage: StorageConfig { fallback_path: None },
            import: ImportConfig {
                upload_chunk_size: 100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration_to_secs("45s"), 45);
        assert_eq!(parse_duration_to_secs("15m"), 900);
        assert_eq!(parse_duration_to_secs("2h"), 7200);
        assert_eq!(parse_duration_to_secs("30d"), 2_592_000);
    }

    #[test]
    fn bare_numbers_are_seconds_and_garbage_defaults() {
        assert_eq!(parse_duration_to_secs("120"), 120);
        assert_eq!(parse_duration_to_secs(""), 3600);
        assert_eq!(parse_duration_to_secs("soon"), 3600);
    }

    #[test]
    fn overflowing_durations_fall_back_to_an_hour() {
        assert_eq!(parse_duration_to_secs("9223372036854775807d"), 3600);
        assert_eq!(parse_duration_to_secs("200000000000000000h"), 3600);
    }

    #[test]
    fn operator_match_ignores_case_and_whitespace() {
        let config = Config::for_tests();
        assert!(config.is_operator(" Ops@NILTracker.app "));
        assert!(!config.is_operator("casey@state.edu"));
    }
}
