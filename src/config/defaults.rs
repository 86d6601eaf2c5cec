use super::*;

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            installation_id: "default".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_path: "/UsermanagementAPI/api/1/Login/refreshtoken".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            customer_charge_per_day: DEFAULT_CUSTOMER_CHARGE,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,
            run_once: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "/data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/alliant_energy.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            api: ApiConfig::default(),
            pricing: PricingConfig::default(),
            poll: PollConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            timezone: "America/Chicago".to_string(),
        }
    }
}
