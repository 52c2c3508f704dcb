//! Settings validation utilities

use crate::schema::ServiceSettings;

pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
pub const VALID_LOG_FORMATS: [&str; 2] = ["json", "pretty"];

/// Settings validator
pub struct SettingsValidator;

impl SettingsValidator {
    /// Validate complete settings
    pub fn validate(settings: &ServiceSettings) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_server(settings, &mut report);
        Self::validate_store(settings, &mut report);
        Self::validate_logging(settings, &mut report);

        report
    }

    fn validate_server(settings: &ServiceSettings, report: &mut ValidationReport) {
        let server = &settings.server;

        if server.host.is_empty() {
            report.add_error("server.host", "Server host cannot be empty");
        }

        if server.port == 0 {
            report.add_error("server.port", "Server port cannot be 0");
        } else if server.port < 1024 {
            report.add_warning("server.port", "Server port is below 1024, may require elevated privileges");
        }

        if server.request_timeout_seconds == 0 {
            report.add_error("server.request_timeout_seconds", "Request timeout cannot be 0");
        } else if server.request_timeout_seconds > 300 {
            report.add_error("server.request_timeout_seconds", "Request timeout cannot exceed 300 seconds");
        }

        if server.max_body_size == 0 {
            report.add_error("server.max_body_size", "Max body size cannot be 0");
        } else if server.max_body_size > 1024 * 1024 {
            report.add_warning("server.max_body_size", "Max body size is greater than 1MB");
        }

        if !server.cors_enabled {
            report.add_warning("server.cors_enabled", "CORS is disabled, browser clients on other origins will be refused");
        }
    }

    fn validate_store(settings: &ServiceSettings, report: &mut ValidationReport) {
        if let Some(ref path) = settings.store.config_path {
            if path.as_os_str().is_empty() {
                report.add_error("store.config_path", "Config path cannot be empty when set");
            } else if path.is_dir() {
                report.add_error("store.config_path", "Config path points to a directory");
            } else if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                report.add_warning("store.config_path", "Config path does not end in .json");
            }
        }
    }

    fn validate_logging(settings: &ServiceSettings, report: &mut ValidationReport) {
        let logging = &settings.logging;

        if !VALID_LOG_LEVELS.contains(&logging.level.as_str()) {
            report.add_error(
                "logging.level",
                &format!("Invalid log level: {}. Valid levels: {:?}", logging.level, VALID_LOG_LEVELS),
            );
        }

        if !VALID_LOG_FORMATS.contains(&logging.format.as_str()) {
            report.add_error(
                "logging.format",
                &format!("Invalid log format: {}. Valid formats: {:?}", logging.format, VALID_LOG_FORMATS),
            );
        }

        if logging.level == "trace" || logging.level == "debug" {
            report.add_warning("logging.level", "Debug/trace logging may include request bodies");
        }
    }
}

/// Validation report containing errors and warnings
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ReportIssue>,
    pub warnings: Vec<ReportIssue>,
}

/// A validation issue (error or warning)
#[derive(Debug, Clone)]
pub struct ReportIssue {
    pub field: String,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ReportIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ReportIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn summary(&self) -> String {
        format!("Validation: {} errors, {} warnings", self.errors.len(), self.warnings.len())
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}
