//! The facts extracted from a verified leaf certificate and how they print.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Expiration countdown and identity of a verified leaf certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateReport {
    /// Subject distinguished name, most specific attribute first
    pub subject: String,
    /// First CN attribute of the subject, empty when there is none
    pub common_name: String,
    /// DNS-name subject alternative names, in certificate order
    pub sans: Vec<String>,
    pub not_after: DateTime<Utc>,
    /// Whole days until `not_after`, negative once expired
    pub days_remaining: i64,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl CertificateReport {
    /// Renders the report for stdout.
    ///
    /// In text mode without `debug` only the day count is printed.
    pub fn render(&self, format: OutputFormat, debug: bool) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self),
            OutputFormat::Text if debug => Ok(self.render_details()),
            OutputFormat::Text => Ok(self.days_remaining.to_string()),
        }
    }

    fn render_details(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Certificate expiration date: {}\n", self.not_after));
        out.push_str(&format!("Certificate subject: {}\n", self.subject));
        out.push_str(&format!("Common Name (CN): {}\n", self.common_name));
        out.push_str("Subject Alternative Names:\n");
        if self.sans.is_empty() {
            out.push_str("\tNone\n");
        }
        for san in &self.sans {
            out.push_str(&format!("\t{}\n", san));
        }
        out.push_str(&format!(
            "Days left until the certificate expires: {}",
            self.days_remaining
        ));
        out
    }
}
