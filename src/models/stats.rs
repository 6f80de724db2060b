use serde::Serialize;
use time::OffsetDateTime;

use super::signup::SignupStatus;

/// Percentage with one decimal place, or `0%` when there is nothing to divide by.
pub fn format_rate(part: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", (part as f64 / total as f64) * 100.0)
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicStats {
    pub total_signups: usize,
    pub verified_emails: usize,
    pub verification_rate: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentSignup {
    pub name: String,
    pub email: String,
    pub status: SignupStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistSummary {
    pub total_emails: usize,
    pub verified_emails: usize,
    pub unverified_emails: usize,
    pub verification_rate: String,
    #[serde(rename = "recentSignups24h")]
    pub recent_signups_24h: usize,
    pub recent_signups_list: Vec<RecentSignup>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub new_signups: usize,
    pub new_verifications: usize,
    pub weekly_verification_rate: String,
    pub total_signups: usize,
    pub total_verified: usize,
    pub overall_verification_rate: String,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub text: String,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchEntry {
    pub name: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub verified_at: Option<OffsetDateTime>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchList {
    pub count: usize,
    pub emails: Vec<LaunchEntry>,
    pub csv_format: String,
}

#[cfg(test)]
mod tests {
    use super::format_rate;

    #[test]
    fn rate_has_one_decimal() {
        assert_eq!(format_rate(3, 10), "30.0%");
        assert_eq!(format_rate(1, 3), "33.3%");
        assert_eq!(format_rate(2, 3), "66.7%");
        assert_eq!(format_rate(5, 5), "100.0%");
    }

    #[test]
    fn rate_without_signups_is_zero() {
        assert_eq!(format_rate(0, 0), "0%");
    }
}
