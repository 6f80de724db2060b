use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::models::signup::SignupForm;

const UNKNOWN_BROWSER: &str = "Unknown Browser";

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn browser_of(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent.filter(|ua| *ua != UNKNOWN_BROWSER) else {
        return UNKNOWN_BROWSER;
    };

    // Order matters: Chrome UAs also mention Safari, Edge UAs also mention Chrome.
    if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") {
        "Safari"
    } else if ua.contains("Edge") {
        "Edge"
    } else {
        "Other Browser"
    }
}

fn os_of(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent else {
        return "Unknown OS";
    };

    if ua.contains("Windows") {
        "Windows"
    } else if ua.contains("Mac") {
        "macOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else {
        "Unknown OS"
    }
}

/// Builds the descriptive client string stored alongside a signup:
/// `"{browser} on {os} | {screen} | {timezone} | {submitted}"`.
pub fn describe_client(form: &SignupForm, now: OffsetDateTime) -> String {
    let user_agent = non_empty(form.user_agent.as_deref());
    let screen = non_empty(form.screen_resolution.as_deref()).unwrap_or("Unknown Resolution");
    let timezone = non_empty(form.timezone.as_deref()).unwrap_or("Unknown Timezone");
    let submitted = match non_empty(form.timestamp.as_deref()) {
        Some(ts) => ts.to_string(),
        None => now.format(&Rfc3339).unwrap_or_else(|_| now.to_string()),
    };

    format!(
        "{} on {} | {} | {} | {}",
        browser_of(user_agent),
        os_of(user_agent),
        screen,
        timezone,
        submitted
    )
}
