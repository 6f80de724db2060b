use crate::config::Branding;
use crate::utils::html::escape_html;

struct Page<'a> {
    title: &'a str,
    background: &'a str,
    badge_color: &'a str,
    badge: &'a str,
    heading: String,
    heading_color: &'a str,
    body: String,
    footer: Option<String>,
}

fn render(branding: &Branding, page: Page<'_>) -> String {
    let product = escape_html(&branding.product_name);
    let footer = page
        .footer
        .map(|text| {
            format!(
                r#"<p style="color: #9ca3af; font-size: 14px; margin: 0;">{}</p>"#,
                text
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title} - {product}</title>
  <link href="https://fonts.googleapis.com/css2?family=Poppins:wght@400;500;600;700&display=swap" rel="stylesheet">
</head>
<body style="margin: 0; padding: 20px; font-family: 'Poppins', Arial, sans-serif; background: {background}; min-height: 100vh; display: flex; align-items: center; justify-content: center;">
  <div style="background: white; border-radius: 20px; padding: 40px; max-width: 500px; width: 100%; box-shadow: 0 20px 40px rgba(0,0,0,0.1); text-align: center;">
    <div style="background: {badge_color}; color: white; padding: 20px; border-radius: 50%; width: 80px; height: 80px; margin: 0 auto 24px; display: flex; align-items: center; justify-content: center; font-size: 24px; font-weight: bold;">{badge}</div>
    <h1 style="color: {heading_color}; margin-bottom: 16px; font-size: 26px; font-weight: 600;">{heading}</h1>
    <p style="color: #6b7280; margin-bottom: 24px; font-size: 16px; line-height: 1.6;">{body}</p>
    <a href="{homepage}" style="display: inline-block; padding: 12px 24px; background: linear-gradient(90deg, #7c3aed, #3b82f6); color: white; text-decoration: none; border-radius: 8px; font-weight: 600; margin-bottom: 16px;">Return to {product}</a>
    {footer}
  </div>
</body>
</html>"#,
        title = page.title,
        product = product,
        background = page.background,
        badge_color = page.badge_color,
        badge = page.badge,
        heading_color = page.heading_color,
        heading = page.heading,
        body = page.body,
        homepage = escape_html(&branding.homepage_url),
        footer = footer,
    )
}

pub fn verified_page(branding: &Branding, name: &str) -> String {
    let product = escape_html(&branding.product_name);
    render(
        branding,
        Page {
            title: "Email Verified",
            background: "linear-gradient(135deg, #667eea 0%, #764ba2 100%)",
            badge_color: "linear-gradient(90deg, #10b981, #3b82f6)",
            badge: "&#10003;",
            heading: format!("Welcome to the Waitlist, {}!", escape_html(name)),
            heading_color: "#1e293b",
            body: format!(
                "Your email has been verified successfully! You're now on the {} waitlist \
                 and will be among the first to know when we launch.",
                product
            ),
            footer: Some("Follow us on social media for updates and sneak peeks!".into()),
        },
    )
}

pub fn already_verified_page(branding: &Branding, name: &str) -> String {
    render(
        branding,
        Page {
            title: "Already Verified",
            background: "linear-gradient(135deg, #ffecd2 0%, #fcb69f 100%)",
            badge_color: "#059669",
            badge: "&#10003;",
            heading: "Already Verified!".into(),
            heading_color: "#059669",
            body: format!(
                "Hi {}! Your email was already verified. You're all set on the waitlist!",
                escape_html(name)
            ),
            footer: None,
        },
    )
}

pub fn invalid_link_page(branding: &Branding) -> String {
    render(
        branding,
        Page {
            title: "Invalid Link",
            background: "linear-gradient(135deg, #ff9a9e 0%, #fecfef 100%)",
            badge_color: "#dc2626",
            badge: "!",
            heading: "Invalid or Expired Link".into(),
            heading_color: "#dc2626",
            body: "This verification link is invalid or has expired. \
                   Please sign up again to join our waitlist."
                .into(),
            footer: Some(format!(
                "Need help? Contact us at {}",
                escape_html(&branding.support_email)
            )),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn pages_escape_names_and_link_home() {
        let branding = Config::test_config().branding;

        let page = verified_page(&branding, "<script>x</script>");
        assert!(page.contains("Welcome to the Waitlist, &lt;script&gt;"));
        assert!(page.contains("href=\"http://localhost:5173\""));

        let page = already_verified_page(&branding, "Ada");
        assert!(page.contains("Hi Ada! Your email was already verified."));

        let page = invalid_link_page(&branding);
        assert!(page.contains("Invalid or Expired Link"));
        assert!(page.contains("hello@pocketcounselor.org"));
    }
}
