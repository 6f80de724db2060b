use crate::config::Branding;
use crate::utils::html::escape_html;

pub const TEST_VERIFICATION_TOKEN: &str = "test-token-123";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn verification_email(branding: &Branding, name: &str, verify_url: &str) -> EmailContent {
    let product = &branding.product_name;
    let subject = format!("Verify your {} Waitlist Registration", product);

    let text = format!(
        "Welcome to {product} Waitlist!\n\
         \n\
         Hi {name},\n\
         \n\
         Please verify your email address by clicking this link:\n\
         {url}\n\
         \n\
         This link will expire in 24 hours.\n\
         \n\
         If you didn't sign up for {product}, you can safely ignore this email.\n\
         \n\
         You're receiving this because you signed up for the {product} waitlist.\n\
         Add {support} to your contacts for future updates.\n\
         \n\
         Best regards,\n\
         The {product} Team\n",
        product = product,
        name = name,
        url = verify_url,
        support = branding.support_email,
    );

    let product_html = escape_html(product);
    let url_html = escape_html(verify_url);
    let html = format!(
        r#"<div style="font-family: 'Poppins', Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; background-color: #f8fafc;">
  <div style="background: white; border-radius: 12px; padding: 32px; box-shadow: 0 4px 6px rgba(0, 0, 0, 0.1);">
    <div style="text-align: center; margin-bottom: 32px;">
      <h1 style="color: #7c3aed; font-size: 28px; margin: 0; font-weight: 600;">{product}</h1>
      <p style="color: #64748b; margin: 8px 0 0 0;">{tagline}</p>
    </div>
    <div style="text-align: center; margin-bottom: 32px;">
      <h2 style="color: #1e293b; font-size: 24px; margin: 0 0 16px 0; font-weight: 600;">Welcome to the Waitlist, {name}!</h2>
      <p style="color: #475569; font-size: 16px; line-height: 1.6; margin: 0 0 24px 0;">
        You're one step away from getting early access to {product}.
        Please verify your email address to secure your spot on our waitlist.
      </p>
    </div>
    <div style="text-align: center; margin: 32px 0;">
      <a href="{url}" style="display: inline-block; background: linear-gradient(90deg, #7c3aed, #3b82f6); color: white; text-decoration: none; padding: 16px 32px; border-radius: 8px; font-weight: 600; font-size: 16px;">Verify My Email</a>
    </div>
    <div style="margin: 24px 0; padding: 16px; background: #f1f5f9; border-radius: 8px;">
      <p style="color: #64748b; font-size: 14px; margin: 0 0 8px 0;">Can't click the button? Copy and paste this link:</p>
      <p style="color: #7c3aed; word-break: break-all; font-size: 14px; margin: 0;">{url}</p>
    </div>
    <div style="border-top: 1px solid #e2e8f0; padding-top: 24px; margin-top: 32px;">
      <p style="color: #94a3b8; font-size: 14px; text-align: center; margin: 0 0 12px 0;">
        This verification link will expire in 24 hours.<br>
        If you didn't sign up for {product}, you can safely ignore this email.
      </p>
      <p style="color: #94a3b8; font-size: 12px; text-align: center; margin: 0;">
        You're receiving this because you signed up for the {product} waitlist.<br>
        Add {support} to your contacts for future updates.
      </p>
    </div>
  </div>
</div>"#,
        product = product_html,
        tagline = escape_html(&branding.tagline),
        name = escape_html(name),
        url = url_html,
        support = escape_html(&branding.support_email),
    );

    EmailContent {
        subject,
        text,
        html,
    }
}

pub fn test_email(branding: &Branding) -> (String, String) {
    (
        format!("Test Email from {} Waitlist", branding.product_name),
        "This is a test email to verify mail delivery is working.\n\nIf you see this, the mail provider is configured correctly!".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branding() -> Branding {
        Branding {
            product_name: "PocketCounselor".into(),
            tagline: "AI-Powered Opportunity Finder".into(),
            homepage_url: "https://pocketcounselor.org".into(),
            support_email: "hello@pocketcounselor.org".into(),
        }
    }

    #[test]
    fn verification_email_embeds_link_in_both_parts() {
        let url = "https://api.test/?action=verify&token=abc-123";
        let email = verification_email(&branding(), "Ada", url);

        assert_eq!(email.subject, "Verify your PocketCounselor Waitlist Registration");
        assert!(email.text.contains("Hi Ada,"));
        assert!(email.text.contains(url));
        assert!(email.text.contains("expire in 24 hours"));
        assert!(email.html.contains("token=abc-123"));
        assert!(email.html.contains("Welcome to the Waitlist, Ada!"));
    }

    #[test]
    fn names_are_escaped_in_html_only() {
        let email = verification_email(&branding(), "<b>Eve</b>", "https://x.test");
        assert!(email.html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(!email.html.contains("<b>Eve</b>"));
        assert!(email.text.contains("Hi <b>Eve</b>,"));
    }
}
