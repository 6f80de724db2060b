pub mod email_templates;
pub mod maintenance;
pub mod pluggable_mailer;
pub mod sendgrid_mailer;
pub mod smtp_mailer;
pub mod waitlist;
