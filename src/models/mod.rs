pub mod signup;
pub mod stats;
pub mod waitlist_event;
