//! Guardian linking and alert fan-out.
//!
//! A protected user issues a short-lived OTP; a guardian redeems it to form
//! an active link. Severe scans then fan out one alert per link, gated by
//! the protected user's threshold, with best-effort push notification.

mod alerts;
mod link;
mod notify;

pub use alerts::{AlertView, GuardianAlertService};
pub use link::{GuardianLinkService, OtpIssued, VerifyOutcome, OTP_TTL, OTP_TTL_MINUTES};
pub use notify::{
    scam_alert_message, test_alert_message, AlertTransport, CallMeBotTransport, GuardianContact,
    NullTransport, NOTIFY_TIMEOUT_SECS,
};
