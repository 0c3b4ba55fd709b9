use serde::{Deserialize, Serialize};
use shared::events;
use std::fmt;

/// Delivery channel of a 2FA challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChallengeKind {
    #[serde(rename = "2fa_app")]
    App,
    #[serde(rename = "2fa_otp_phone")]
    OtpPhone,
    #[serde(rename = "2fa_otp_whatsapp")]
    OtpWhatsapp,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 3] = [Self::App, Self::OtpPhone, Self::OtpWhatsapp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "2fa_app",
            Self::OtpPhone => "2fa_otp_phone",
            Self::OtpWhatsapp => "2fa_otp_whatsapp",
        }
    }

    /// Inbound event that carries responses of this kind
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::App => events::RESPONSE_2FA_APP,
            Self::OtpPhone => events::RESPONSE_2FA_OTP_PHONE,
            Self::OtpWhatsapp => events::RESPONSE_2FA_OTP_WHATSAPP,
        }
    }

    pub fn from_event_name(event: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.event_name() == event)
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
