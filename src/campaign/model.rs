//! Campaign data model: threads, voice calls, and their classifications.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Workflow status of a campaign thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// Outreach has not begun.
    NotStarted,
    /// Calls were made and are waiting to be classified.
    VoiceCallUnclassified,
    /// Every call on the thread has a classification.
    VoiceCallClassified,
}

impl ThreadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::VoiceCallUnclassified => "voice_call_unclassified",
            Self::VoiceCallClassified => "voice_call_classified",
        }
    }
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThreadStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "voice_call_unclassified" => Ok(Self::VoiceCallUnclassified),
            "voice_call_classified" => Ok(Self::VoiceCallClassified),
            _ => Err(format!("Unknown thread status: {}", s)),
        }
    }
}

/// An outreach thread tracked through a workflow status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignThread {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ThreadStatus,
}

/// One recorded call on a thread. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceCall {
    pub id: String,
    #[serde(rename = "campaignThreadID")]
    pub campaign_thread_id: String,
    pub created_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub transcript: String,
    /// IANA timezone name, e.g. `Asia/Singapore`.
    pub time_zone: String,
}

impl VoiceCall {
    /// When the conversation happened. Falls back to the record's creation time.
    pub fn call_time(&self) -> DateTime<Utc> {
        self.called_at.unwrap_or(self.created_at)
    }
}

/// Caller intent derived from a call transcript.
///
/// Labels outside the known set are kept verbatim in [`Intent::Other`] so an
/// unexpected model answer is stored as given rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    Interested,
    NotInterested,
    ImmediateHangup,
    WrongNumber,
    NoAction,
    WantsCallBack,
    WantsEmailFollowUp,
    WantsWhatsappSmsFollowUp,
    VoiceMail,
    Unknown,
    Other(String),
}

impl Intent {
    /// Every recognised intent, in prompt order.
    pub const KNOWN: [Intent; 10] = [
        Intent::Interested,
        Intent::NotInterested,
        Intent::ImmediateHangup,
        Intent::WrongNumber,
        Intent::NoAction,
        Intent::WantsCallBack,
        Intent::WantsEmailFollowUp,
        Intent::WantsWhatsappSmsFollowUp,
        Intent::VoiceMail,
        Intent::Unknown,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Interested => "voice_interested",
            Self::NotInterested => "voice_not_interested",
            Self::ImmediateHangup => "voice_immediate_hangup",
            Self::WrongNumber => "voice_wrong_number",
            Self::NoAction => "voice_no_action",
            Self::WantsCallBack => "voice_wants_call_back",
            Self::WantsEmailFollowUp => "voice_wants_email_follow_up",
            Self::WantsWhatsappSmsFollowUp => "voice_wants_whatsapp_sms_follow_up",
            Self::VoiceMail => "voice_voice_mail",
            Self::Unknown => "voice_unknown",
            Self::Other(label) => label,
        }
    }

    /// Whether a second round-trip is needed to pull out a date/time.
    pub fn needs_datetime(&self) -> bool {
        matches!(self, Self::Interested | Self::WantsCallBack)
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::Unknown
    }
}

impl From<&str> for Intent {
    fn from(s: &str) -> Self {
        Intent::KNOWN
            .iter()
            .find(|known| known.as_str() == s)
            .cloned()
            .unwrap_or_else(|| Intent::Other(s.to_string()))
    }
}

impl From<String> for Intent {
    fn from(s: String) -> Self {
        Intent::from(s.as_str())
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.as_str().to_string()
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored outcome of classifying one voice call.
///
/// `interested_time` is only set for [`Intent::Interested`] and `call_back_time`
/// only for [`Intent::WantsCallBack`]. Both keep the call's local UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub id: String,
    #[serde(rename = "campaignThreadID")]
    pub campaign_thread_id: String,
    /// Source call. `None` for rows written before calls were linked.
    #[serde(skip)]
    pub voice_call_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub interested_time: Option<DateTime<FixedOffset>>,
    pub call_back_time: Option<DateTime<FixedOffset>>,
    pub intent: Intent,
}

/// Insert parameters for a classification row; the caller picks the id.
#[derive(Debug, Clone)]
pub struct NewClassification {
    pub id: String,
    pub campaign_thread_id: String,
    pub voice_call_id: Option<String>,
    pub intent: Intent,
    pub interested_time: Option<DateTime<FixedOffset>>,
    pub call_back_time: Option<DateTime<FixedOffset>>,
}
