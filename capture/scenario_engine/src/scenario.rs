use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ParseLabelError;

/// Industry a scenario is written for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    /// Plumbing contractors.
    Plumbing,
    /// Dental practices.
    Dental,
    /// Heating and air conditioning.
    Hvac,
    /// Auto repair shops.
    Auto,
    /// Law firms.
    Law,
    /// Any other small business.
    General,
}

impl BusinessType {
    /// Every business type in display order.
    pub const ALL: [Self; 6] = [
        Self::Plumbing,
        Self::Dental,
        Self::Hvac,
        Self::Auto,
        Self::Law,
        Self::General,
    ];

    /// Machine key, identical to the serialized form.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Plumbing => "plumbing",
            Self::Dental => "dental",
            Self::Hvac => "hvac",
            Self::Auto => "auto",
            Self::Law => "law",
            Self::General => "general",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plumbing => "Plumbing",
            Self::Dental => "Dental",
            Self::Hvac => "HVAC",
            Self::Auto => "Automotive",
            Self::Law => "Law Firm",
            Self::General => "General",
        }
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BusinessType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted || kind.label().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ParseLabelError::new("business type", s))
    }
}

/// Kind of call a scenario demonstrates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioCategory {
    /// Urgent problem that needs dispatch.
    Emergency,
    /// Ordinary service request.
    Routine,
    /// Price questions and objections.
    Pricing,
    /// Booking and rescheduling.
    Scheduling,
    /// Unhappy customer.
    Complaint,
    /// Call outside business hours.
    AfterHours,
}

impl ScenarioCategory {
    /// Every category in display order.
    pub const ALL: [Self; 6] = [
        Self::Emergency,
        Self::Routine,
        Self::Pricing,
        Self::Scheduling,
        Self::Complaint,
        Self::AfterHours,
    ];

    /// Machine key, identical to the serialized form.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::Routine => "routine",
            Self::Pricing => "pricing",
            Self::Scheduling => "scheduling",
            Self::Complaint => "complaint",
            Self::AfterHours => "after_hours",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Emergency => "Emergency",
            Self::Routine => "Routine Service",
            Self::Pricing => "Pricing Inquiry",
            Self::Scheduling => "Scheduling",
            Self::Complaint => "Complaint",
            Self::AfterHours => "After Hours",
        }
    }
}

impl fmt::Display for ScenarioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScenarioCategory {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted || kind.label().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ParseLabelError::new("category", s))
    }
}

/// Who is talking in a transcript turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The person phoning the business.
    #[serde(alias = "Caller")]
    Caller,
    /// The AI receptionist.
    #[serde(alias = "AI", alias = "ai")]
    Agent,
}

impl Speaker {
    /// Short label for transcripts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Caller => "Caller",
            Self::Agent => "AI",
        }
    }
}

/// Tone the author attached to a line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Emotion {
    Neutral,
    Frustrated,
    Relieved,
    Curious,
    Urgent,
    Happy,
}

/// One scripted turn of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptMessage {
    /// Speaker role.
    pub speaker: Speaker,
    /// Full text revealed by the typewriter.
    pub text: String,
    /// Authored pause before this message starts, overriding the computed gap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Call clock label shown next to the bubble (e.g. `0:13`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Optional tone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
    /// CRM fields filled in once this message has been fully revealed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<CrmCapture>,
}

impl TranscriptMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            delay_ms: None,
            timestamp: None,
            emotion: None,
            captures: Vec::new(),
        }
    }

    /// Caller line.
    #[must_use]
    pub fn caller(text: impl Into<String>) -> Self {
        Self::new(Speaker::Caller, text)
    }

    /// Agent line.
    #[must_use]
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Speaker::Agent, text)
    }

    /// Sets the authored pause before this message.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets the call clock label.
    #[must_use]
    pub fn at(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Sets the tone.
    #[must_use]
    pub const fn feeling(mut self, emotion: Emotion) -> Self {
        self.emotion = Some(emotion);
        self
    }

    /// Fills `field` with `value` once this message finishes.
    #[must_use]
    pub fn capture(mut self, field: CrmField, value: impl Into<String>) -> Self {
        self.captures.push(CrmCapture {
            field,
            value: value.into(),
        });
        self
    }

    /// Authored pause, if any.
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(Duration::from_millis)
    }
}

/// One CRM form field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CrmField {
    /// Caller name.
    Name,
    /// Callback number.
    Phone,
    /// Requested service.
    Service,
    /// Follow-up urgency.
    Urgency,
    /// Booked slot or promised arrival.
    #[serde(alias = "appointment_time")]
    Appointment,
}

impl CrmField {
    /// Every field in form order.
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::Phone,
        Self::Service,
        Self::Urgency,
        Self::Appointment,
    ];

    /// Form label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Phone => "Phone",
            Self::Service => "Service",
            Self::Urgency => "Urgency",
            Self::Appointment => "Appointment",
        }
    }
}

/// A CRM value the agent picks up from one message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrmCapture {
    /// Field being filled.
    pub field: CrmField,
    /// Value written into it.
    pub value: String,
}

/// Caller intent recognized during the call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Intent {
    Emergency,
    ServiceRequest,
    Inquiry,
    Schedule,
    Pricing,
    Complaint,
    General,
}

impl Intent {
    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::ServiceRequest => "service request",
            Self::Inquiry => "inquiry",
            Self::Schedule => "schedule",
            Self::Pricing => "pricing",
            Self::Complaint => "complaint",
            Self::General => "general",
        }
    }
}

/// How soon the lead needs follow-up.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// CRM fields the agent captured during the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrmFields {
    /// Caller name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Callback number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Requested service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Follow-up urgency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    /// Booked slot or promised arrival.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_time: Option<String>,
}

/// Scripted result shown once playback completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Outcome {
    /// Lead quality from 0 to 10.
    pub lead_score: u8,
    /// Recognized intent.
    pub intent: Intent,
    /// Headline such as "Emergency Service Dispatched".
    pub action_taken: String,
    /// Captured CRM fields.
    #[serde(default)]
    pub crm_fields: CrmFields,
}

impl Outcome {
    /// Creates an outcome with no CRM fields; the score is capped at 10.
    #[must_use]
    pub fn new(lead_score: u8, intent: Intent, action_taken: impl Into<String>) -> Self {
        Self {
            lead_score: lead_score.min(10),
            intent,
            action_taken: action_taken.into(),
            crm_fields: CrmFields::default(),
        }
    }

    /// Sets the caller name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.crm_fields.name = Some(name.into());
        self
    }

    /// Sets the callback number.
    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.crm_fields.phone = Some(phone.into());
        self
    }

    /// Sets the requested service.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.crm_fields.service = Some(service.into());
        self
    }

    /// Sets the urgency.
    #[must_use]
    pub const fn urgency(mut self, urgency: Urgency) -> Self {
        self.crm_fields.urgency = Some(urgency);
        self
    }

    /// Sets the appointment time.
    #[must_use]
    pub fn appointment(mut self, when: impl Into<String>) -> Self {
        self.crm_fields.appointment_time = Some(when.into());
        self
    }

    /// Value of one CRM field as displayed.
    #[must_use]
    pub fn value_of(&self, field: CrmField) -> Option<String> {
        let crm = &self.crm_fields;
        match field {
            CrmField::Name => crm.name.clone(),
            CrmField::Phone => crm.phone.clone(),
            CrmField::Service => crm.service.clone(),
            CrmField::Urgency => crm.urgency.map(|u| u.label().to_string()),
            CrmField::Appointment => crm.appointment_time.clone(),
        }
    }

    /// Captured CRM fields as ordered `(label, value)` pairs, skipping empty ones.
    #[must_use]
    pub fn facts(&self) -> Vec<(&'static str, String)> {
        CrmField::ALL
            .into_iter()
            .filter_map(|field| self.value_of(field).map(|v| (field.label(), v)))
            .collect()
    }
}

/// Immutable scripted demo conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    /// Stable identifier (e.g. `plumbing-emergency`).
    pub id: String,
    /// Card title.
    pub title: String,
    /// Industry.
    pub business_type: BusinessType,
    /// Kind of call.
    pub category: ScenarioCategory,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Who is calling and in what mood.
    #[serde(default)]
    pub caller_persona: String,
    /// Nominal call length label (e.g. `1:52`).
    #[serde(default)]
    pub duration: String,
    /// Ordered turns.
    #[serde(default)]
    pub transcript: Vec<TranscriptMessage>,
    /// Result shown after playback.
    pub outcome: Outcome,
}

impl Scenario {
    /// Starts a scenario definition with an empty transcript and a neutral outcome.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        business_type: BusinessType,
        category: ScenarioCategory,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            business_type,
            category,
            description: String::new(),
            caller_persona: String::new(),
            duration: String::new(),
            transcript: Vec::new(),
            outcome: Outcome::new(0, Intent::General, "Call Logged"),
        }
    }

    /// Sets description, caller persona and call length label.
    #[must_use]
    pub fn describe(
        mut self,
        description: impl Into<String>,
        caller_persona: impl Into<String>,
        duration: impl Into<String>,
    ) -> Self {
        self.description = description.into();
        self.caller_persona = caller_persona.into();
        self.duration = duration.into();
        self
    }

    /// Replaces the transcript.
    #[must_use]
    pub fn with_transcript(mut self, transcript: Vec<TranscriptMessage>) -> Self {
        self.transcript = transcript;
        self
    }

    /// Replaces the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Attaches outcome values to the messages that reveal them, as
    /// `(field, message index)` pairs. Fields the outcome leaves empty and
    /// indices past the transcript are ignored.
    #[must_use]
    pub fn capture_fields(mut self, placements: &[(CrmField, usize)]) -> Self {
        for &(field, index) in placements {
            let Some(value) = self.outcome.value_of(field) else {
                continue;
            };
            if let Some(message) = self.transcript.get_mut(index) {
                message.captures.push(CrmCapture { field, value });
            }
        }
        self
    }

    /// Every capture in reveal order with the index of its message.
    pub fn captures(&self) -> impl Iterator<Item = (usize, &CrmCapture)> + '_ {
        self.transcript
            .iter()
            .enumerate()
            .flat_map(|(index, message)| message.captures.iter().map(move |c| (index, c)))
    }

    /// Number of scripted turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    /// Whether the transcript has no turns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }
}
