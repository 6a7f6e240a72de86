use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// Server-assigned identifier for jobs and contacts.
///
/// Opaque to the client: whatever number or string the server sent is kept
/// as-is and only ever compared or rendered into a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(Number),
    Text(String),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Text(s) => f.write_str(s),
            // `7.0` on the wire addresses the same record as `7`.
            Id::Number(n) => match n.as_f64() {
                Some(x) if n.is_f64() && x.fract() == 0.0 && x.abs() < 1e15 => {
                    write!(f, "{}", x as i64)
                }
                _ => write!(f, "{}", n),
            },
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n.into())
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Applied,
    Interviewing,
    Offer,
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Offer,
        JobStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interviewing => "Interviewing",
            JobStatus::Offer => "Offer",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Invalid status '{}'. Must be one of: Applied, Interviewing, Offer, Rejected",
                    s
                )
            })
    }
}

/// Local-only record of how a row relates to the server copy.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Synced,
    Pending,
    Diverged(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Option<Id>,
    pub name: String,
    pub role: String,
    pub email: String,
    #[serde(skip)]
    pub sync: SyncStatus,
    #[serde(skip)]
    pub revision: u64,
    /// Client-generated key carried by a contact that is still being created.
    #[serde(skip)]
    pub temp_key: Option<u64>,
}

impl Contact {
    pub fn placeholder(temp_key: u64) -> Self {
        Contact {
            id: None,
            name: String::new(),
            role: String::new(),
            email: String::new(),
            sync: SyncStatus::Pending,
            revision: 0,
            temp_key: Some(temp_key),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn set(&mut self, field: ContactField, value: &str) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::Role => &mut self.role,
            ContactField::Email => &mut self.email,
        };
        *slot = value.to_string();
        self.revision += 1;
    }

    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Role => &self.role,
            ContactField::Email => &self.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Option<Id>,
    pub company: String,
    pub role: String,
    pub status: JobStatus,
    pub applied_on: String,
    pub location: String,
    pub platform: String,
    pub resume: String,
    pub follow_up: String,
    pub interview_date: String,
    pub job_link: String,
    pub feedback: String,
    pub contacts: Vec<Contact>,
    #[serde(skip)]
    pub sync: SyncStatus,
    #[serde(skip)]
    pub revision: u64,
}

impl Job {
    /// The blank template submitted when the user adds a row.
    pub fn blank() -> Self {
        Job {
            id: None,
            company: String::new(),
            role: String::new(),
            status: JobStatus::Applied,
            applied_on: String::new(),
            location: String::new(),
            platform: String::new(),
            resume: String::new(),
            follow_up: String::new(),
            interview_date: String::new(),
            job_link: String::new(),
            feedback: String::new(),
            contacts: Vec::new(),
            sync: SyncStatus::Synced,
            revision: 0,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Writes a single field. `value` must already be valid for `field`.
    pub fn set(&mut self, field: JobField, value: &str) -> Result<(), String> {
        let slot = match field {
            JobField::Status => {
                self.status = value.parse()?;
                self.revision += 1;
                return Ok(());
            }
            JobField::Company => &mut self.company,
            JobField::Role => &mut self.role,
            JobField::AppliedOn => &mut self.applied_on,
            JobField::Location => &mut self.location,
            JobField::Platform => &mut self.platform,
            JobField::Resume => &mut self.resume,
            JobField::FollowUp => &mut self.follow_up,
            JobField::InterviewDate => &mut self.interview_date,
            JobField::JobLink => &mut self.job_link,
            JobField::Feedback => &mut self.feedback,
        };
        *slot = value.to_string();
        self.revision += 1;
        Ok(())
    }

    pub fn get(&self, field: JobField) -> &str {
        match field {
            JobField::Company => &self.company,
            JobField::Role => &self.role,
            JobField::Status => self.status.as_str(),
            JobField::AppliedOn => &self.applied_on,
            JobField::Location => &self.location,
            JobField::Platform => &self.platform,
            JobField::Resume => &self.resume,
            JobField::FollowUp => &self.follow_up,
            JobField::InterviewDate => &self.interview_date,
            JobField::JobLink => &self.job_link,
            JobField::Feedback => &self.feedback,
        }
    }
}

/// Editable job columns, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobField {
    Company,
    Role,
    Status,
    AppliedOn,
    Location,
    Platform,
    Resume,
    FollowUp,
    InterviewDate,
    JobLink,
    Feedback,
}

impl JobField {
    pub const ALL: [JobField; 11] = [
        JobField::Company,
        JobField::Role,
        JobField::Status,
        JobField::AppliedOn,
        JobField::Location,
        JobField::Platform,
        JobField::Resume,
        JobField::FollowUp,
        JobField::InterviewDate,
        JobField::JobLink,
        JobField::Feedback,
    ];

    pub fn wire_name(&self) -> &'static str {
        match self {
            JobField::Company => "company",
            JobField::Role => "role",
            JobField::Status => "status",
            JobField::AppliedOn => "appliedOn",
            JobField::Location => "location",
            JobField::Platform => "platform",
            JobField::Resume => "resume",
            JobField::FollowUp => "followUp",
            JobField::InterviewDate => "interviewDate",
            JobField::JobLink => "jobLink",
            JobField::Feedback => "feedback",
        }
    }

    /// Column heading used by the jobs table.
    pub fn label(&self) -> &'static str {
        match self {
            JobField::Company => "Company",
            JobField::Role => "Role",
            JobField::Status => "Status",
            JobField::AppliedOn => "Applied On",
            JobField::Location => "Location",
            JobField::Platform => "Platform",
            JobField::Resume => "Resume",
            JobField::FollowUp => "Follow-up",
            JobField::InterviewDate => "Interview Date",
            JobField::JobLink => "Job Link",
            JobField::Feedback => "Feedback",
        }
    }
}

impl FromStr for JobField {
    type Err = String;

    // Accepts the wire name, kebab-case, or snake_case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        JobField::ALL
            .into_iter()
            .find(|f| f.wire_name().to_lowercase() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = JobField::ALL.iter().map(|f| f.wire_name()).collect();
                format!("Unknown job field '{}'. Must be one of: {}", s, names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Role,
    Email,
}

impl FromStr for ContactField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(ContactField::Name),
            "role" => Ok(ContactField::Role),
            "email" => Ok(ContactField::Email),
            _ => Err(format!(
                "Unknown contact field '{}'. Must be one of: name, role, email",
                s
            )),
        }
    }
}

/// Body of a contact creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewContact {
    pub name: String,
    pub role: String,
    pub email: String,
}

// Sanitization

/// Normalizes a possibly partial job payload into a fully populated [`Job`].
///
/// Missing or null scalars become empty strings, `status` falls back to
/// `Applied`, `id` to `None`, and anything that is not an array in
/// `contacts` becomes an empty list. Non-object input yields a blank job.
pub fn sanitize(record: &Value) -> Job {
    let status = match record.get("status") {
        Some(Value::String(s)) => s.parse().unwrap_or_else(|_| {
            tracing::warn!(status = %s, "unknown job status, treating as Applied");
            JobStatus::Applied
        }),
        _ => JobStatus::Applied,
    };

    let contacts = match record.get("contacts") {
        Some(Value::Array(items)) => items.iter().map(sanitize_contact).collect(),
        _ => Vec::new(),
    };

    Job {
        id: id_field(record),
        company: text_field(record, "company"),
        role: text_field(record, "role"),
        status,
        applied_on: text_field(record, "appliedOn"),
        location: text_field(record, "location"),
        platform: text_field(record, "platform"),
        resume: text_field(record, "resume"),
        follow_up: text_field(record, "followUp"),
        interview_date: text_field(record, "interviewDate"),
        job_link: text_field(record, "jobLink"),
        feedback: text_field(record, "feedback"),
        contacts,
        sync: SyncStatus::Synced,
        revision: 0,
    }
}

pub fn sanitize_contact(record: &Value) -> Contact {
    Contact {
        id: id_field(record),
        name: text_field(record, "name"),
        role: text_field(record, "role"),
        email: text_field(record, "email"),
        sync: SyncStatus::Synced,
        revision: 0,
        temp_key: None,
    }
}

/// Sanitizes a list payload; anything other than an array is an empty list.
pub fn sanitize_all(payload: &Value) -> Vec<Job> {
    match payload {
        Value::Array(items) => items.iter().map(sanitize).collect(),
        _ => Vec::new(),
    }
}

fn text_field(record: &Value, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn id_field(record: &Value) -> Option<Id> {
    match record.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(Id::Number(n.clone())),
        Some(Value::String(s)) => Some(Id::Text(s.clone())),
        Some(other) => {
            tracing::warn!(id = %other, "ignoring id that is neither a number nor a string");
            None
        }
    }
}
