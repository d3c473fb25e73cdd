use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Metadata for one uploaded CV. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvRecord {
    /// Store-assigned locator, unique across all uploads.
    pub filename: String,
    pub original_name: String,
    #[serde(rename = "path")]
    pub storage_path: String,
    #[serde(serialize_with = "millis_timestamp")]
    pub upload_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient_job_id")]
    pub job_id: Option<i64>,
    #[serde(rename = "size")]
    pub size_bytes: u64,
}

/// One account's applications and uploads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Applied job ids in first-application order, no duplicates.
    #[serde(rename = "appliedJobs", default, deserialize_with = "unique_job_ids")]
    pub applied_job_ids: Vec<i64>,
    #[serde(default)]
    pub cvs: Vec<CvRecord>,
}

impl ProfileRecord {
    /// Records an application. Returns false if the job was already applied to.
    pub fn apply(&mut self, job_id: i64) -> bool {
        if self.has_applied(job_id) {
            return false;
        }
        self.applied_job_ids.push(job_id);
        true
    }

    pub fn has_applied(&self, job_id: i64) -> bool {
        self.applied_job_ids.contains(&job_id)
    }

    pub fn push_cv(&mut self, cv: CvRecord) {
        self.cvs.push(cv);
    }
}

/// The whole persisted document: account label → profile. Accounts keep
/// the order they appear in on disk; new accounts are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSnapshot {
    profiles: Vec<(String, ProfileRecord)>,
}

impl ProfileSnapshot {
    pub fn profile(&self, account_label: &str) -> Option<&ProfileRecord> {
        self.profiles
            .iter()
            .find(|(label, _)| label == account_label)
            .map(|(_, profile)| profile)
    }

    /// Returns the account's record, creating an empty one on first touch.
    pub fn profile_mut(&mut self, account_label: &str) -> &mut ProfileRecord {
        let index = match self.position(account_label) {
            Some(index) => index,
            None => {
                self.profiles
                    .push((account_label.to_string(), ProfileRecord::default()));
                self.profiles.len() - 1
            }
        };
        &mut self.profiles[index].1
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    fn position(&self, account_label: &str) -> Option<usize> {
        self.profiles
            .iter()
            .position(|(label, _)| label == account_label)
    }
}

impl Serialize for ProfileSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.profiles.iter().map(|(label, profile)| (label, profile)))
    }
}

impl<'de> Deserialize<'de> for ProfileSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SnapshotVisitor;

        impl<'de> Visitor<'de> for SnapshotVisitor {
            type Value = ProfileSnapshot;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of account label to profile")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut snapshot = ProfileSnapshot::default();
                while let Some((label, profile)) = map.next_entry::<String, ProfileRecord>()? {
                    // A repeated key replaces the earlier entry in place.
                    match snapshot.position(&label) {
                        Some(index) => snapshot.profiles[index].1 = profile,
                        None => snapshot.profiles.push((label, profile)),
                    }
                }
                Ok(snapshot)
            }
        }

        deserializer.deserialize_map(SnapshotVisitor)
    }
}

fn millis_timestamp<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// Hand-edited documents may list a job twice; keep the first occurrence.
fn unique_job_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut ids = Vec::<i64>::deserialize(deserializer)?;
    let mut seen = Vec::with_capacity(ids.len());
    ids.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });
    Ok(ids)
}

// Older documents stored the optional job association as a string ("3").
fn lenient_job_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawJobId {
        Int(i64),
        Text(String),
    }

    match Option::<RawJobId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawJobId::Int(id)) => Ok(Some(id)),
        Some(RawJobId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawJobId::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("jobId '{s}' is not an integer"))),
    }
}
