// ABOUTME: WHOOP API response models and the aggregated multi-domain snapshot
// ABOUTME: Domain enum gives closed, compile-checked dispatch over the six data categories
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed models for WHOOP API payloads.
//!
//! Record structs mirror the developer API's JSON shapes. Score objects are
//! optional because WHOOP omits them while a record is still being scored
//! (`score_state` of `PENDING_SCORE`).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One health-data category served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// User profile (singleton record)
    Profile,
    /// Body measurements (singleton record)
    Body,
    /// Sleep activities
    Sleep,
    /// Recovery scores
    Recovery,
    /// Workouts
    Workout,
    /// Physiological cycles (strain)
    Cycle,
}

impl Domain {
    /// Every domain, in merge order
    pub const ALL: [Self; 6] = [
        Self::Profile,
        Self::Body,
        Self::Sleep,
        Self::Recovery,
        Self::Workout,
        Self::Cycle,
    ];

    /// Endpoint path for this domain, relative to the API base URL
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Profile => crate::constants::endpoints::PROFILE,
            Self::Body => crate::constants::endpoints::BODY,
            Self::Sleep => crate::constants::endpoints::SLEEP,
            Self::Recovery => crate::constants::endpoints::RECOVERY,
            Self::Workout => crate::constants::endpoints::WORKOUT,
            Self::Cycle => crate::constants::endpoints::CYCLE,
        }
    }

    /// Lowercase name used in logs and CLI output
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Body => "body",
            Self::Sleep => "sleep",
            Self::Recovery => "recovery",
            Self::Workout => "workout",
            Self::Cycle => "cycle",
        }
    }
}

/// Pagination wrapper for collection responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    /// Records in arrival order
    pub records: Vec<T>,
    /// Opaque continuation token; absent when the result set is exhausted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// User profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// WHOOP user ID
    pub user_id: i64,
    /// Email address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// First name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Last name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Body measurements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyMeasurement {
    /// Height in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_meter: Option<f64>,
    /// Weight in kilograms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kilogram: Option<f64>,
    /// Maximum heart rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<i32>,
}

/// Sleep activity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepActivity {
    /// Sleep UUID
    pub id: String,
    /// Owning user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Sleep start (UTC)
    pub start: DateTime<Utc>,
    /// Sleep end (UTC)
    pub end: DateTime<Utc>,
    /// User timezone offset at record time, e.g. `-05:00`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<String>,
    /// Whether this was a nap rather than primary sleep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nap: Option<bool>,
    /// Scoring state (`SCORED`, `PENDING_SCORE`, `UNSCORABLE`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_state: Option<String>,
    /// Score details, present once scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<SleepScore>,
}

/// Sleep score details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepScore {
    /// Stage breakdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_summary: Option<SleepStageSummary>,
    /// Respiratory rate during sleep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<f64>,
    /// Sleep performance percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_performance_percentage: Option<f64>,
    /// Sleep consistency percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_consistency_percentage: Option<f64>,
    /// Sleep efficiency percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_efficiency_percentage: Option<f64>,
}

/// Sleep stage breakdown in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepStageSummary {
    /// Total time in bed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_in_bed_time_milli: Option<i64>,
    /// Total awake time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_awake_time_milli: Option<i64>,
    /// Total light sleep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_light_sleep_time_milli: Option<i64>,
    /// Total slow wave (deep) sleep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_slow_wave_sleep_time_milli: Option<i64>,
    /// Total REM sleep
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rem_sleep_time_milli: Option<i64>,
    /// Number of full sleep cycles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_cycle_count: Option<i32>,
    /// Number of disturbances
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disturbance_count: Option<i32>,
}

/// Recovery record for one physiological cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recovery {
    /// Cycle this recovery belongs to
    pub cycle_id: i64,
    /// Sleep that produced this recovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_id: Option<String>,
    /// Owning user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Scoring state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_state: Option<String>,
    /// Score details, present once scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<RecoveryScore>,
}

/// Recovery score details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryScore {
    /// True while WHOOP is still calibrating for this user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_calibrating: Option<bool>,
    /// Recovery percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_score: Option<f64>,
    /// Resting heart rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_heart_rate: Option<f64>,
    /// Heart rate variability (RMSSD, milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hrv_rmssd_milli: Option<f64>,
    /// Blood oxygen saturation percentage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2_percentage: Option<f64>,
    /// Skin temperature in Celsius
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skin_temp_celsius: Option<f64>,
}

/// Workout record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    /// Workout UUID
    pub id: String,
    /// Owning user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Workout start (UTC)
    pub start: DateTime<Utc>,
    /// Workout end (UTC)
    pub end: DateTime<Utc>,
    /// WHOOP internal sport classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sport_id: Option<i32>,
    /// Scoring state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_state: Option<String>,
    /// Score details, present once scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<WorkoutScore>,
}

/// Workout score details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutScore {
    /// Strain (0-21 scale)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strain: Option<f64>,
    /// Average heart rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_heart_rate: Option<i32>,
    /// Maximum heart rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<i32>,
    /// Energy expenditure in kilojoules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kilojoule: Option<f64>,
    /// Fraction of the workout with heart-rate data recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_recorded: Option<f64>,
    /// Distance in meters, for applicable sports
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meter: Option<f64>,
    /// Altitude gain in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_gain_meter: Option<f64>,
}

/// Physiological cycle (daily strain) record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    /// Cycle ID (integer, unlike sleep/workout UUIDs)
    pub id: i64,
    /// Owning user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Cycle start (UTC)
    pub start: DateTime<Utc>,
    /// Cycle end; absent for the currently ongoing cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// User timezone offset at record time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_offset: Option<String>,
    /// Scoring state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_state: Option<String>,
    /// Score details, present once scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<CycleScore>,
}

/// Cycle score details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleScore {
    /// Day strain (0-21 scale)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strain: Option<f64>,
    /// Energy expenditure in kilojoules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kilojoule: Option<f64>,
    /// Average heart rate over the cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_heart_rate: Option<i32>,
    /// Maximum heart rate over the cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<i32>,
}

/// Merged result of one composite multi-domain fetch.
///
/// Only requested domains are populated; an unset field means "not
/// requested", never "requested but empty", and is omitted from JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Calendar date the snapshot was created
    pub date: NaiveDate,
    /// Instant the composite fetch completed
    pub fetched_at: DateTime<Utc>,
    /// User profile, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    /// Body measurements, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyMeasurement>,
    /// Sleep activities, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<Vec<SleepActivity>>,
    /// Recovery records, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<Vec<Recovery>>,
    /// Workouts, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout: Option<Vec<Workout>>,
    /// Cycles, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<Cycle>>,
}

impl Snapshot {
    /// Create an empty snapshot stamped with the current date and time
    #[must_use]
    pub fn stamped_now() -> Self {
        let now = Utc::now();
        Self {
            date: now.date_naive(),
            fetched_at: now,
            profile: None,
            body: None,
            sleep: None,
            recovery: None,
            workout: None,
            cycle: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paginated_response_without_token_means_exhausted() {
        let body = json!({ "records": [{ "user_id": 1 }] });
        let page: PaginatedResponse<UserProfile> =
            serde_json::from_value(body).expect("valid page");
        assert_eq!(page.records.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn snapshot_serialization_omits_unrequested_domains() {
        let mut snapshot = Snapshot::stamped_now();
        snapshot.profile = Some(UserProfile {
            user_id: 42,
            email: None,
            first_name: None,
            last_name: None,
        });

        let value = serde_json::to_value(&snapshot).expect("serializable");
        let object = value.as_object().expect("object");
        assert!(object.contains_key("profile"));
        assert!(object.contains_key("date"));
        assert!(object.contains_key("fetched_at"));
        assert!(!object.contains_key("sleep"));
        assert!(!object.contains_key("recovery"));
    }

    #[test]
    fn domain_dispatch_is_closed_and_consistent() {
        for domain in Domain::ALL {
            assert!(!domain.endpoint().is_empty());
            assert!(!domain.as_str().is_empty());
        }
    }
}
