//! Manufacturing batch models and the batch status state machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::UnknownVariant;

/// One production run of a product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManufacturingBatch {
    pub id: Uuid,
    /// Unique batch number (e.g., "BATCH-20241016-0001")
    pub batch_number: String,
    pub product_id: Uuid,
    pub quantity_produced: i64,
    pub status: BatchStatus,
    pub start_date: NaiveDate,
    pub expected_completion_date: NaiveDate,
    /// Set exactly when the batch reaches `Completed`
    pub completion_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Production stages, in order. Batches only ever move one step forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Cutting,
    Stitching,
    Ironing,
    Packaging,
    Completed,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 6] = [
        BatchStatus::Pending,
        BatchStatus::Cutting,
        BatchStatus::Stitching,
        BatchStatus::Ironing,
        BatchStatus::Packaging,
        BatchStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Cutting => "cutting",
            BatchStatus::Stitching => "stitching",
            BatchStatus::Ironing => "ironing",
            BatchStatus::Packaging => "packaging",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The immediate successor, `None` once completed
    pub fn next(&self) -> Option<BatchStatus> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn can_advance_to(&self, target: BatchStatus) -> bool {
        self.next() == Some(target)
    }

    pub fn is_terminal(&self) -> bool {
        *self == BatchStatus::Completed
    }

    /// Work stages strictly after this one, not counting `Completed`
    pub fn stages_remaining(&self) -> usize {
        Self::ALL[self.index() + 1..]
            .iter()
            .filter(|s| !s.is_terminal())
            .count()
    }

    pub fn progress_percent(&self) -> u8 {
        (self.index() * 100 / (Self::ALL.len() - 1)) as u8
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownVariant::new("batch status", s))
    }
}

/// Bill-of-materials line fixed at batch creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialUsage {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub material_id: Uuid,
    pub quantity_required: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A requested material line when creating a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialLine {
    pub material_id: Uuid,
    pub quantity: Decimal,
}

/// A batch together with its material usages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: ManufacturingBatch,
    pub materials: Vec<MaterialUsage>,
}

/// Schedule pressure on an in-flight batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Overdue,
    Urgent,
    Warning,
    Normal,
}

/// Whole calendar days from `now` until the expected completion date
pub fn days_remaining(expected_completion_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    (expected_completion_date - now.date_naive()).num_days()
}

/// Classify a batch by how close it is to its expected completion date
pub fn classify_urgency(
    status: BatchStatus,
    expected_completion_date: NaiveDate,
    now: DateTime<Utc>,
) -> Urgency {
    if status.is_terminal() {
        return Urgency::Normal;
    }

    let days = days_remaining(expected_completion_date, now);
    let stages = status.stages_remaining();

    if days < 0 {
        Urgency::Overdue
    } else if days < 2 && stages > 1 {
        Urgency::Urgent
    } else if days < 3 && stages >= 1 {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}

/// Generate a batch number for the given day and 1-based sequence
pub fn generate_batch_number(prefix: &str, date: NaiveDate, sequence: i64) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m%d"), sequence)
}

/// Number of batches currently at a status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: BatchStatus,
    pub count: i64,
}

/// Derived view of one in-flight batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineEntry {
    pub batch_id: Uuid,
    pub batch_number: String,
    pub product_id: Uuid,
    pub status: BatchStatus,
    pub expected_completion_date: NaiveDate,
    pub days_remaining: i64,
    pub stages_remaining: usize,
    pub progress_percent: u8,
    pub urgency: Urgency,
}

/// Production pipeline dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchPipeline {
    pub counts: Vec<StatusCount>,
    /// Non-completed batches, most pressing first
    pub active: Vec<PipelineEntry>,
}

impl BatchPipeline {
    pub fn build(batches: &[ManufacturingBatch], now: DateTime<Utc>) -> Self {
        let counts = BatchStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: batches.iter().filter(|b| b.status == *status).count() as i64,
            })
            .collect();

        let mut active: Vec<PipelineEntry> = batches
            .iter()
            .filter(|b| !b.status.is_terminal())
            .map(|b| PipelineEntry {
                batch_id: b.id,
                batch_number: b.batch_number.clone(),
                product_id: b.product_id,
                status: b.status,
                expected_completion_date: b.expected_completion_date,
                days_remaining: days_remaining(b.expected_completion_date, now),
                stages_remaining: b.status.stages_remaining(),
                progress_percent: b.status.progress_percent(),
                urgency: classify_urgency(b.status, b.expected_completion_date, now),
            })
            .collect();
        active.sort_by(|a, b| {
            a.days_remaining
                .cmp(&b.days_remaining)
                .then_with(|| a.batch_number.cmp(&b.batch_number))
        });

        Self { counts, active }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 16, 9, 30, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    #[test]
    fn test_status_successors_follow_declared_order() {
        assert_eq!(BatchStatus::Pending.next(), Some(BatchStatus::Cutting));
        assert_eq!(BatchStatus::Packaging.next(), Some(BatchStatus::Completed));
        assert_eq!(BatchStatus::Completed.next(), None);
    }

    #[test]
    fn test_no_skipping_or_reversal() {
        assert!(BatchStatus::Pending.can_advance_to(BatchStatus::Cutting));
        assert!(!BatchStatus::Pending.can_advance_to(BatchStatus::Ironing));
        assert!(!BatchStatus::Ironing.can_advance_to(BatchStatus::Stitching));
        assert!(!BatchStatus::Cutting.can_advance_to(BatchStatus::Cutting));
        assert!(!BatchStatus::Completed.can_advance_to(BatchStatus::Pending));
    }

    #[test]
    fn test_stages_remaining() {
        assert_eq!(BatchStatus::Pending.stages_remaining(), 4);
        assert_eq!(BatchStatus::Stitching.stages_remaining(), 2);
        assert_eq!(BatchStatus::Packaging.stages_remaining(), 0);
        assert_eq!(BatchStatus::Completed.stages_remaining(), 0);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(BatchStatus::Pending.progress_percent(), 0);
        assert_eq!(BatchStatus::Stitching.progress_percent(), 40);
        assert_eq!(BatchStatus::Completed.progress_percent(), 100);
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in BatchStatus::ALL {
            assert_eq!(status.as_str().parse::<BatchStatus>(), Ok(status));
        }
        assert!("shipping".parse::<BatchStatus>().is_err());
    }

    #[test]
    fn test_overdue_when_past_expected_date() {
        assert_eq!(
            classify_urgency(BatchStatus::Packaging, date(15), now()),
            Urgency::Overdue
        );
    }

    #[test]
    fn test_urgent_needs_more_than_one_stage_left() {
        // one day left, two stages left
        assert_eq!(
            classify_urgency(BatchStatus::Stitching, date(17), now()),
            Urgency::Urgent
        );
        // one day left, one stage left
        assert_eq!(
            classify_urgency(BatchStatus::Ironing, date(17), now()),
            Urgency::Warning
        );
    }

    #[test]
    fn test_warning_window() {
        assert_eq!(
            classify_urgency(BatchStatus::Cutting, date(18), now()),
            Urgency::Warning
        );
        assert_eq!(
            classify_urgency(BatchStatus::Cutting, date(19), now()),
            Urgency::Normal
        );
    }

    #[test]
    fn test_packaging_with_no_stages_left_is_normal() {
        assert_eq!(
            classify_urgency(BatchStatus::Packaging, date(16), now()),
            Urgency::Normal
        );
    }

    #[test]
    fn test_completed_batches_are_never_pressing() {
        assert_eq!(
            classify_urgency(BatchStatus::Completed, date(1), now()),
            Urgency::Normal
        );
    }

    #[test]
    fn test_generate_batch_number() {
        assert_eq!(
            generate_batch_number("BATCH", date(16), 7),
            "BATCH-20241016-0007"
        );
    }

    #[test]
    fn test_pipeline_orders_most_pressing_first() {
        let make = |number: &str, status: BatchStatus, expected: NaiveDate| ManufacturingBatch {
            id: Uuid::new_v4(),
            batch_number: number.to_string(),
            product_id: Uuid::new_v4(),
            quantity_produced: 10,
            status,
            start_date: date(1),
            expected_completion_date: expected,
            completion_date: None,
            notes: None,
            created_by: Uuid::new_v4(),
            created_at: now(),
            updated_at: now(),
        };
        let batches = vec![
            make("B-3", BatchStatus::Cutting, date(25)),
            make("B-1", BatchStatus::Ironing, date(14)),
            make("B-2", BatchStatus::Completed, date(10)),
        ];

        let pipeline = BatchPipeline::build(&batches, now());

        assert_eq!(pipeline.active.len(), 2);
        assert_eq!(pipeline.active[0].batch_number, "B-1");
        assert_eq!(pipeline.active[0].urgency, Urgency::Overdue);
        assert_eq!(pipeline.active[1].urgency, Urgency::Normal);
        let completed = pipeline
            .counts
            .iter()
            .find(|c| c.status == BatchStatus::Completed)
            .unwrap();
        assert_eq!(completed.count, 1);
    }
}
