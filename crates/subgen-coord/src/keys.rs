//! Redis key layout shared with the external collaborators.

use subgen_models::JobId;

/// Higher-priority submissions.
pub const QUEUE_HIGH: &str = "queue:high";
/// Lower-priority submissions and retry re-entries.
pub const QUEUE_LOW: &str = "queue:low";
/// Terminal failures, retained for inspection.
pub const QUEUE_DLQ: &str = "queue:dlq";
/// Job identifiers currently owned by some worker.
pub const JOBS_PROCESSING: &str = "jobs:processing";
/// Fleet-wide worker slot tokens.
pub const SEMAPHORE_GLOBAL: &str = "semaphore:global";
/// Fleet-wide transcription-provider slot tokens.
pub const SEMAPHORE_AI: &str = "semaphore:ai";

/// Hash key holding one job record.
pub fn job_key(id: &JobId) -> String {
    format!("job:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_layout() {
        let id = JobId::from("4bd2a1ce-9d2f-4f5e-a1be-b62a5dbb2c27");
        assert_eq!(job_key(&id), "job:4bd2a1ce-9d2f-4f5e-a1be-b62a5dbb2c27");
    }
}
