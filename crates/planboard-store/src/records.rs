//! Table names and shared column values.

/// Table holding editor rows.
pub const EDITORS_TABLE: &str = "editors";

/// Table holding job rows.
pub const JOBS_TABLE: &str = "jobs";

/// Table holding dedicated job notes, keyed by job id.
pub const NOTES_TABLE: &str = "job_notes";

/// Table holding per-user profile rows (entitlement tier).
pub const PROFILES_TABLE: &str = "profiles";

/// `plan_type` value for the base tier.
pub const PLAN_FREE: &str = "free";

/// `plan_type` value for the elevated tier.
pub const PLAN_PRO: &str = "pro";
