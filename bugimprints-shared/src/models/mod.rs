/// Database models for Bug Imprints
///
/// Every model embeds an [`AuditTrail`](crate::audit::AuditTrail) and exposes
/// static async CRUD functions generic over `sqlx::PgExecutor`, so the same
/// function runs against the pool or inside a transaction. Default queries
/// exclude soft-deleted rows.
///
/// # Models
///
/// - `user`: accounts, account types and team membership links
/// - `team`: teams and their leaders
/// - `media`: stored files (MediaStore)
/// - `bug`: reported bugs and their acceptance state
/// - `bug_resolution`: work tracking for accepted bugs
/// - `message`: comments on a resolution
/// - `bug_watch`: users following a bug
/// - `bug_duplicate`: duplicate links between bugs

pub mod bug;
pub mod bug_duplicate;
pub mod bug_resolution;
pub mod bug_watch;
pub mod media;
pub mod message;
pub mod team;
pub mod user;
