/// Identifier of an availability rule.
pub type RuleId = i64;

/// Identifier of a platform user (tutor, student, or interviewer).
pub type UserId = i64;

/// Identifier of a live call/session.
pub type SessionId = i64;
