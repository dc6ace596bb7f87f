//! Health check and maintenance utilities for quorum.
//!
//! Provides the `doctor` command functionality:
//! - Database and migration health
//! - Forum statistics
//! - Audit and repair of the denormalized counters

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::ForumService;
use crate::db::AppliedMigration;

/// Health status for a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum HealthStatus {
    /// Component is healthy
    Ok,
    /// Component has a warning but is functional
    Warning(String),
    /// Component is not functional
    Error(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

/// Database health information.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealth {
    #[serde(flatten)]
    pub status: HealthStatus,
    pub file_path: String,
}

/// Row counts for doctor output.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumStats {
    pub users: i64,
    pub questions: i64,
    pub unanswered_questions: i64,
    pub answers: i64,
    pub tags: i64,
    pub unused_tags: i64,
    pub votes: i64,
}

/// A stored counter that disagrees with the rows it summarizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterDrift {
    pub table: &'static str,
    pub column: &'static str,
    pub id: i64,
    pub stored: i64,
    pub actual: i64,
}

/// Full doctor output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorReport {
    pub database: DatabaseHealth,
    pub migrations: Vec<MigrationInfo>,
    pub stats: ForumStats,
    pub drift: Vec<CounterDrift>,
    /// Counters rewritten by `--repair`.
    pub repaired: usize,
}

/// Migration tracking information.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationInfo {
    pub version: u32,
    pub description: String,
    pub applied_at: i64,
}

impl From<AppliedMigration> for MigrationInfo {
    fn from(m: AppliedMigration) -> Self {
        Self {
            version: m.version,
            description: m.description,
            applied_at: m.applied_at,
        }
    }
}

/// One denormalized counter and the subquery that recomputes it.
///
/// `actual` is correlated on `{table}.id`.
struct CounterCheck {
    table: &'static str,
    column: &'static str,
    actual: &'static str,
}

const COUNTER_CHECKS: &[CounterCheck] = &[
    CounterCheck {
        table: "tags",
        column: "questions",
        actual: "SELECT COUNT(*) FROM tag_questions x WHERE x.tag_id = tags.id",
    },
    CounterCheck {
        table: "questions",
        column: "answers",
        actual: "SELECT COUNT(*) FROM answers x WHERE x.question_id = questions.id",
    },
    CounterCheck {
        table: "questions",
        column: "upvotes",
        actual: "SELECT COUNT(*) FROM votes x WHERE x.target_type = 'question' AND x.target_id = questions.id AND x.vote_type = 'upvotes'",
    },
    CounterCheck {
        table: "questions",
        column: "downvotes",
        actual: "SELECT COUNT(*) FROM votes x WHERE x.target_type = 'question' AND x.target_id = questions.id AND x.vote_type = 'downvotes'",
    },
    CounterCheck {
        table: "answers",
        column: "upvotes",
        actual: "SELECT COUNT(*) FROM votes x WHERE x.target_type = 'answer' AND x.target_id = answers.id AND x.vote_type = 'upvotes'",
    },
    CounterCheck {
        table: "answers",
        column: "downvotes",
        actual: "SELECT COUNT(*) FROM votes x WHERE x.target_type = 'answer' AND x.target_id = answers.id AND x.vote_type = 'downvotes'",
    },
];

// ============================================================================
// Health Check Functions
// ============================================================================

/// Performs all checks, optionally repairing drifted counters first.
///
/// When `repair` is set, `drift` lists what was found before the repair.
pub fn run_doctor(db_path: &str, service: &ForumService, repair: bool) -> Result<DoctorReport> {
    let database = check_database_health(db_path, service);
    let migrations = service
        .database()
        .applied_migrations()?
        .into_iter()
        .map(MigrationInfo::from)
        .collect();
    let drift = audit_counters(service)?;
    let repaired = if repair && !drift.is_empty() {
        repair_counters(service)?
    } else {
        0
    };
    let stats = get_forum_stats(service)?;

    Ok(DoctorReport {
        database,
        migrations,
        stats,
        drift,
        repaired,
    })
}

fn check_database_health(db_path: &str, service: &ForumService) -> DatabaseHealth {
    let conn = service.database().connection();
    let status = match conn.query_row("PRAGMA foreign_keys", [], |row| row.get::<_, i64>(0)) {
        Ok(1) => HealthStatus::Ok,
        Ok(_) => HealthStatus::Warning("Foreign keys are disabled".to_string()),
        Err(e) => HealthStatus::Error(format!("Connection test failed: {}", e)),
    };

    DatabaseHealth {
        status,
        file_path: db_path.to_string(),
    }
}

/// Counts the rows in each forum table.
pub fn get_forum_stats(service: &ForumService) -> Result<ForumStats> {
    let conn = service.database().connection();
    let count = |sql: &str| -> Result<i64> {
        conn.query_row(sql, [], |row| row.get(0))
            .with_context(|| format!("Failed to run `{sql}`"))
    };

    Ok(ForumStats {
        users: count("SELECT COUNT(*) FROM users")?,
        questions: count("SELECT COUNT(*) FROM questions")?,
        unanswered_questions: count("SELECT COUNT(*) FROM questions WHERE answers = 0")?,
        answers: count("SELECT COUNT(*) FROM answers")?,
        tags: count("SELECT COUNT(*) FROM tags")?,
        unused_tags: count("SELECT COUNT(*) FROM tags WHERE questions = 0")?,
        votes: count("SELECT COUNT(*) FROM votes")?,
    })
}

// ============================================================================
// Counter Audit
// ============================================================================

/// Recomputes every denormalized counter and lists the ones that drifted.
///
/// Scans whole tables; meant for maintenance, not request paths.
pub fn audit_counters(service: &ForumService) -> Result<Vec<CounterDrift>> {
    let conn = service.database().connection();
    let mut drift = Vec::new();

    for check in COUNTER_CHECKS {
        let sql = format!(
            "SELECT id, {column}, ({actual}) FROM {table} WHERE {column} != ({actual}) ORDER BY id",
            table = check.table,
            column = check.column,
            actual = check.actual,
        );
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to audit {}.{}", check.table, check.column))?;
        let rows = stmt.query_map([], |row| {
            Ok(CounterDrift {
                table: check.table,
                column: check.column,
                id: row.get(0)?,
                stored: row.get(1)?,
                actual: row.get(2)?,
            })
        })?;
        for row in rows {
            drift.push(row?);
        }
    }

    if !drift.is_empty() {
        warn!(count = drift.len(), "counter drift detected");
    }
    Ok(drift)
}

/// Rewrites every drifted counter from the underlying rows.
///
/// Runs in one transaction and returns the number of rows changed.
pub fn repair_counters(service: &ForumService) -> Result<usize> {
    let repaired = service.database().unit_of_work(|conn| {
        let mut repaired = 0;
        for check in COUNTER_CHECKS {
            let sql = format!(
                "UPDATE {table} SET {column} = ({actual}) WHERE {column} != ({actual})",
                table = check.table,
                column = check.column,
                actual = check.actual,
            );
            repaired += conn
                .execute(&sql, [])
                .with_context(|| format!("Failed to repair {}.{}", check.table, check.column))?;
        }
        Ok::<_, anyhow::Error>(repaired)
    })?;

    info!(repaired, "counters repaired");
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::validation::{CreateQuestionParams, CreateUserParams};

    fn seeded_service() -> ForumService {
        let service = ForumService::new(Database::in_memory().unwrap());
        let user = service
            .create_user(CreateUserParams {
                name: "Ada".to_string(),
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                image: None,
            })
            .unwrap();
        service
            .create_question(
                Some(user.id),
                CreateQuestionParams {
                    title: "Counter audit".to_string(),
                    content: "Body".to_string(),
                    tags: vec!["rust".to_string(), "sqlite".to_string()],
                },
            )
            .unwrap();
        service
    }

    #[test]
    fn consistent_database_has_no_drift() {
        let service = seeded_service();
        assert!(audit_counters(&service).unwrap().is_empty());
    }

    #[test]
    fn audit_reports_tampered_counter() {
        let service = seeded_service();
        service
            .database()
            .connection()
            .execute("UPDATE tags SET questions = 5 WHERE name = 'rust'", [])
            .unwrap();

        let drift = audit_counters(&service).unwrap();

        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].table, "tags");
        assert_eq!(drift[0].column, "questions");
        assert_eq!(drift[0].stored, 5);
        assert_eq!(drift[0].actual, 1);
    }

    #[test]
    fn repair_restores_counters() {
        let service = seeded_service();
        let conn = service.database().connection();
        conn.execute("UPDATE questions SET upvotes = 3, answers = 2", [])
            .unwrap();

        let repaired = repair_counters(&service).unwrap();

        assert_eq!(repaired, 2, "one row rewritten per drifted column");
        assert!(audit_counters(&service).unwrap().is_empty());
    }

    #[test]
    fn run_doctor_reports_stats_and_repairs() {
        let service = seeded_service();
        service
            .database()
            .connection()
            .execute("UPDATE tags SET questions = 0", [])
            .unwrap();

        let report = run_doctor(":memory:", &service, true).unwrap();

        assert!(report.database.status.is_ok());
        assert_eq!(report.migrations.len(), 1);
        assert_eq!(report.drift.len(), 2);
        assert_eq!(report.repaired, 2);
        assert_eq!(report.stats.questions, 1);
        assert_eq!(report.stats.unused_tags, 0);
    }
}
