//! Dependency-ordered deletion plans.
//!
//! The schema keeps ON DELETE RESTRICT on these relations, so removing a
//! parent row means removing its dependents first, deepest first. Instead
//! of hand-writing that order inside each delete action, each root entity
//! has one static plan here; the executor runs every step inside the
//! caller's transaction, so a failure partway leaves nothing half-deleted.

use sqlx::{Postgres, Transaction};

use crate::filter::Param;

#[derive(Debug, Clone, Copy)]
pub struct CascadeStep {
    /// What the step removes, used for logging and plan-order tests.
    pub label: &'static str,
    /// Single statement; `$1` is the root id.
    pub sql: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct CascadePlan {
    pub root: &'static str,
    pub steps: &'static [CascadeStep],
}

/// Delete a class: everything hanging off its lessons goes first, then the
/// class-scoped events/announcements, then the class row. Enrolled
/// students are a precondition checked by the action, not part of the plan.
pub static CLASS_PLAN: CascadePlan = CascadePlan {
    root: "classes",
    steps: &[
        CascadeStep {
            label: "results via exams",
            sql: "DELETE FROM results WHERE exam_id IN \
                  (SELECT e.id FROM exams e JOIN lessons l ON l.id = e.lesson_id WHERE l.class_id = $1)",
        },
        CascadeStep {
            label: "results via assignments",
            sql: "DELETE FROM results WHERE assignment_id IN \
                  (SELECT a.id FROM assignments a JOIN lessons l ON l.id = a.lesson_id WHERE l.class_id = $1)",
        },
        CascadeStep {
            label: "exams",
            sql: "DELETE FROM exams WHERE lesson_id IN (SELECT id FROM lessons WHERE class_id = $1)",
        },
        CascadeStep {
            label: "assignments",
            sql: "DELETE FROM assignments WHERE lesson_id IN (SELECT id FROM lessons WHERE class_id = $1)",
        },
        CascadeStep {
            label: "attendances",
            sql: "DELETE FROM attendances WHERE lesson_id IN (SELECT id FROM lessons WHERE class_id = $1)",
        },
        CascadeStep {
            label: "lessons",
            sql: "DELETE FROM lessons WHERE class_id = $1",
        },
        CascadeStep {
            label: "events",
            sql: "DELETE FROM events WHERE class_id = $1",
        },
        CascadeStep {
            label: "announcements",
            sql: "DELETE FROM announcements WHERE class_id = $1",
        },
        CascadeStep {
            label: "classes",
            sql: "DELETE FROM classes WHERE id = $1",
        },
    ],
};

pub static LESSON_PLAN: CascadePlan = CascadePlan {
    root: "lessons",
    steps: &[
        CascadeStep {
            label: "results via exams",
            sql: "DELETE FROM results WHERE exam_id IN (SELECT id FROM exams WHERE lesson_id = $1)",
        },
        CascadeStep {
            label: "results via assignments",
            sql: "DELETE FROM results WHERE assignment_id IN (SELECT id FROM assignments WHERE lesson_id = $1)",
        },
        CascadeStep {
            label: "exams",
            sql: "DELETE FROM exams WHERE lesson_id = $1",
        },
        CascadeStep {
            label: "assignments",
            sql: "DELETE FROM assignments WHERE lesson_id = $1",
        },
        CascadeStep {
            label: "attendances",
            sql: "DELETE FROM attendances WHERE lesson_id = $1",
        },
        CascadeStep {
            label: "lessons",
            sql: "DELETE FROM lessons WHERE id = $1",
        },
    ],
};

pub static SUBJECT_PLAN: CascadePlan = CascadePlan {
    root: "subjects",
    steps: &[
        CascadeStep {
            label: "results via exams",
            sql: "DELETE FROM results WHERE exam_id IN \
                  (SELECT e.id FROM exams e JOIN lessons l ON l.id = e.lesson_id WHERE l.subject_id = $1)",
        },
        CascadeStep {
            label: "results via assignments",
            sql: "DELETE FROM results WHERE assignment_id IN \
                  (SELECT a.id FROM assignments a JOIN lessons l ON l.id = a.lesson_id WHERE l.subject_id = $1)",
        },
        CascadeStep {
            label: "exams",
            sql: "DELETE FROM exams WHERE lesson_id IN (SELECT id FROM lessons WHERE subject_id = $1)",
        },
        CascadeStep {
            label: "assignments",
            sql: "DELETE FROM assignments WHERE lesson_id IN (SELECT id FROM lessons WHERE subject_id = $1)",
        },
        CascadeStep {
            label: "attendances",
            sql: "DELETE FROM attendances WHERE lesson_id IN (SELECT id FROM lessons WHERE subject_id = $1)",
        },
        CascadeStep {
            label: "lessons",
            sql: "DELETE FROM lessons WHERE subject_id = $1",
        },
        CascadeStep {
            label: "subject teacher links",
            sql: "DELETE FROM subject_teachers WHERE subject_id = $1",
        },
        CascadeStep {
            label: "subjects",
            sql: "DELETE FROM subjects WHERE id = $1",
        },
    ],
};

pub static EXAM_PLAN: CascadePlan = CascadePlan {
    root: "exams",
    steps: &[
        CascadeStep {
            label: "results",
            sql: "DELETE FROM results WHERE exam_id = $1",
        },
        CascadeStep {
            label: "exams",
            sql: "DELETE FROM exams WHERE id = $1",
        },
    ],
};

pub static ASSIGNMENT_PLAN: CascadePlan = CascadePlan {
    root: "assignments",
    steps: &[
        CascadeStep {
            label: "results",
            sql: "DELETE FROM results WHERE assignment_id = $1",
        },
        CascadeStep {
            label: "assignments",
            sql: "DELETE FROM assignments WHERE id = $1",
        },
    ],
};

/// Delete a teacher: their lessons' dependents first, then their lessons,
/// subject links and messages; supervised classes are kept and merely
/// unassigned. The identity row goes last.
pub static TEACHER_PLAN: CascadePlan = CascadePlan {
    root: "teachers",
    steps: &[
        CascadeStep {
            label: "results via exams",
            sql: "DELETE FROM results WHERE exam_id IN \
                  (SELECT e.id FROM exams e JOIN lessons l ON l.id = e.lesson_id WHERE l.teacher_id = $1)",
        },
        CascadeStep {
            label: "results via assignments",
            sql: "DELETE FROM results WHERE assignment_id IN \
                  (SELECT a.id FROM assignments a JOIN lessons l ON l.id = a.lesson_id WHERE l.teacher_id = $1)",
        },
        CascadeStep {
            label: "exams",
            sql: "DELETE FROM exams WHERE lesson_id IN (SELECT id FROM lessons WHERE teacher_id = $1)",
        },
        CascadeStep {
            label: "assignments",
            sql: "DELETE FROM assignments WHERE lesson_id IN (SELECT id FROM lessons WHERE teacher_id = $1)",
        },
        CascadeStep {
            label: "attendances",
            sql: "DELETE FROM attendances WHERE lesson_id IN (SELECT id FROM lessons WHERE teacher_id = $1)",
        },
        CascadeStep {
            label: "lessons",
            sql: "DELETE FROM lessons WHERE teacher_id = $1",
        },
        CascadeStep {
            label: "subject teacher links",
            sql: "DELETE FROM subject_teachers WHERE teacher_id = $1",
        },
        CascadeStep {
            label: "unassign supervised classes",
            sql: "UPDATE classes SET supervisor_id = NULL WHERE supervisor_id = $1",
        },
        CascadeStep {
            label: "received message links",
            sql: "DELETE FROM message_recipients WHERE recipient_id = $1",
        },
        CascadeStep {
            label: "sent message links",
            sql: "DELETE FROM message_recipients WHERE message_id IN \
                  (SELECT id FROM messages WHERE sender_id = $1)",
        },
        CascadeStep {
            label: "sent messages",
            sql: "DELETE FROM messages WHERE sender_id = $1",
        },
        CascadeStep {
            label: "teachers",
            sql: "DELETE FROM teachers WHERE id = $1",
        },
        CascadeStep {
            label: "users",
            sql: "DELETE FROM users WHERE id = $1",
        },
    ],
};

pub static STUDENT_PLAN: CascadePlan = CascadePlan {
    root: "students",
    steps: &[
        CascadeStep {
            label: "results",
            sql: "DELETE FROM results WHERE student_id = $1",
        },
        CascadeStep {
            label: "attendances",
            sql: "DELETE FROM attendances WHERE student_id = $1",
        },
        CascadeStep {
            label: "payments",
            sql: "DELETE FROM payments WHERE student_id = $1",
        },
        CascadeStep {
            label: "received message links",
            sql: "DELETE FROM message_recipients WHERE recipient_id = $1",
        },
        CascadeStep {
            label: "sent message links",
            sql: "DELETE FROM message_recipients WHERE message_id IN \
                  (SELECT id FROM messages WHERE sender_id = $1)",
        },
        CascadeStep {
            label: "sent messages",
            sql: "DELETE FROM messages WHERE sender_id = $1",
        },
        CascadeStep {
            label: "students",
            sql: "DELETE FROM students WHERE id = $1",
        },
        CascadeStep {
            label: "users",
            sql: "DELETE FROM users WHERE id = $1",
        },
    ],
};

/// Delete a parent and their children's whole subtree. The combined
/// students+users step uses a CTE because the children's identity rows can
/// only be located while the extension rows still exist.
pub static PARENT_PLAN: CascadePlan = CascadePlan {
    root: "parents",
    steps: &[
        CascadeStep {
            label: "children results",
            sql: "DELETE FROM results WHERE student_id IN (SELECT id FROM students WHERE parent_id = $1)",
        },
        CascadeStep {
            label: "children attendances",
            sql: "DELETE FROM attendances WHERE student_id IN (SELECT id FROM students WHERE parent_id = $1)",
        },
        CascadeStep {
            label: "children payments",
            sql: "DELETE FROM payments WHERE student_id IN (SELECT id FROM students WHERE parent_id = $1)",
        },
        CascadeStep {
            label: "children received message links",
            sql: "DELETE FROM message_recipients WHERE recipient_id IN \
                  (SELECT id FROM students WHERE parent_id = $1)",
        },
        CascadeStep {
            label: "children sent message links",
            sql: "DELETE FROM message_recipients WHERE message_id IN \
                  (SELECT id FROM messages WHERE sender_id IN (SELECT id FROM students WHERE parent_id = $1))",
        },
        CascadeStep {
            label: "children sent messages",
            sql: "DELETE FROM messages WHERE sender_id IN (SELECT id FROM students WHERE parent_id = $1)",
        },
        CascadeStep {
            label: "children students and identities",
            sql: "WITH gone AS (DELETE FROM students WHERE parent_id = $1 RETURNING id) \
                  DELETE FROM users WHERE id IN (SELECT id FROM gone)",
        },
        CascadeStep {
            label: "received message links",
            sql: "DELETE FROM message_recipients WHERE recipient_id = $1",
        },
        CascadeStep {
            label: "sent message links",
            sql: "DELETE FROM message_recipients WHERE message_id IN \
                  (SELECT id FROM messages WHERE sender_id = $1)",
        },
        CascadeStep {
            label: "sent messages",
            sql: "DELETE FROM messages WHERE sender_id = $1",
        },
        CascadeStep {
            label: "parents",
            sql: "DELETE FROM parents WHERE id = $1",
        },
        CascadeStep {
            label: "users",
            sql: "DELETE FROM users WHERE id = $1",
        },
    ],
};

/// Run every step of a plan inside the caller's transaction. The caller
/// has already verified the root row exists (so a second delete of the
/// same id reports not-found instead of re-running the cascade).
pub async fn run_plan(
    tx: &mut Transaction<'_, Postgres>,
    plan: &CascadePlan,
    root_id: &Param,
) -> Result<(), sqlx::Error> {
    for step in plan.steps {
        let query = sqlx::query(step.sql);
        let query = match root_id {
            Param::Int(i) => query.bind(*i),
            Param::Uuid(u) => query.bind(*u),
            Param::Text(s) => query.bind(s.clone()),
            Param::Bool(b) => query.bind(*b),
            Param::Date(d) => query.bind(*d),
            Param::Decimal(d) => query.bind(*d),
        };
        let affected = query.execute(&mut **tx).await?.rows_affected();
        tracing::debug!(
            root = plan.root,
            step = step.label,
            rows = affected,
            "cascade step"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(plan: &CascadePlan, label: &str) -> usize {
        plan.steps
            .iter()
            .position(|s| s.label == label)
            .unwrap_or_else(|| panic!("step '{}' missing from {} plan", label, plan.root))
    }

    #[test]
    fn every_plan_deletes_its_root_last() {
        for plan in [
            &CLASS_PLAN,
            &LESSON_PLAN,
            &SUBJECT_PLAN,
            &EXAM_PLAN,
            &ASSIGNMENT_PLAN,
            &TEACHER_PLAN,
            &STUDENT_PLAN,
            &PARENT_PLAN,
        ] {
            let last = plan.steps.last().expect("non-empty plan");
            assert!(
                last.sql.starts_with(&format!("DELETE FROM {}", plan.root)),
                "{} plan must end by deleting its root, ends with: {}",
                plan.root,
                last.sql
            );
        }
    }

    #[test]
    fn class_plan_follows_dependency_order() {
        let p = &CLASS_PLAN;
        assert!(position(p, "results via exams") < position(p, "exams"));
        assert!(position(p, "results via assignments") < position(p, "assignments"));
        assert!(position(p, "exams") < position(p, "lessons"));
        assert!(position(p, "assignments") < position(p, "lessons"));
        assert!(position(p, "attendances") < position(p, "lessons"));
        assert!(position(p, "lessons") < position(p, "classes"));
        assert!(position(p, "events") < position(p, "classes"));
        assert!(position(p, "announcements") < position(p, "classes"));
    }

    #[test]
    fn identity_plans_remove_extension_before_identity() {
        assert!(position(&TEACHER_PLAN, "teachers") < position(&TEACHER_PLAN, "users"));
        assert!(position(&STUDENT_PLAN, "students") < position(&STUDENT_PLAN, "users"));
        assert!(position(&PARENT_PLAN, "parents") < position(&PARENT_PLAN, "users"));
    }

    #[test]
    fn teacher_plan_unassigns_classes_instead_of_deleting_them() {
        let step = TEACHER_PLAN
            .steps
            .iter()
            .find(|s| s.label == "unassign supervised classes")
            .expect("unassign step");
        assert!(step.sql.starts_with("UPDATE classes SET supervisor_id = NULL"));
        assert!(!TEACHER_PLAN.steps.iter().any(|s| s.sql.starts_with("DELETE FROM classes")));
    }

    #[test]
    fn parent_plan_clears_children_subtree_before_parent_rows() {
        let p = &PARENT_PLAN;
        let children = position(p, "children students and identities");
        assert!(position(p, "children results") < children);
        assert!(position(p, "children attendances") < children);
        assert!(position(p, "children payments") < children);
        assert!(children < position(p, "parents"));
    }

    #[test]
    fn all_steps_are_parameterized_on_the_root_id() {
        for plan in [
            &CLASS_PLAN,
            &LESSON_PLAN,
            &SUBJECT_PLAN,
            &EXAM_PLAN,
            &ASSIGNMENT_PLAN,
            &TEACHER_PLAN,
            &STUDENT_PLAN,
            &PARENT_PLAN,
        ] {
            for step in plan.steps {
                assert!(
                    step.sql.contains("$1"),
                    "{} / {} is not parameterized",
                    plan.root,
                    step.label
                );
            }
        }
    }
}
