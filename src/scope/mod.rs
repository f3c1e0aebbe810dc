//! Role-derived visibility predicates, one function per entity family.
//!
//! Every list and detail read goes through one of these. The returned
//! predicate is AND-ed with whatever URL filters the caller supplied, so a
//! `class_id` filter can narrow a teacher's view but never widen it. Admin
//! is the only unrestricted role; an unknown role cannot reach this layer
//! (the session middleware rejects it).

use uuid::Uuid;

use crate::filter::{Param, Predicate};
use crate::models::Role;

/// Students: a teacher sees the classes they supervise, a student sees
/// themselves, a parent sees their own children.
pub fn students(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::exists(
            "SELECT 1 FROM classes c WHERE c.id = student_directory.class_id AND c.supervisor_id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Student => Predicate::eq("id", viewer),
        Role::Parent => Predicate::eq("parent_id", viewer),
    }
}

/// Teachers are directory data: visible to every authenticated role.
pub fn teachers(_role: Role, _viewer: Uuid) -> Predicate {
    Predicate::All
}

pub fn parents(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::exists(
            "SELECT 1 FROM students s JOIN classes c ON c.id = s.class_id \
             WHERE s.parent_id = parent_directory.id AND c.supervisor_id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Student => Predicate::exists(
            "SELECT 1 FROM students s WHERE s.id = ? AND s.parent_id = parent_directory.id",
            vec![Param::Uuid(viewer)],
        ),
        Role::Parent => Predicate::eq("id", viewer),
    }
}

pub fn lessons(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::eq("teacher_id", viewer),
        Role::Student => Predicate::exists(
            "SELECT 1 FROM students s WHERE s.id = ? AND s.class_id = lessons.class_id",
            vec![Param::Uuid(viewer)],
        ),
        Role::Parent => Predicate::exists(
            "SELECT 1 FROM students s WHERE s.parent_id = ? AND s.class_id = lessons.class_id",
            vec![Param::Uuid(viewer)],
        ),
    }
}

pub fn exams(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::exists(
            "SELECT 1 FROM lessons l WHERE l.id = exams.lesson_id AND l.teacher_id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Student => Predicate::exists(
            "SELECT 1 FROM lessons l JOIN students s ON s.class_id = l.class_id \
             WHERE l.id = exams.lesson_id AND s.id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Parent => Predicate::exists(
            "SELECT 1 FROM lessons l JOIN students s ON s.class_id = l.class_id \
             WHERE l.id = exams.lesson_id AND s.parent_id = ?",
            vec![Param::Uuid(viewer)],
        ),
    }
}

pub fn assignments(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::exists(
            "SELECT 1 FROM lessons l WHERE l.id = assignments.lesson_id AND l.teacher_id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Student => Predicate::exists(
            "SELECT 1 FROM lessons l JOIN students s ON s.class_id = l.class_id \
             WHERE l.id = assignments.lesson_id AND s.id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Parent => Predicate::exists(
            "SELECT 1 FROM lessons l JOIN students s ON s.class_id = l.class_id \
             WHERE l.id = assignments.lesson_id AND s.parent_id = ?",
            vec![Param::Uuid(viewer)],
        ),
    }
}

/// Results link to exactly one of exam/assignment, so the teacher's reach
/// goes through whichever side is set.
pub fn results(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::or(vec![
            Predicate::exists(
                "SELECT 1 FROM exams e JOIN lessons l ON l.id = e.lesson_id \
                 WHERE e.id = results.exam_id AND l.teacher_id = ?",
                vec![Param::Uuid(viewer)],
            ),
            Predicate::exists(
                "SELECT 1 FROM assignments a JOIN lessons l ON l.id = a.lesson_id \
                 WHERE a.id = results.assignment_id AND l.teacher_id = ?",
                vec![Param::Uuid(viewer)],
            ),
        ]),
        Role::Student => Predicate::eq("student_id", viewer),
        Role::Parent => Predicate::exists(
            "SELECT 1 FROM students s WHERE s.id = results.student_id AND s.parent_id = ?",
            vec![Param::Uuid(viewer)],
        ),
    }
}

pub fn attendances(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::exists(
            "SELECT 1 FROM lessons l WHERE l.id = attendances.lesson_id AND l.teacher_id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Student => Predicate::eq("student_id", viewer),
        Role::Parent => Predicate::exists(
            "SELECT 1 FROM students s WHERE s.id = attendances.student_id AND s.parent_id = ?",
            vec![Param::Uuid(viewer)],
        ),
    }
}

/// Events are visible when global (`class_id` null) or when the class is
/// reachable from the caller.
pub fn events(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::or(vec![
            Predicate::IsNull("class_id"),
            Predicate::exists(
                "SELECT 1 FROM lessons l WHERE l.class_id = events.class_id AND l.teacher_id = ?",
                vec![Param::Uuid(viewer)],
            ),
        ]),
        Role::Student => Predicate::or(vec![
            Predicate::IsNull("class_id"),
            Predicate::exists(
                "SELECT 1 FROM students s WHERE s.id = ? AND s.class_id = events.class_id",
                vec![Param::Uuid(viewer)],
            ),
        ]),
        Role::Parent => Predicate::or(vec![
            Predicate::IsNull("class_id"),
            Predicate::exists(
                "SELECT 1 FROM students s WHERE s.parent_id = ? AND s.class_id = events.class_id",
                vec![Param::Uuid(viewer)],
            ),
        ]),
    }
}

pub fn announcements(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::or(vec![
            Predicate::IsNull("class_id"),
            Predicate::exists(
                "SELECT 1 FROM lessons l WHERE l.class_id = announcements.class_id AND l.teacher_id = ?",
                vec![Param::Uuid(viewer)],
            ),
        ]),
        Role::Student => Predicate::or(vec![
            Predicate::IsNull("class_id"),
            Predicate::exists(
                "SELECT 1 FROM students s WHERE s.id = ? AND s.class_id = announcements.class_id",
                vec![Param::Uuid(viewer)],
            ),
        ]),
        Role::Parent => Predicate::or(vec![
            Predicate::IsNull("class_id"),
            Predicate::exists(
                "SELECT 1 FROM students s WHERE s.parent_id = ? AND s.class_id = announcements.class_id",
                vec![Param::Uuid(viewer)],
            ),
        ]),
    }
}

/// Messages: sender or addressed recipient.
pub fn messages(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        _ => Predicate::or(vec![
            Predicate::eq("sender_id", viewer),
            Predicate::exists(
                "SELECT 1 FROM message_recipients r \
                 WHERE r.message_id = messages.id AND r.recipient_id = ?",
                vec![Param::Uuid(viewer)],
            ),
        ]),
    }
}

pub fn payments(role: Role, viewer: Uuid) -> Predicate {
    match role {
        Role::Admin => Predicate::All,
        Role::Teacher => Predicate::exists(
            "SELECT 1 FROM students s JOIN classes c ON c.id = s.class_id \
             WHERE s.id = payments.student_id AND c.supervisor_id = ?",
            vec![Param::Uuid(viewer)],
        ),
        Role::Student => Predicate::eq("student_id", viewer),
        Role::Parent => Predicate::exists(
            "SELECT 1 FROM students s WHERE s.id = payments.student_id AND s.parent_id = ?",
            vec![Param::Uuid(viewer)],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(p: Predicate) -> (String, Vec<Param>) {
        let mut params = vec![];
        let sql = p.to_sql(&mut params);
        (sql, params)
    }

    #[test]
    fn admin_is_unrestricted_everywhere() {
        let id = Uuid::new_v4();
        for pred in [
            students(Role::Admin, id),
            results(Role::Admin, id),
            attendances(Role::Admin, id),
            payments(Role::Admin, id),
        ] {
            assert_eq!(render(pred).0, "1=1");
        }
    }

    #[test]
    fn parent_attendance_scope_pins_parent_id() {
        let parent = Uuid::new_v4();
        let (sql, params) = render(attendances(Role::Parent, parent));
        assert!(
            sql.contains("s.id = attendances.student_id AND s.parent_id = $1"),
            "got: {}",
            sql
        );
        assert_eq!(params, vec![Param::Uuid(parent)]);
    }

    #[test]
    fn student_sees_only_own_rows() {
        let student = Uuid::new_v4();
        let (sql, params) = render(students(Role::Student, student));
        assert_eq!(sql, "\"id\" = $1");
        assert_eq!(params, vec![Param::Uuid(student)]);
        let (sql, _) = render(results(Role::Student, student));
        assert_eq!(sql, "\"student_id\" = $1");
    }

    #[test]
    fn teacher_student_scope_goes_through_supervised_class() {
        let teacher = Uuid::new_v4();
        let (sql, params) = render(students(Role::Teacher, teacher));
        assert!(sql.starts_with("EXISTS ("), "got: {}", sql);
        assert!(sql.contains("c.supervisor_id = $1"));
        assert_eq!(params, vec![Param::Uuid(teacher)]);
    }

    #[test]
    fn teacher_result_scope_covers_both_assessment_sides() {
        let teacher = Uuid::new_v4();
        let (sql, params) = render(results(Role::Teacher, teacher));
        assert!(sql.contains("results.exam_id"));
        assert!(sql.contains("results.assignment_id"));
        assert!(sql.contains(" OR "));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn events_allow_global_rows_for_every_role() {
        let id = Uuid::new_v4();
        for role in [Role::Teacher, Role::Student, Role::Parent] {
            let (sql, _) = render(events(role, id));
            assert!(sql.contains("\"class_id\" IS NULL"), "role {:?}: {}", role, sql);
        }
    }

    #[test]
    fn scope_combines_with_url_filter_under_and() {
        let parent = Uuid::new_v4();
        let combined = Predicate::and(vec![
            students(Role::Parent, parent),
            Predicate::eq("class_id", 9),
        ]);
        let (sql, params) = render(combined);
        assert_eq!(sql, "(\"parent_id\" = $1 AND \"class_id\" = $2)");
        assert_eq!(params.len(), 2);
    }
}
