use campus_api::filter::{Param, Predicate};
use campus_api::models::Role;
use campus_api::scope;
use uuid::Uuid;

fn render(p: Predicate) -> (String, Vec<Param>) {
    let mut params = vec![];
    let sql = p.to_sql(&mut params);
    (sql, params)
}

// One student, three viewers: the supervising teacher reaches the student
// through their class, the parent through the parent link, and an
// unrelated teacher gets a predicate pinned to their own id, not the
// student's.
#[test]
fn student_visibility_depends_on_relationship_to_viewer() {
    let supervising_teacher = Uuid::new_v4();
    let unrelated_teacher = Uuid::new_v4();
    let parent = Uuid::new_v4();

    let (sql, params) = render(scope::students(Role::Teacher, supervising_teacher));
    assert!(sql.contains("c.supervisor_id = $1"));
    assert_eq!(params, vec![Param::Uuid(supervising_teacher)]);

    let (sql, params) = render(scope::students(Role::Teacher, unrelated_teacher));
    assert!(sql.contains("c.supervisor_id = $1"));
    assert_eq!(params, vec![Param::Uuid(unrelated_teacher)]);

    let (sql, params) = render(scope::students(Role::Parent, parent));
    assert_eq!(sql, "\"parent_id\" = $1");
    assert_eq!(params, vec![Param::Uuid(parent)]);
}

#[test]
fn admin_scope_is_unrestricted_for_every_entity() {
    let admin = Uuid::new_v4();
    for predicate in [
        scope::students(Role::Admin, admin),
        scope::parents(Role::Admin, admin),
        scope::lessons(Role::Admin, admin),
        scope::exams(Role::Admin, admin),
        scope::assignments(Role::Admin, admin),
        scope::results(Role::Admin, admin),
        scope::attendances(Role::Admin, admin),
        scope::events(Role::Admin, admin),
        scope::announcements(Role::Admin, admin),
        scope::messages(Role::Admin, admin),
        scope::payments(Role::Admin, admin),
    ] {
        assert_eq!(render(predicate).0, "1=1");
    }
}

#[test]
fn student_and_parent_record_scopes_pin_ownership() {
    let student = Uuid::new_v4();
    let parent = Uuid::new_v4();

    let (sql, _) = render(scope::results(Role::Student, student));
    assert_eq!(sql, "\"student_id\" = $1");

    let (sql, params) = render(scope::results(Role::Parent, parent));
    assert!(sql.contains("s.parent_id = $1"));
    assert_eq!(params, vec![Param::Uuid(parent)]);

    let (sql, _) = render(scope::payments(Role::Student, student));
    assert_eq!(sql, "\"student_id\" = $1");
}

#[test]
fn teacher_results_scope_reaches_through_both_assessment_kinds() {
    let teacher = Uuid::new_v4();
    let (sql, params) = render(scope::results(Role::Teacher, teacher));
    assert!(sql.contains("results.exam_id"));
    assert!(sql.contains("results.assignment_id"));
    assert_eq!(params, vec![Param::Uuid(teacher), Param::Uuid(teacher)]);
}

#[test]
fn url_filters_narrow_but_never_widen_the_scope() {
    let parent = Uuid::new_v4();
    let other_child_class = 99;

    // A parent filtering on some class still keeps the parent_id pin, so
    // rows of unrelated students in that class stay invisible.
    let combined = Predicate::and(vec![
        scope::students(Role::Parent, parent),
        Predicate::eq("class_id", other_child_class),
    ]);
    let (sql, params) = render(combined);
    assert_eq!(sql, "(\"parent_id\" = $1 AND \"class_id\" = $2)");
    assert_eq!(
        params,
        vec![Param::Uuid(parent), Param::Int(other_child_class as i64)]
    );
}

#[test]
fn global_events_are_visible_to_everyone_but_class_events_are_gated() {
    let viewer = Uuid::new_v4();
    for role in [Role::Teacher, Role::Student, Role::Parent] {
        let (sql, params) = render(scope::events(role, viewer));
        assert!(sql.contains("\"class_id\" IS NULL"), "role {:?}: {}", role, sql);
        assert!(sql.contains("EXISTS ("), "role {:?}: {}", role, sql);
        assert_eq!(params, vec![Param::Uuid(viewer)]);
    }
}

#[test]
fn messages_are_visible_to_sender_and_recipients_only() {
    let user = Uuid::new_v4();
    let (sql, params) = render(scope::messages(Role::Student, user));
    assert!(sql.contains("\"sender_id\" = $1"));
    assert!(sql.contains("r.recipient_id = $2"));
    assert_eq!(params.len(), 2);
}
