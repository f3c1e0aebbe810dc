use campus_api::actions::cascade::{
    CascadePlan, ASSIGNMENT_PLAN, CLASS_PLAN, EXAM_PLAN, LESSON_PLAN, PARENT_PLAN, STUDENT_PLAN,
    SUBJECT_PLAN, TEACHER_PLAN,
};

static ALL_PLANS: &[&CascadePlan] = &[
    &CLASS_PLAN,
    &LESSON_PLAN,
    &SUBJECT_PLAN,
    &EXAM_PLAN,
    &ASSIGNMENT_PLAN,
    &TEACHER_PLAN,
    &STUDENT_PLAN,
    &PARENT_PLAN,
];

fn position(plan: &CascadePlan, label: &str) -> usize {
    plan.steps
        .iter()
        .position(|s| s.label == label)
        .unwrap_or_else(|| panic!("step '{}' missing from {} plan", label, plan.root))
}

#[test]
fn every_plan_ends_at_its_root() {
    for plan in ALL_PLANS {
        let last = plan.steps.last().expect("non-empty plan");
        assert!(
            last.sql.starts_with(&format!("DELETE FROM {}", plan.root)),
            "{} plan ends with: {}",
            plan.root,
            last.sql
        );
    }
}

#[test]
fn results_always_go_before_their_assessments() {
    for plan in [&CLASS_PLAN, &LESSON_PLAN, &SUBJECT_PLAN, &TEACHER_PLAN] {
        assert!(position(plan, "results via exams") < position(plan, "exams"));
        assert!(position(plan, "results via assignments") < position(plan, "assignments"));
    }
    assert!(position(&EXAM_PLAN, "results") < position(&EXAM_PLAN, "exams"));
    assert!(position(&ASSIGNMENT_PLAN, "results") < position(&ASSIGNMENT_PLAN, "assignments"));
}

#[test]
fn lesson_dependents_go_before_lessons() {
    for plan in [&CLASS_PLAN, &LESSON_PLAN, &SUBJECT_PLAN, &TEACHER_PLAN] {
        for dependent in ["exams", "assignments", "attendances"] {
            assert!(
                position(plan, dependent) < position(plan, "lessons"),
                "{}: {} must precede lessons",
                plan.root,
                dependent
            );
        }
    }
}

#[test]
fn identity_rows_outlive_their_extension_rows() {
    for (plan, extension) in [
        (&TEACHER_PLAN, "teachers"),
        (&STUDENT_PLAN, "students"),
        (&PARENT_PLAN, "parents"),
    ] {
        assert!(position(plan, extension) < position(plan, "users"));
    }
}

#[test]
fn deleting_a_teacher_keeps_their_classes() {
    assert!(TEACHER_PLAN
        .steps
        .iter()
        .any(|s| s.sql.starts_with("UPDATE classes SET supervisor_id = NULL")));
    assert!(!TEACHER_PLAN
        .steps
        .iter()
        .any(|s| s.sql.starts_with("DELETE FROM classes")));
}

#[test]
fn deleting_a_parent_takes_the_children_subtree_first() {
    let children = position(&PARENT_PLAN, "children students and identities");
    for step in [
        "children results",
        "children attendances",
        "children payments",
        "children sent messages",
    ] {
        assert!(position(&PARENT_PLAN, step) < children);
    }
    assert!(children < position(&PARENT_PLAN, "parents"));

    // The combined step removes identity rows located through the
    // still-present extension rows.
    let step = &PARENT_PLAN.steps[children];
    assert!(step.sql.contains("WITH gone AS (DELETE FROM students"));
    assert!(step.sql.contains("DELETE FROM users"));
}

#[test]
fn class_deletion_never_touches_students() {
    assert!(!CLASS_PLAN
        .steps
        .iter()
        .any(|s| s.sql.contains("DELETE FROM students")));
}

#[test]
fn every_step_binds_the_root_id() {
    for plan in ALL_PLANS {
        for step in plan.steps {
            assert!(
                step.sql.contains("$1"),
                "{} / {} not parameterized",
                plan.root,
                step.label
            );
        }
    }
}
