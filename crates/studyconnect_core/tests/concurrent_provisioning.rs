use rusqlite::Connection;
use std::collections::BTreeSet;
use std::thread;
use studyconnect_core::db::open_db;
use studyconnect_core::repo::membership_repo::JoinWrite;
use studyconnect_core::{
    GroupRepository, GroupResolver, JoinOutcome, MembershipGuard, MembershipRepository,
    ProvisionOutcome, SqliteGroupRepository, SqliteMembershipRepository, SqliteUserRepository,
    UserId, UserService,
};

fn register(conn: &mut Connection, email: &str) -> UserId {
    let mut service = UserService::new(SqliteUserRepository::new(conn));
    service
        .register(email, "Test Student", "Computer Science", Vec::new())
        .unwrap()
        .id
}

fn group_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM groups;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn first_group_provisioning_races_to_a_single_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.sqlite3");
    let mut conn_a = open_db(&path).unwrap();
    let mut conn_b = open_db(&path).unwrap();

    let winner = register(&mut conn_a, "winner@student.elte.hu");
    let rival = register(&mut conn_b, "rival@student.elte.hu");

    let outcome_a = {
        let mut repo = SqliteGroupRepository::new(&mut conn_a);
        repo.create_first_group("Topology", winner).unwrap()
    };
    assert!(matches!(outcome_a, ProvisionOutcome::Created(_)));

    // The second writer re-checks its precondition under the write lock and
    // must back off instead of inserting a duplicate.
    let outcome_b = {
        let mut repo = SqliteGroupRepository::new(&mut conn_b);
        repo.create_first_group("Topology", rival).unwrap()
    };
    assert_eq!(outcome_b, ProvisionOutcome::Raced);
    assert_eq!(group_count(&conn_a), 1);
}

#[test]
fn overflow_provisioning_backs_off_when_an_empty_sibling_exists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overflow.sqlite3");
    let mut conn_a = open_db(&path).unwrap();
    let mut conn_b = open_db(&path).unwrap();

    let winner = register(&mut conn_a, "winner@student.elte.hu");
    let rival = register(&mut conn_b, "rival@student.elte.hu");

    let outcome_a = {
        let mut repo = SqliteGroupRepository::new(&mut conn_a);
        repo.create_overflow_group("Topology", winner).unwrap()
    };
    assert!(matches!(outcome_a, ProvisionOutcome::Created(_)));

    let outcome_b = {
        let mut repo = SqliteGroupRepository::new(&mut conn_b);
        repo.create_overflow_group("Topology", rival).unwrap()
    };
    assert_eq!(outcome_b, ProvisionOutcome::Raced);
    assert_eq!(group_count(&conn_b), 1);
}

#[test]
fn concurrent_recommendations_converge_on_one_group() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("converge.sqlite3");
    let user = {
        let mut conn = open_db(&path).unwrap();
        register(&mut conn, "racer@student.elte.hu")
    };

    let mut handles = Vec::new();
    for _ in 0..4 {
        let path = path.clone();
        handles.push(thread::spawn(move || {
            let mut conn = open_db(&path).unwrap();
            let mut resolver = GroupResolver::new(SqliteGroupRepository::new(&mut conn));
            resolver
                .recommend("Topology", user, &BTreeSet::new())
                .unwrap()
        }));
    }

    for handle in handles {
        let recommendation = handle.join().unwrap();
        assert_eq!(recommendation.recommended.subject, "Topology");
        assert_eq!(recommendation.recommended.name, "Topology Study Group #1");
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(group_count(&conn), 1);
}

#[test]
fn subject_exclusivity_holds_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exclusive.sqlite3");
    let mut conn_a = open_db(&path).unwrap();
    let mut conn_b = open_db(&path).unwrap();

    let user = register(&mut conn_a, "member@student.elte.hu");
    let founder = register(&mut conn_b, "founder@student.elte.hu");

    let first = {
        let mut resolver = GroupResolver::new(SqliteGroupRepository::new(&mut conn_a));
        let recommendation = resolver
            .recommend("Databases", user, &BTreeSet::new())
            .unwrap();
        recommendation.recommended.group_id
    };
    {
        let mut guard = MembershipGuard::new(SqliteMembershipRepository::new(&mut conn_a));
        assert_eq!(guard.join(user, first).unwrap(), JoinOutcome::Joined);
    }

    // A sibling group of the same subject, provisioned over the other
    // connection once the first is populated.
    let sibling = {
        let mut resolver = GroupResolver::new(SqliteGroupRepository::new(&mut conn_b));
        let recommendation = resolver
            .recommend("Databases", founder, &BTreeSet::new())
            .unwrap();
        recommendation
            .all_groups
            .iter()
            .find(|summary| summary.group_id != first)
            .unwrap()
            .group_id
    };

    let verdict = {
        let mut repo = SqliteMembershipRepository::new(&mut conn_b);
        repo.join_group(user, sibling).unwrap()
    };
    assert_eq!(verdict, JoinWrite::DuplicateSubject);

    let memberships: i64 = conn_b
        .query_row(
            "SELECT COUNT(*) FROM group_members WHERE user_id = ?1;",
            [user.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(memberships, 1);
}
