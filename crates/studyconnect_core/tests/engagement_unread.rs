use rusqlite::{params, Connection};
use studyconnect_core::db::open_db_in_memory;
use studyconnect_core::{
    CoreError, EngagementTracker, ErrorKind, GroupId, GroupResolver, JoinOutcome, MembershipGuard,
    Post, PostId, PostRepository, SqliteGroupRepository, SqliteMembershipRepository,
    SqlitePostRepository, SqliteUserRepository, UserId, UserService,
};
use std::collections::BTreeSet;
use uuid::Uuid;

fn register(conn: &mut Connection, email: &str) -> UserId {
    let mut service = UserService::new(SqliteUserRepository::new(conn));
    service
        .register(email, "Test Student", "Computer Science", Vec::new())
        .unwrap()
        .id
}

fn provision_group(conn: &mut Connection, subject: &str, user_id: UserId) -> GroupId {
    let mut resolver = GroupResolver::new(SqliteGroupRepository::new(conn));
    resolver
        .recommend(subject, user_id, &BTreeSet::new())
        .unwrap()
        .recommended
        .group_id
}

fn join(conn: &mut Connection, user_id: UserId, group_id: GroupId) {
    let mut guard = MembershipGuard::new(SqliteMembershipRepository::new(conn));
    assert_eq!(guard.join(user_id, group_id).unwrap(), JoinOutcome::Joined);
}

fn post(conn: &mut Connection, group_id: GroupId, author_id: UserId, title: &str) -> PostId {
    let mut repo = SqlitePostRepository::new(conn);
    repo.create_post(&Post::new(group_id, author_id, title, "body"))
        .unwrap()
}

fn unread_for(conn: &mut Connection, user_id: UserId, group_id: GroupId) -> u32 {
    let tracker = EngagementTracker::new(SqlitePostRepository::new(conn));
    tracker
        .unread_counts(user_id)
        .unwrap()
        .get(&group_id)
        .copied()
        .unwrap_or(0)
}

fn view_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM post_views;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn mark_all_read_clears_unread_posts_once() {
    let mut conn = open_db_in_memory().unwrap();
    let reader = register(&mut conn, "reader@student.elte.hu");
    let author = register(&mut conn, "author@student.elte.hu");

    let group = provision_group(&mut conn, "Algebra", reader);
    join(&mut conn, reader, group);
    join(&mut conn, author, group);
    assert_eq!(unread_for(&mut conn, reader, group), 0);

    post(&mut conn, group, author, "First");
    post(&mut conn, group, author, "Second");
    assert_eq!(unread_for(&mut conn, reader, group), 2);

    let marked = {
        let mut tracker = EngagementTracker::new(SqlitePostRepository::new(&mut conn));
        tracker.mark_all_read(reader, group).unwrap()
    };
    assert_eq!(marked, 2);
    assert_eq!(unread_for(&mut conn, reader, group), 0);

    // Repeating the call inserts nothing new.
    let repeated = {
        let mut tracker = EngagementTracker::new(SqlitePostRepository::new(&mut conn));
        tracker.mark_all_read(reader, group).unwrap()
    };
    assert_eq!(repeated, 0);
    assert_eq!(view_count(&conn), 2);
}

#[test]
fn own_posts_never_count_as_unread() {
    let mut conn = open_db_in_memory().unwrap();
    let writer = register(&mut conn, "writer@student.elte.hu");
    let peer = register(&mut conn, "peer@student.elte.hu");

    let group = provision_group(&mut conn, "Databases", writer);
    join(&mut conn, writer, group);
    join(&mut conn, peer, group);

    post(&mut conn, group, writer, "Self-authored");
    assert_eq!(unread_for(&mut conn, writer, group), 0);
    assert_eq!(unread_for(&mut conn, peer, group), 1);
}

#[test]
fn posts_published_before_joining_are_ignored() {
    let mut conn = open_db_in_memory().unwrap();
    let author = register(&mut conn, "earlier@student.elte.hu");
    let latecomer = register(&mut conn, "latecomer@student.elte.hu");

    let group = provision_group(&mut conn, "Statistics", author);
    join(&mut conn, author, group);
    let old_post = post(&mut conn, group, author, "Before the join");
    // Push the post firmly into the past so the join timestamp is newer.
    conn.execute(
        "UPDATE posts SET created_at = created_at - 60000 WHERE id = ?1;",
        params![old_post.to_string()],
    )
    .unwrap();

    join(&mut conn, latecomer, group);
    assert_eq!(unread_for(&mut conn, latecomer, group), 0);

    post(&mut conn, group, author, "After the join");
    assert_eq!(unread_for(&mut conn, latecomer, group), 1);
}

#[test]
fn soft_deleted_posts_are_invisible_to_unread_counts() {
    let mut conn = open_db_in_memory().unwrap();
    let author = register(&mut conn, "deleter@student.elte.hu");
    let reader = register(&mut conn, "observer@student.elte.hu");

    let group = provision_group(&mut conn, "Compilers", author);
    join(&mut conn, author, group);
    join(&mut conn, reader, group);

    let kept = post(&mut conn, group, author, "Kept");
    let removed = post(&mut conn, group, author, "Removed");
    {
        let mut repo = SqlitePostRepository::new(&mut conn);
        repo.soft_delete_post(removed).unwrap();
    }
    assert_eq!(unread_for(&mut conn, reader, group), 1);

    // Marking read records a view only for the post that is still active.
    let marked = {
        let mut tracker = EngagementTracker::new(SqlitePostRepository::new(&mut conn));
        tracker.mark_all_read(reader, group).unwrap()
    };
    assert_eq!(marked, 1);
    let repo = SqlitePostRepository::new(&mut conn);
    assert!(repo.has_view(reader, kept).unwrap());
    assert!(!repo.has_view(reader, removed).unwrap());
}

#[test]
fn soft_deletion_leaves_a_readable_tombstone() {
    let mut conn = open_db_in_memory().unwrap();
    let author = register(&mut conn, "tombstone@student.elte.hu");

    let group = provision_group(&mut conn, "Cryptography", author);
    join(&mut conn, author, group);
    let post_id = post(&mut conn, group, author, "Ephemeral");
    {
        let mut repo = SqlitePostRepository::new(&mut conn);
        repo.soft_delete_post(post_id).unwrap();
    }

    let repo = SqlitePostRepository::new(&mut conn);
    let stored = repo.get_post(post_id).unwrap().unwrap();
    assert_eq!(stored.title, "Ephemeral");
    assert!(stored.deleted_at.is_some());
    assert!(!stored.is_active());
    assert!(repo.get_post(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn deleting_a_missing_post_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();

    let missing = Uuid::new_v4();
    let err = {
        let mut repo = SqlitePostRepository::new(&mut conn);
        repo.soft_delete_post(missing).unwrap_err()
    };
    let err = CoreError::from(err);
    assert!(matches!(err, CoreError::PostNotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn every_membership_appears_in_the_counts_map() {
    let mut conn = open_db_in_memory().unwrap();
    let user = register(&mut conn, "multi@student.elte.hu");

    let algebra = provision_group(&mut conn, "Algebra", user);
    let logic = provision_group(&mut conn, "Logic", user);
    join(&mut conn, user, algebra);
    join(&mut conn, user, logic);

    let counts = {
        let tracker = EngagementTracker::new(SqlitePostRepository::new(&mut conn));
        tracker.unread_counts(user).unwrap()
    };
    assert_eq!(counts.len(), 2);
    assert_eq!(counts.get(&algebra), Some(&0));
    assert_eq!(counts.get(&logic), Some(&0));
}

#[test]
fn marking_read_requires_membership() {
    let mut conn = open_db_in_memory().unwrap();
    let member = register(&mut conn, "insider@student.elte.hu");
    let outsider = register(&mut conn, "outsider@student.elte.hu");

    let group = provision_group(&mut conn, "Networks", member);
    join(&mut conn, member, group);

    let err = {
        let mut tracker = EngagementTracker::new(SqlitePostRepository::new(&mut conn));
        tracker.mark_all_read(outsider, group).unwrap_err()
    };
    assert!(matches!(err, CoreError::Forbidden(_)));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn marking_read_in_a_missing_group_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let user = register(&mut conn, "ghost@student.elte.hu");

    let missing = Uuid::new_v4();
    let err = {
        let mut tracker = EngagementTracker::new(SqlitePostRepository::new(&mut conn));
        tracker.mark_all_read(user, missing).unwrap_err()
    };
    assert!(matches!(err, CoreError::GroupNotFound(id) if id == missing));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn new_posts_become_unread_after_a_mark() {
    let mut conn = open_db_in_memory().unwrap();
    let reader = register(&mut conn, "fresh@student.elte.hu");
    let author = register(&mut conn, "prolific@student.elte.hu");

    let group = provision_group(&mut conn, "Automata", reader);
    join(&mut conn, reader, group);
    join(&mut conn, author, group);

    post(&mut conn, group, author, "Round one");
    let marked = {
        let mut tracker = EngagementTracker::new(SqlitePostRepository::new(&mut conn));
        tracker.mark_all_read(reader, group).unwrap()
    };
    assert_eq!(marked, 1);

    post(&mut conn, group, author, "Round two");
    assert_eq!(unread_for(&mut conn, reader, group), 1);
}
