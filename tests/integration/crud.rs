mod support;

use support::{fixture, EKOBADD, EKOBADDS_PROJECT};
use tabula::types::Result;
use tabula::{JoinOn, Relation, Value};

#[test]
fn create_then_read_round_trips() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;

    let mut user = users.blank();
    user.set("username", "bipnboop")?;
    user.set("password", "passalasso")?;
    let id = users.create(&mut user)?.expect("insert accepted");
    assert_eq!(user.id(), Some(id));
    assert!(matches!(user.get("created_on")?, Value::DateTime(_)));

    let read = users.read(id)?.expect("row exists");
    assert_eq!(read.get("username")?, &Value::from("bipnboop"));
    assert_eq!(read.get("password")?, &Value::from("passalasso"));
    assert!(read.get("manager_id")?.is_null());
    assert_eq!(read.get("created_on")?, user.get("created_on")?);
    Ok(())
}

#[test]
fn created_rows_link_through_ids() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;
    let projects = fx.registry.with_table("projects")?;

    let mut owner = users.blank();
    owner.set("username", "ekobadd")?;
    owner.set("password", "password123")?;
    let owner_id = users.create(&mut owner)?.expect("owner inserted");

    let mut project = projects.blank();
    project.set("title", "Scandalines")?;
    project.set("owner_id", owner_id)?;
    let project_id = projects.create(&mut project)?.expect("project inserted");

    let read_project = projects.read(project_id)?.expect("project exists");
    let owner_ref = read_project.get("owner_id")?.as_i64().expect("owner id");
    let read_owner = users.read(owner_ref)?.expect("owner exists");
    assert_eq!(read_owner.get("password")?, &Value::from("password123"));
    Ok(())
}

#[test]
fn read_one_by_column_counts_rows() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;

    let found = users.read_one_by_column("username", "ekobadd")?;
    assert_eq!(found.id(), Some(EKOBADD));
    assert_eq!(found.get("password")?, &Value::from("password123"));

    assert!(users
        .read_one_or_none_by_column("username", "nobody")?
        .is_none());
    let err = users.read_one_by_column("username", "nobody").unwrap_err();
    assert_eq!(err.code(), "UnexpectedResultCount");

    let mut twin = users.blank();
    twin.set("username", "ekobadd")?;
    users.create(&mut twin)?.expect("duplicate usernames are allowed");

    assert_eq!(users.read_by_column("username", "ekobadd")?.len(), 2);
    let err = users.read_one_by_column("username", "ekobadd").unwrap_err();
    assert!(matches!(
        err,
        tabula::TabulaError::UnexpectedResultCount { found: 2, .. }
    ));
    let err = users
        .read_one_or_none_by_column("username", "ekobadd")
        .unwrap_err();
    assert_eq!(err.code(), "UnexpectedResultCount");
    Ok(())
}

#[test]
fn update_writes_all_columns() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;

    let mut user = users.read_one_by_column("username", "ekobadd")?;
    user.set("username", "not ekobadd")?;
    user.set("password", "not password123")?;
    assert_eq!(users.update(&mut user)?, Some(1));
    assert!(matches!(user.get("updated_on")?, Value::DateTime(_)));

    let reread = users.read(EKOBADD)?.expect("still there");
    assert_eq!(reread.get("username")?, &Value::from("not ekobadd"));
    assert_eq!(reread.get("password")?, &Value::from("not password123"));
    Ok(())
}

#[test]
fn update_of_missing_row_touches_nothing() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;

    let mut ghost = users.blank();
    ghost.set("id", 9_999)?;
    ghost.set("username", "ghost")?;
    assert_eq!(users.update(&mut ghost)?, Some(0));
    assert!(users.read(9_999)?.is_none());

    let mut unsaved = users.blank();
    let err = users.update(&mut unsaved).unwrap_err();
    assert_eq!(err.code(), "InvalidArgument");
    Ok(())
}

#[test]
fn delete_then_read_is_empty() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;

    let mut user = users.blank();
    user.set("username", "im_gone_soon")?;
    let id = users.create(&mut user)?.expect("inserted");
    assert_eq!(users.delete(id)?, 1);
    assert!(users.read(id)?.is_none());
    assert!(users.read_by_column("username", "im_gone_soon")?.is_empty());
    assert_eq!(users.delete(id)?, 0);

    assert_eq!(users.read(0).unwrap_err().code(), "InvalidArgument");
    assert_eq!(users.read(-3).unwrap_err().code(), "InvalidArgument");
    Ok(())
}

#[test]
fn constraint_violations_yield_no_result() -> Result<()> {
    let fx = fixture()?;
    let tags = fx.registry.with_table("tags")?;

    let mut first = tags.blank();
    first.set("label", "urgent")?;
    assert!(tags.create(&mut first)?.is_some());

    let mut duplicate = tags.blank();
    duplicate.set("label", "urgent")?;
    assert_eq!(tags.create(&mut duplicate)?, None);
    assert!(duplicate.id().is_none());

    let mut unlabeled = tags.blank();
    assert_eq!(tags.create(&mut unlabeled)?, None);

    let mut orphan = tags.blank();
    orphan.set("label", "orphan")?;
    orphan.set("project_id", 404)?;
    assert_eq!(tags.create(&mut orphan)?, None);

    let mut linked = tags.blank();
    linked.set("label", "linked")?;
    linked.set("project_id", EKOBADDS_PROJECT)?;
    assert!(tags.create(&mut linked)?.is_some());

    first.set("label", "linked")?;
    assert_eq!(tags.update(&mut first)?, None);
    Ok(())
}

#[test]
fn unset_columns_keep_table_defaults() -> Result<()> {
    let fx = fixture()?;
    let tags = fx.registry.with_table("tags")?;

    let mut plain = tags.blank();
    plain.set("label", "defaulted")?;
    let id = tags.create(&mut plain)?.expect("inserted");
    let read = tags.read(id)?.expect("exists");
    assert_eq!(read.get("kind")?, &Value::from("plain"));

    let mut empty = tags.blank();
    empty.set("label", "empty kind")?;
    empty.set("kind", "")?;
    let id = tags.create(&mut empty)?.expect("inserted");
    let read = tags.read(id)?.expect("exists");
    assert_eq!(read.get("kind")?, &Value::from(""));
    Ok(())
}

#[test]
fn writes_require_a_matching_base_relation() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;
    let projects = fx.registry.with_table("projects")?;

    let mut user = users.blank();
    user.set("username", "misplaced")?;
    let err = projects.create(&mut user).unwrap_err();
    assert_eq!(err.code(), "InvalidArgument");

    let joined = Relation::from(&users).inner_join(
        &projects,
        JoinOn::new("id", "owner_id").aliases("u", "p"),
    )?;
    assert_eq!(joined.read(1).unwrap_err().code(), "NotSupported");
    assert_eq!(joined.delete(1).unwrap_err().code(), "NotSupported");

    let mut pair = joined.read_one_by_column("u.username", "ekobadd")?;
    assert_eq!(joined.create(&mut pair).unwrap_err().code(), "NotSupported");
    assert_eq!(users.update(&mut pair).unwrap_err().code(), "NotSupported");
    Ok(())
}

#[test]
fn keyword_named_tables_round_trip() -> Result<()> {
    let fx = fixture()?;
    fx.registry
        .database()
        .run_script(r#"CREATE TABLE "order" (id INTEGER PRIMARY KEY, total REAL);"#)?;
    let orders = fx.registry.manage_table("order", "Order")?;

    let mut order = orders.blank();
    order.set("total", 12.5)?;
    let id = orders.create(&mut order)?.expect("inserted");
    let read = orders.read(id)?.expect("exists");
    assert_eq!(read.get("order.total")?, &Value::Float(12.5));
    assert_eq!(orders.read_by_column("total", 12.5)?.len(), 1);

    let err = fx.registry.manage_table("nothing", "Nothing").unwrap_err();
    assert_eq!(err.code(), "UnknownTable");
    Ok(())
}
