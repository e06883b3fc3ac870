mod support;

use serde_json::json;
use support::{fixture, open_database, EKOBADD, EKOFREN, WAGIE};
use tabula::types::Result;
use tabula::{EntityDict, JoinKind, JoinOn, Member, Relation, RelationRegistry, Relational, Value};

#[test]
fn joined_reads_answer_every_access_mode() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let pair = users
        .inner_join(
            fx.registry.relation("projects")?,
            JoinOn::new("id", "owner_id").aliases("u", "p"),
        )?
        .read_one_by_column("username", "ekobadd")?;

    assert_eq!(pair.get("username")?, &Value::from("ekobadd"));
    assert_eq!(pair.get("password")?, &Value::from("password123"));
    assert_eq!(pair.get("owner_id")?, pair.get("u.id")?);
    assert_eq!(pair.get("title")?, &Value::from("ekobadds project"));

    assert_eq!(pair.get("users.username")?, &Value::from("ekobadd"));
    assert_eq!(pair.get("projects.owner_id")?, pair.get("users.id")?);
    assert_eq!(pair.get("projects.title")?, &Value::from("ekobadds project"));

    assert_eq!(pair.get("u.password")?, &Value::from("password123"));
    assert_eq!(pair.get("p.owner_id")?, &Value::Int(EKOBADD));

    let Member::Entity(owner) = pair.member("u")? else {
        panic!("alias should resolve to the users side");
    };
    let Member::Entity(project) = pair.member("projects")? else {
        panic!("table name should resolve to the projects side");
    };
    assert_eq!(project.get("owner_id")?, owner.get("id")?);
    assert!(matches!(pair.member("title")?, Member::Value(v) if v == &Value::from("ekobadds project")));
    assert_eq!(pair.get("id").unwrap_err().code(), "AmbiguousColumn");
    Ok(())
}

#[test]
fn self_join_requires_qualification() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let twins = users.inner_join(&users, JoinOn::new("id", "id").aliases("u1", "u2"))?;

    let row = twins.read_one_by_column("u1.id", EKOBADD)?;
    assert_eq!(row.get("u1.username")?, row.get("u2.username")?);
    assert_eq!(row.get("username").unwrap_err().code(), "AmbiguousColumn");
    assert_eq!(
        twins.read_by_column("id", EKOBADD).unwrap_err().code(),
        "AmbiguousColumn"
    );
    assert_eq!(row.child("users").unwrap_err().code(), "AmbiguousTable");
    Ok(())
}

#[test]
fn two_level_self_join_finds_the_grand_manager() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let chain = users
        .inner_join(&users, JoinOn::new("manager_id", "id").aliases("worker", "manager"))?
        .inner_join(&users, JoinOn::new("manager.manager_id", "id").right_alias("boss"))?;

    let row = chain.read_one_by_column("worker.username", "wagie :(")?;
    assert_eq!(row.get("manager.username")?, &Value::from("lil boss"));
    assert_eq!(row.get("boss.username")?, &Value::from("big boss"));
    assert_eq!(
        chain.table_names(0)?,
        vec!["users".to_string(), "users".into(), "users".into()]
    );
    Ok(())
}

#[test]
fn three_tables_flatten_into_one_dict() -> Result<()> {
    let fx = fixture()?;
    let memberships = fx
        .registry
        .relation("users")?
        .inner_join(
            fx.registry.relation("project_members")?,
            JoinOn::new("id", "user_id").aliases("u", "pm"),
        )?
        .inner_join(
            fx.registry.relation("projects")?,
            JoinOn::new("pm.project_id", "id").right_alias("p"),
        )?;

    let row = memberships.read_one_by_column("p.title", "ekobadds project")?;
    assert_eq!(row.get("u.username")?, &Value::from("ekofren"));

    let EntityDict::Tables(tables) = row.to_dict()? else {
        panic!("joined rows produce one map per table");
    };
    let keys: Vec<&str> = tables.keys().map(String::as_str).collect();
    assert_eq!(keys, ["p", "pm", "u"]);
    assert_eq!(tables["pm"]["user_id"], tables["u"]["id"]);
    Ok(())
}

#[test]
fn dict_and_json_match_qualified_access() -> Result<()> {
    let fx = fixture()?;
    let pair = fx
        .registry
        .relation("users")?
        .inner_join(
            fx.registry.relation("projects")?,
            JoinOn::new("id", "owner_id").aliases("u", "p"),
        )?
        .read_one_by_column("u.username", "ekobadd")?;

    let dict = pair.to_dict()?;
    assert_eq!(dict, pair.to_dict()?);
    let EntityDict::Tables(tables) = &dict else {
        panic!("expected per-table maps");
    };
    assert_eq!(&tables["u"]["username"], pair.get("u.username")?);
    assert_eq!(&tables["p"]["title"], pair.get("p.title")?);

    let rendered = pair.to_json()?;
    assert_eq!(rendered["u"]["username"], json!("ekobadd"));
    assert_eq!(rendered["p"]["title"], json!("ekobadds project"));
    assert_eq!(rendered["p"]["created_on"], json!(null));
    Ok(())
}

#[test]
fn outer_kinds_keep_unmatched_rows() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let projects = fx.registry.relation("projects")?;
    let on = JoinOn::new("id", "owner_id").aliases("u", "p");

    let left = users.left_join(&projects, on.clone())?;
    let row = left.read_one_by_column("u.username", "ekofren")?;
    assert!(row.get("p.title")?.is_null());
    assert!(row.get("p.id")?.is_null());

    let right = users.right_join(&projects, on.clone())?;
    assert!(right.read_by_column("u.username", "ekofren")?.is_empty());
    assert_eq!(right.read_by_column("p.title", "ekobadds project")?.len(), 1);

    let outer = users.outer_join(&projects, on)?;
    assert!(outer
        .relation_expression()?
        .contains(JoinKind::Outer.sql()));
    assert_eq!(outer.read_by_column("u.username", "big boss")?.len(), 1);
    Ok(())
}

#[test]
fn joins_stay_within_one_registry() -> Result<()> {
    let fx = fixture()?;
    let other = RelationRegistry::new(open_database(&fx.dir)?);
    other.manage_table("projects", "Project")?;

    let users = fx.registry.relation("users")?;
    let foreign = other.relation("projects")?;
    let err = users
        .inner_join(foreign, JoinOn::new("id", "owner_id"))
        .unwrap_err();
    assert_eq!(err.code(), "CrossRegistry");
    Ok(())
}

#[test]
fn joined_children_cannot_be_aliased() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let pair = users.inner_join(
        fx.registry.relation("projects")?,
        JoinOn::new("id", "owner_id").aliases("u", "p"),
    )?;

    let err = Relation::from(&pair)
        .inner_join(&users, JoinOn::new("u.id", "id").left_alias("up"))
        .unwrap_err();
    assert_eq!(err.code(), "InvalidAlias");

    let err = pair
        .resolve_column(&tabula::ColumnRef::new("title"), Some("x"), 0)
        .unwrap_err();
    assert_eq!(err.code(), "InvalidAlias");

    let err = users
        .inner_join(&users, JoinOn::new("id", "missing").aliases("a", "b"))
        .unwrap_err();
    assert_eq!(err.code(), "ColumnNotFound");
    Ok(())
}

#[test]
fn table_joined_to_its_aliased_self_reads_back() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let managed = users.inner_join(&users, JoinOn::new("manager_id", "id").right_alias("boss"))?;

    let row = managed.read_one_by_column("boss.username", "lil boss")?;
    assert_eq!(row.get("boss.username")?, &Value::from("lil boss"));
    let worker = row.as_joined().expect("joined row").left();
    assert_eq!(worker.id(), Some(WAGIE));
    assert_eq!(worker.get("username")?, &Value::from("wagie :("));
    assert_eq!(row.get("users.username").unwrap_err().code(), "AmbiguousColumn");

    let EntityDict::Tables(tables) = row.to_dict()? else {
        panic!("joined rows produce one map per table");
    };
    let keys: Vec<&str> = tables.keys().map(String::as_str).collect();
    assert_eq!(keys, ["boss", "users"]);
    Ok(())
}

#[test]
fn project_owner_joined_under_an_alias() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let owned = users
        .inner_join(
            fx.registry.relation("project_members")?,
            JoinOn::new("id", "user_id"),
        )?
        .inner_join(fx.registry.relation("projects")?, JoinOn::new("project_id", "id"))?
        .inner_join(&users, JoinOn::new("owner_id", "id").right_alias("owner"))?;

    let row = owned.read_one_by_column("title", "ekobadds project")?;
    assert_eq!(row.get("owner.username")?, &Value::from("ekobadd"));
    assert_eq!(row.get("project_members.user_id")?, &Value::Int(EKOFREN));
    assert_eq!(row.get("owner.id")?, &Value::Int(EKOBADD));

    let EntityDict::Tables(tables) = row.to_dict()? else {
        panic!("joined rows produce one map per table");
    };
    let keys: Vec<&str> = tables.keys().map(String::as_str).collect();
    assert_eq!(keys, ["owner", "project_members", "projects", "users"]);
    assert_eq!(tables["users"]["username"], Value::from("ekofren"));
    Ok(())
}
