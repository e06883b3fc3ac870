mod support;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::json;
use support::{fixture, EKOBADD, EKOFREN};
use tabula::types::Result;
use tabula::{EntityDict, EntityNode, JoinOn, Member, Value};

#[test]
fn leaf_access_is_case_insensitive_and_alias_aware() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;
    let user = users.read(EKOBADD)?.expect("seeded");

    assert_eq!(user.get("USERNAME")?, &Value::from("ekobadd"));
    assert_eq!(user.get("Users.username")?, &Value::from("ekobadd"));
    assert_eq!(
        user.get_with_alias("me.username", Some("me"))?,
        &Value::from("ekobadd")
    );
    assert_eq!(
        user.get("me.username").unwrap_err().code(),
        "ColumnNotFound"
    );
    assert_eq!(
        user.get("username; drop").unwrap_err().code(),
        "InvalidIdentifier"
    );
    assert_eq!(user.get("a.b.c").unwrap_err().code(), "InvalidArgument");

    let leaf = user.as_leaf().expect("base reads produce leaves");
    assert_eq!(leaf.entity_type(), "User");
    assert!(Arc::ptr_eq(&leaf.relation().expect("relation alive"), &users));
    Ok(())
}

#[test]
fn members_fall_back_from_columns_to_tables() -> Result<()> {
    let fx = fixture()?;
    let user = fx.registry.with_table("users")?.read(EKOBADD)?.expect("seeded");

    assert!(matches!(user.member("password")?, Member::Value(_)));
    assert!(matches!(user.member("users")?, Member::Entity(_)));
    assert_eq!(user.member("projects").unwrap_err().code(), "NoSuchMember");
    Ok(())
}

#[test]
fn joined_children_can_be_written_back() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;
    let pair = fx
        .registry
        .relation("users")?
        .inner_join(
            fx.registry.relation("project_members")?,
            JoinOn::new("id", "user_id").aliases("u", "pm"),
        )?;

    let mut row = pair.read_one_by_column("pm.project_id", 1)?;
    row.set("u.password", "rotated")?;
    let mut member = row.child("u")?.expect("users side").clone();
    assert_eq!(member.id(), Some(EKOFREN));
    assert_eq!(users.update(&mut member)?, Some(1));

    let reread = users.read(EKOFREN)?.expect("still there");
    assert_eq!(reread.get("password")?, &Value::from("rotated"));
    Ok(())
}

#[test]
fn put_and_patch_replace_column_values() -> Result<()> {
    let fx = fixture()?;
    let users = fx.registry.with_table("users")?;
    let mut user = users.read(EKOBADD)?.expect("seeded");

    let err = user
        .put([("username", Value::from("partial"))])
        .unwrap_err();
    assert_eq!(err.code(), "MissingColumn");
    assert_eq!(user.get("username")?, &Value::from("ekobadd"));

    let EntityDict::Columns(mut columns) = user.to_dict()? else {
        panic!("leaf dict");
    };
    columns.insert("username".into(), Value::from("replaced"));
    user.put(columns)?;
    assert_eq!(user.get("username")?, &Value::from("replaced"));
    assert_eq!(user.id(), Some(EKOBADD));

    let mut patch = BTreeMap::new();
    patch.insert("password", Value::from("patched"));
    patch.insert("not_a_column", Value::from("ignored"));
    user.patch(patch)?;
    assert_eq!(user.get("password")?, &Value::from("patched"));
    assert_eq!(user.get("username")?, &Value::from("replaced"));

    users.update(&mut user)?;
    let reread = users.read(EKOBADD)?.expect("seeded");
    assert_eq!(reread.get("username")?, &Value::from("replaced"));
    assert_eq!(reread.get("password")?, &Value::from("patched"));
    Ok(())
}

#[test]
fn dicts_render_and_rename() -> Result<()> {
    let fx = fixture()?;
    let user: EntityNode = fx.registry.with_table("users")?.read(EKOBADD)?.expect("seeded");

    let rendered = user.to_json()?;
    assert_eq!(rendered["username"], json!("ekobadd"));
    assert_eq!(rendered["id"], json!(EKOBADD));
    assert_eq!(rendered["manager_id"], json!(null));

    let renames = HashMap::from([("username".to_string(), "login".to_string())]);
    let EntityDict::Columns(columns) = user.to_dict_renamed(&renames)? else {
        panic!("leaf dict");
    };
    assert_eq!(columns["login"], Value::from("ekobadd"));
    assert!(!columns.contains_key("username"));
    assert_eq!(columns["password"], Value::from("password123"));
    Ok(())
}

#[test]
fn blank_entities_come_only_from_base_relations() -> Result<()> {
    use tabula::Relational;

    let fx = fixture()?;
    let users = fx.registry.relation("users")?;
    let blank = users.blank_entity()?;
    assert!(blank.get("username")?.is_null());
    assert_eq!(blank.id(), None);

    let pair = users.inner_join(
        fx.registry.relation("projects")?,
        JoinOn::new("id", "owner_id").aliases("u", "p"),
    )?;
    assert_eq!(pair.blank_entity().unwrap_err().code(), "NotSupported");
    Ok(())
}
