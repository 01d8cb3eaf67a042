use rowshape::common::Value;
use rowshape::errors::ErrorKind;
use rowshape::mapper::{entity_from_row, entity_to_row, Entity, IdMode, Row};
use rowshape::migration::EntityMeta;
use rowshape_derive::Entity;
use rowshape_int_test::test_util::{create_test_context, run_test};
use std::collections::HashMap;

#[derive(Entity, Debug, Clone, PartialEq)]
struct Thing {
    id: i64,
    name: String,
    tag_list: [String; 2],
}

#[derive(Entity, Debug, Clone, PartialEq)]
struct Sample {
    id: i64,
    label: String,
    reading_list: [f64; 3],
}

#[derive(Entity, Debug, Clone, Default, PartialEq)]
struct Note {
    id: i64,
    body: String,
    #[entity(skip)]
    cached_len: usize,
    lookup: HashMap<String, String>,
}

#[derive(Entity, Debug, Clone, PartialEq)]
struct Contact {
    id: i64,
    name: String,
    email: Option<String>,
    age: Option<i32>,
}

#[derive(Entity, Debug, Clone, PartialEq)]
struct Account {
    id: i64,
    #[entity(required)]
    owner: String,
    active: bool,
    balance: i64,
}

#[derive(Entity, Debug, Clone, PartialEq)]
#[entity(name = "LegacyItem")]
struct Item {
    id: i64,
    code: String,
}

fn row(values: &[(&str, Value)]) -> Row {
    values
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[test]
fn test_thing_round_trip_through_sqlite() {
    run_test(create_test_context, |ctx| {
        let db = ctx.open(&[EntityMeta::of::<Thing>(1).limited_to_table("Things")])?;
        let thing = Thing {
            id: 0,
            name: "A".to_string(),
            tag_list: ["x".to_string(), "y".to_string()],
        };
        db.insert("Things", &thing)?;

        let rows = db.select_rows("Things", &[], |_| {})?;
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["id", "name", "tag1", "tag2"]
        );
        assert_eq!(rows[0]["id"], Value::Long(1));
        assert_eq!(rows[0]["name"], Value::from("A"));
        assert_eq!(rows[0]["tag1"], Value::from("x"));
        assert_eq!(rows[0]["tag2"], Value::from("y"));

        let things: Vec<Thing> = db.select_entities("Things", |q| {
            q.order_by_id();
        })?;
        assert_eq!(things.len(), 1);
        assert_eq!(things[0].id, 1);
        assert_eq!(things[0].tag_list, ["x".to_string(), "y".to_string()]);
        Ok(())
    });
}

#[test]
fn test_three_element_list_keeps_order() {
    run_test(create_test_context, |ctx| {
        let db = ctx.open(&[EntityMeta::of::<Sample>(1).limited_to_table("Samples")])?;
        let columns = Sample::descriptor().column_names();
        assert_eq!(columns, vec!["id", "label", "reading1", "reading2", "reading3"]);

        db.insert(
            "Samples",
            &Sample {
                id: 0,
                label: "probe".to_string(),
                reading_list: [3.5, -1.0, 0.25],
            },
        )?;
        let samples: Vec<Sample> = db.select_entities("Samples", |_| {})?;
        assert_eq!(samples[0].reading_list, [3.5, -1.0, 0.25]);
        Ok(())
    });
}

#[test]
fn test_skipped_and_unsupported_fields_are_not_columns() {
    let descriptor = Note::descriptor();
    assert_eq!(descriptor.column_names(), vec!["id", "body"]);
    assert!(descriptor.skipped().contains(&"cached_len".to_string()));
    assert!(descriptor.skipped().contains(&"lookup".to_string()));

    let mut lookup = HashMap::new();
    lookup.insert("k".to_string(), "v".to_string());
    let note = Note {
        id: 4,
        body: "hello".to_string(),
        cached_len: 5,
        lookup,
    };
    let stored = entity_to_row(&note, IdMode::Include).expect("note to row");
    assert_eq!(stored.len(), 2);

    let restored: Note = entity_from_row(&stored).expect("note from row");
    assert_eq!(restored.body, "hello");
    assert_eq!(restored.cached_len, 0);
    assert!(restored.lookup.is_empty());
}

#[test]
fn test_optional_fields_store_null() {
    run_test(create_test_context, |ctx| {
        let db = ctx.open(&[EntityMeta::of::<Contact>(1).limited_to_table("Contacts")])?;
        db.insert(
            "Contacts",
            &Contact {
                id: 0,
                name: "Ann".to_string(),
                email: None,
                age: Some(41),
            },
        )?;
        db.insert(
            "Contacts",
            &Contact {
                id: 0,
                name: "Bo".to_string(),
                email: Some("bo@example.org".to_string()),
                age: None,
            },
        )?;

        let rows = db.select_rows("Contacts", &["email", "age"], |q| {
            q.order_by_id();
        })?;
        assert_eq!(rows[0]["email"], Value::Null);
        assert_eq!(rows[1]["age"], Value::Null);

        let contacts: Vec<Contact> = db.select_entities("Contacts", |q| {
            q.order_by_id();
        })?;
        assert_eq!(contacts[0].email, None);
        assert_eq!(contacts[0].age, Some(41));
        assert_eq!(contacts[1].email.as_deref(), Some("bo@example.org"));
        assert_eq!(contacts[1].age, None);
        Ok(())
    });
}

#[test]
fn test_missing_required_field_fails() {
    let stored = row(&[
        ("id", Value::Long(1)),
        ("active", Value::Long(1)),
        ("balance", Value::Long(10)),
    ]);
    let err = entity_from_row::<Account>(&stored).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MissingField);
}

#[test]
fn test_missing_column_takes_default() {
    let stored = row(&[("id", Value::Long(1)), ("owner", Value::from("Ann"))]);
    let account = entity_from_row::<Account>(&stored).expect("account from row");
    assert_eq!(
        account,
        Account {
            id: 1,
            owner: "Ann".to_string(),
            active: false,
            balance: 0,
        }
    );
}

#[test]
fn test_stored_integers_are_narrowed() {
    let stored = row(&[
        ("id", Value::Long(7)),
        ("name", Value::from("Cy")),
        ("email", Value::Null),
        ("age", Value::Long(30)),
    ]);
    let contact = entity_from_row::<Contact>(&stored).expect("contact from row");
    assert_eq!(contact.age, Some(30));
    assert_eq!(contact.id, 7);
}

#[test]
fn test_entity_name_attribute() {
    assert_eq!(Item::descriptor().name(), "LegacyItem");
    let meta = EntityMeta::of::<Item>(1);
    assert_eq!(meta.name(), "LegacyItem");

    let item = Item::from_record(&Item {
        id: 3,
        code: "X-1".to_string(),
    }
    .to_record())
    .expect("item from record");
    assert_eq!(item.code, "X-1");
}
