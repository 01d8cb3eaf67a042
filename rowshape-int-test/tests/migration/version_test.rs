use rowshape::common::{str_col, Value};
use rowshape::mapper::EntityDescriptor;
use rowshape::migration::{EntityMeta, VersionTable};
use rowshape::store::SqlExecutorProvider;
use rowshape_int_test::test_util::{create_test_context, run_test};

fn tag_meta() -> EntityMeta {
    let shape = EntityDescriptor::builder("Tag")
        .id()
        .field(str_col("label"))
        .build()
        .expect("tag shape");
    EntityMeta::new("Tag", 3, shape).limited_to_table("Tags")
}

#[test]
fn test_version_record_is_upserted() {
    run_test(create_test_context, |ctx| {
        let versions = VersionTable::new(ctx.executor()?, "EntityVersions");
        versions.ensure()?;
        versions.ensure()?;
        assert_eq!(versions.get("Tag")?, None);

        versions.set("Tag", 1, Some("first"))?;
        versions.set("Tag", 2, None)?;
        assert_eq!(versions.get("Tag")?, Some(2));

        let rows = ctx
            .executor()?
            .query("SELECT entity_name, version, notes FROM EntityVersions", &[])?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["version"], Value::Long(2));
        assert!(rows[0]["notes"].to_arg_string().starts_with("updated "));
        Ok(())
    });
}

#[test]
fn test_custom_version_table() {
    run_test(create_test_context, |ctx| {
        let db = ctx
            .builder()?
            .version_table("SchemaVersions")
            .register(tag_meta())
            .open()?;
        assert_eq!(db.version_table().table_name(), "SchemaVersions");
        assert!(db.executor().table_exists("SchemaVersions")?);
        assert!(!db.executor().table_exists("EntityVersions")?);
        assert_eq!(db.version_table().get("Tag")?, Some(3));

        let rows = db.select_rows("SchemaVersions", &["notes"], |q| {
            q.filter(|w| {
                w.eq("entity_name", "Tag");
            });
        })?;
        assert_eq!(rows[0]["notes"], Value::from("created"));
        Ok(())
    });
}

#[test]
fn test_create_table_keeps_recorded_version() {
    run_test(create_test_context, |ctx| {
        let db = ctx.builder()?.migrate_on_open(false).open()?;
        db.version_table().set("Tag", 2, Some("older"))?;

        db.create_table("Tags", &tag_meta())?;
        assert!(db.executor().table_exists("Tags")?);
        assert_eq!(db.version_table().get("Tag")?, Some(2));

        db.create_table("MoreTags", &EntityMeta::new("Other", 7, tag_meta().shape().clone()))?;
        assert_eq!(db.version_table().get("Other")?, Some(7));
        Ok(())
    });
}
