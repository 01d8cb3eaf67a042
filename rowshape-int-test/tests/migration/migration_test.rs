use rowshape::common::{int_col, long_col, str_col, ColumnDescriptor, ColumnType, Value};
use rowshape::errors::{ErrorKind, RowshapeResult};
use rowshape::mapper::{EntityDescriptor, Row};
use rowshape::migration::{define_migrations, EntityMeta, VersionTable};
use rowshape::rowshape::Rowshape;
use rowshape::rowshape_config::{MissingVersion, RowFailurePolicy, DEFAULT_VERSION_TABLE};
use rowshape::store::{SqlExecutor, SqlExecutorProvider};
use rowshape_derive::Entity;
use rowshape_int_test::test_util::{create_test_context, run_test, seed_table, TestContext};

const ARTICLES: &str = "Articles";

#[derive(Entity, Debug, Clone, PartialEq)]
struct Article {
    id: i64,
    title: String,
    views: i64,
    rating: String,
}

#[derive(Entity, Debug, Clone, PartialEq)]
struct Person {
    id: i64,
    full_name: String,
}

fn article_v1() -> EntityDescriptor {
    EntityDescriptor::builder("Article")
        .id()
        .field(str_col("caption"))
        .field(int_col("views"))
        .build()
        .expect("article v1")
}

fn article_v2() -> EntityDescriptor {
    EntityDescriptor::builder("Article")
        .id()
        .field(str_col("heading"))
        .field(int_col("views"))
        .build()
        .expect("article v2")
}

fn article_v3() -> EntityDescriptor {
    EntityDescriptor::builder("Article")
        .id()
        .field(str_col("heading"))
        .field(long_col("views"))
        .field(str_col("rating").with_default("none"))
        .build()
        .expect("article v3")
}

/// Article at version 4, migrating from version 1.
fn article_meta() -> EntityMeta {
    EntityMeta::of::<Article>(4)
        .limited_to_table(ARTICLES)
        .with_migrations(|latest| {
            define_migrations(4, latest, |m| {
                m.version(1, &article_v1(), |_| {});
                m.version(2, &article_v2(), |v| {
                    v.rename(|r| {
                        r.field("title").from("caption").to("heading");
                    });
                });
                m.version(3, &article_v3(), |v| {
                    v.milestone(|ms| {
                        ms.modify("views", |o| {
                            o.from_int(|views| i64::from(views) * 10);
                        });
                    });
                });
                m.version(4, latest, |v| {
                    v.rename(|r| {
                        r.field("title").from("heading").to("title");
                    });
                });
            })
        })
}

/// Article as it was released at version 2.
fn article_meta_v2() -> EntityMeta {
    EntityMeta::new("Article", 2, article_v2())
        .limited_to_table(ARTICLES)
        .with_migrations(|latest| {
            define_migrations(2, latest, |m| {
                m.version(1, &article_v1(), |_| {});
                m.version(2, latest, |v| {
                    v.rename(|r| {
                        r.field("heading").from("caption").to("heading");
                    });
                });
            })
        })
}

fn v1_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::new("id", ColumnType::Id, false),
        ColumnDescriptor::new("caption", ColumnType::Str, false),
        ColumnDescriptor::new("views", ColumnType::Int, false),
    ]
}

fn seed_v1(executor: &SqlExecutor, extra: &[(&str, Value)]) -> RowshapeResult<()> {
    let mut rows = vec![
        vec![
            ("id", Value::Long(1)),
            ("caption", Value::from("Hello")),
            ("views", Value::Int(5)),
        ],
        vec![
            ("id", Value::Long(2)),
            ("caption", Value::from("World")),
            ("views", Value::Int(7)),
        ],
    ];
    if !extra.is_empty() {
        rows.push(extra.to_vec());
    }
    seed_table(executor, ARTICLES, &v1_columns(), &rows)
}

fn record_version(executor: &SqlExecutor, entity: &str, version: u32) -> RowshapeResult<()> {
    let versions = VersionTable::new(executor.clone(), DEFAULT_VERSION_TABLE);
    versions.ensure()?;
    versions.set(entity, version, Some("seeded"))
}

fn stored_version(ctx: &TestContext, entity: &str) -> RowshapeResult<Option<u32>> {
    VersionTable::new(ctx.executor()?, DEFAULT_VERSION_TABLE).get(entity)
}

fn article_rows(db: &Rowshape) -> RowshapeResult<Vec<Row>> {
    db.select_rows(ARTICLES, &[], |q| {
        q.order_by_id();
    })
}

// ==================== Stepwise Migration Tests ====================

#[test]
fn test_rename_continuity_across_versions() {
    run_test(create_test_context, |ctx| {
        let executor = ctx.executor()?;
        seed_v1(&executor, &[])?;
        record_version(&executor, "Article", 1)?;

        let db = ctx.open(&[article_meta()])?;
        let articles: Vec<Article> = db.select_entities(ARTICLES, |q| {
            q.order_by_id();
        })?;

        assert_eq!(
            articles,
            vec![
                Article {
                    id: 1,
                    title: "Hello".to_string(),
                    views: 50,
                    rating: "none".to_string(),
                },
                Article {
                    id: 2,
                    title: "World".to_string(),
                    views: 70,
                    rating: "none".to_string(),
                },
            ]
        );
        let rows = article_rows(&db)?;
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["id", "title", "views", "rating"]
        );
        assert_eq!(stored_version(&ctx, "Article")?, Some(4));
        Ok(())
    });
}

#[test]
fn test_stepwise_upgrade_equals_direct_upgrade() {
    let direct = create_test_context().expect("direct context");
    let direct_rows = {
        let executor = direct.executor().expect("direct executor");
        seed_v1(&executor, &[]).expect("seed direct");
        let db = direct.open(&[article_meta()]).expect("open direct");
        article_rows(&db).expect("direct rows")
    };

    run_test(create_test_context, move |ctx| {
        seed_v1(&ctx.executor()?, &[])?;

        let db = ctx.open(&[article_meta_v2()])?;
        let rows = article_rows(&db)?;
        assert_eq!(rows[0]["heading"], Value::from("Hello"));
        assert_eq!(stored_version(&ctx, "Article")?, Some(2));
        drop(db);

        let db = ctx.open(&[article_meta()])?;
        assert_eq!(article_rows(&db)?, direct_rows);
        assert_eq!(stored_version(&ctx, "Article")?, Some(4));
        Ok(())
    });
}

#[test]
fn test_reopen_at_latest_writes_nothing() {
    run_test(create_test_context, |ctx| {
        seed_v1(&ctx.executor()?, &[])?;
        drop(ctx.open(&[article_meta()])?);

        let counting = ctx.counting_executor()?;
        let db = Rowshape::builder()
            .executor(SqlExecutor::new(counting.clone()))
            .register(article_meta())
            .open()?;
        assert_eq!(counting.writes(), 0);
        assert_eq!(article_rows(&db)?.len(), 2);
        Ok(())
    });
}

#[test]
fn test_fresh_database_creates_latest_layout() {
    run_test(create_test_context, |ctx| {
        let db = ctx.open(&[article_meta()])?;
        assert!(db.executor().table_exists(ARTICLES)?);
        assert!(article_rows(&db)?.is_empty());
        assert_eq!(stored_version(&ctx, "Article")?, Some(4));

        db.insert(
            ARTICLES,
            &Article {
                id: 0,
                title: "Fresh".to_string(),
                views: 1,
                rating: "good".to_string(),
            },
        )?;
        let rows = db.select_rows(ARTICLES, &["title"], |_| {})?;
        assert_eq!(rows[0]["title"], Value::from("Fresh"));
        Ok(())
    });
}

#[test]
fn test_newer_stored_version_is_left_alone() {
    run_test(create_test_context, |ctx| {
        let executor = ctx.executor()?;
        seed_v1(&executor, &[])?;
        record_version(&executor, "Article", 5)?;

        let db = ctx.open(&[article_meta()])?;
        assert_eq!(stored_version(&ctx, "Article")?, Some(5));
        let rows = article_rows(&db)?;
        assert_eq!(rows[0]["caption"], Value::from("Hello"));
        Ok(())
    });
}

// ==================== Missing Version Tests ====================

#[test]
fn test_missing_version_assumes_lowest_declared() {
    run_test(create_test_context, |ctx| {
        seed_v1(&ctx.executor()?, &[])?;
        let db = ctx.open(&[article_meta()])?;
        let rows = article_rows(&db)?;
        assert_eq!(rows[1]["title"], Value::from("World"));
        assert_eq!(rows[1]["views"], Value::Long(70));
        assert_eq!(stored_version(&ctx, "Article")?, Some(4));
        Ok(())
    });
}

#[test]
fn test_missing_version_can_fail() {
    run_test(create_test_context, |ctx| {
        seed_v1(&ctx.executor()?, &[])?;
        let err = ctx
            .builder()?
            .missing_version_fallback(MissingVersion::Fail)
            .register(article_meta())
            .open()
            .err()
            .expect("open must fail");
        assert_eq!(err.kind(), &ErrorKind::NotFound);
        assert_eq!(stored_version(&ctx, "Article")?, None);
        Ok(())
    });
}

// ==================== Row Failure Tests ====================

#[test]
fn test_unreadable_row_is_skipped() {
    run_test(create_test_context, |ctx| {
        seed_v1(
            &ctx.executor()?,
            &[
                ("id", Value::Long(3)),
                ("caption", Value::from("Broken")),
                ("views", Value::from("lots")),
            ],
        )?;
        let meta = article_meta();
        let db = ctx.builder()?.register(meta.clone()).migrate_on_open(false).open()?;
        assert_eq!(stored_version(&ctx, "Article")?, None);

        let report = db.migrator().migrate_single_table_entity(&meta)?;
        assert_eq!(report.steps, vec![2, 3, 4]);
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.rows_written, 6);

        let rows = article_rows(&db)?;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row["title"] != Value::from("Broken")));
        assert_eq!(stored_version(&ctx, "Article")?, Some(4));
        Ok(())
    });
}

#[test]
fn test_abort_policy_keeps_version_and_rows() {
    run_test(create_test_context, |ctx| {
        let executor = ctx.executor()?;
        seed_v1(
            &executor,
            &[
                ("id", Value::Long(3)),
                ("caption", Value::from("Broken")),
                ("views", Value::from("lots")),
            ],
        )?;
        record_version(&executor, "Article", 1)?;

        let err = ctx
            .builder()?
            .row_failure_policy(RowFailurePolicy::Abort)
            .register(article_meta())
            .open()
            .err()
            .expect("open must fail");
        assert_eq!(err.kind(), &ErrorKind::MigrationError);
        assert_eq!(stored_version(&ctx, "Article")?, Some(1));

        let rows = executor.query("SELECT caption FROM Articles ORDER BY id", &[])?;
        assert_eq!(rows.len(), 3);
        Ok(())
    });
}

/// Article migrations whose last step stores text in `views` for row 2.
fn article_meta_bad_views_at_v4() -> EntityMeta {
    EntityMeta::of::<Article>(4)
        .limited_to_table(ARTICLES)
        .with_migrations(|latest| {
            define_migrations(4, latest, |m| {
                m.version(1, &article_v1(), |_| {});
                m.version(2, &article_v2(), |v| {
                    v.rename(|r| {
                        r.field("title").from("caption").to("heading");
                    });
                });
                m.version(3, &article_v3(), |_| {});
                m.version(4, latest, |v| {
                    v.rename(|r| {
                        r.field("title").from("heading").to("title");
                    })
                    .milestone(|ms| {
                        ms.finalize(|_, mut new| {
                            if new.get("id") == Some(&Value::Long(2)) {
                                new.put("views", "not-a-number");
                            }
                            Ok(new)
                        });
                    });
                });
            })
        })
}

#[test]
fn test_unwritable_row_at_last_step_is_skipped() {
    run_test(create_test_context, |ctx| {
        seed_v1(
            &ctx.executor()?,
            &[
                ("id", Value::Long(3)),
                ("caption", Value::from("Third")),
                ("views", Value::Int(9)),
            ],
        )?;
        let meta = article_meta_bad_views_at_v4();
        let db = ctx.builder()?.register(meta.clone()).migrate_on_open(false).open()?;

        let report = db.migrator().migrate_single_table_entity(&meta)?;
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(report.rows_written, 8);

        let articles: Vec<Article> = db.select_entities(ARTICLES, |q| {
            q.order_by_id();
        })?;
        assert_eq!(articles.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(articles[1].views, 9);
        assert_eq!(stored_version(&ctx, "Article")?, Some(4));
        Ok(())
    });
}

#[test]
fn test_abort_at_last_step_leaves_table_unmigrated() {
    run_test(create_test_context, |ctx| {
        let executor = ctx.executor()?;
        seed_v1(&executor, &[])?;
        record_version(&executor, "Article", 1)?;

        let err = ctx
            .builder()?
            .row_failure_policy(RowFailurePolicy::Abort)
            .register(article_meta_bad_views_at_v4())
            .open()
            .err()
            .expect("open must fail");
        assert_eq!(err.kind(), &ErrorKind::MigrationError);
        assert_eq!(stored_version(&ctx, "Article")?, Some(1));

        let rows = executor.query("SELECT * FROM Articles ORDER BY id", &[])?;
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["id", "caption", "views"]
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["caption"], Value::from("World"));
        assert_eq!(rows[1]["views"], Value::Long(7));
        Ok(())
    });
}

// ==================== Version Table Tests ====================

#[test]
fn test_entity_name_is_unique() {
    run_test(create_test_context, |ctx| {
        let executor = ctx.executor()?;
        record_version(&executor, "Article", 1)?;
        let err = executor
            .execute(
                &format!(
                    "INSERT INTO {} (entity_name, version, notes) VALUES (?, ?, ?)",
                    DEFAULT_VERSION_TABLE
                ),
                &[Value::from("Article"), Value::Int(2), Value::from("duplicate")],
            )
            .err()
            .expect("duplicate entity must be rejected");
        assert_eq!(err.kind(), &ErrorKind::BackendError);
        assert_eq!(stored_version(&ctx, "Article")?, Some(1));
        Ok(())
    });
}

// ==================== Milestone Tests ====================

#[test]
fn test_finalizer_combines_old_fields() {
    run_test(create_test_context, |ctx| {
        let v1 = EntityDescriptor::builder("Person")
            .id()
            .field(str_col("first"))
            .field(str_col("last"))
            .build()?;
        seed_table(
            &ctx.executor()?,
            "People",
            &[
                ColumnDescriptor::new("id", ColumnType::Id, false),
                ColumnDescriptor::new("first", ColumnType::Str, false),
                ColumnDescriptor::new("last", ColumnType::Str, false),
            ],
            &[vec![
                ("id", Value::Long(1)),
                ("first", Value::from("Ada")),
                ("last", Value::from("Lovelace")),
            ]],
        )?;

        let meta = EntityMeta::of::<Person>(2)
            .limited_to_table("People")
            .with_migrations(move |latest| {
                define_migrations(2, latest, |m| {
                    m.version(1, &v1, |_| {});
                    m.version(2, latest, |v| {
                        v.milestone(|ms| {
                            ms.finalize(|old, mut new| {
                                let first: String = old.get_as("first")?;
                                let last: String = old.get_as("last")?;
                                new.put("full_name", format!("{} {}", first, last));
                                Ok(new)
                            });
                        });
                    });
                })
            });

        let db = ctx.open(&[meta])?;
        let people: Vec<Person> = db.select_entities("People", |_| {})?;
        assert_eq!(
            people,
            vec![Person {
                id: 1,
                full_name: "Ada Lovelace".to_string(),
            }]
        );
        Ok(())
    });
}
