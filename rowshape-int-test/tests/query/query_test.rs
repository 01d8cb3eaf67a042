use rowshape::errors::RowshapeResult;
use rowshape::migration::EntityMeta;
use rowshape::query::select;
use rowshape::rowshape::Rowshape;
use rowshape_derive::Entity;
use rowshape_int_test::test_util::{create_test_context, run_test, TestContext};

#[derive(Entity, Debug, Clone, PartialEq)]
struct Product {
    id: i64,
    name: String,
    category: String,
    price: i32,
    in_stock: bool,
}

fn product(name: &str, category: &str, price: i32, in_stock: bool) -> Product {
    Product {
        id: 0,
        name: name.to_string(),
        category: category.to_string(),
        price,
        in_stock,
    }
}

fn open_catalog(ctx: &TestContext) -> RowshapeResult<Rowshape> {
    let db = ctx.open(&[EntityMeta::of::<Product>(1).limited_to_table("Products")])?;
    for item in [
        product("hand saw", "tools", 25, true),
        product("drill", "tools", 80, false),
        product("hammer", "tools", 12, true),
        product("rake", "garden", 18, true),
        product("seeds", "garden", 3, true),
        product("mower", "garden", 240, false),
        product("lamp", "home", 40, true),
    ] {
        db.insert("Products", &item)?;
    }
    Ok(db)
}

fn names(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.name.as_str()).collect()
}

// ==================== Filter Tests ====================

#[test]
fn test_equality_and_comparison() {
    run_test(create_test_context, |ctx| {
        let db = open_catalog(&ctx)?;
        let found: Vec<Product> = db.select_entities("Products", |q| {
            q.filter(|w| {
                w.eq("category", "tools").and(|w| {
                    w.gt("price", 20);
                });
            })
            .order_by_id();
        })?;
        assert_eq!(names(&found), vec!["hand saw", "drill"]);

        let in_stock: Vec<Product> = db.select_entities("Products", |q| {
            q.filter(|w| {
                w.eq("in_stock", false);
            })
            .order_by_id();
        })?;
        assert_eq!(names(&in_stock), vec!["drill", "mower"]);
        Ok(())
    });
}

#[test]
fn test_like_any_and_equal_any() {
    run_test(create_test_context, |ctx| {
        let db = open_catalog(&ctx)?;
        let found: Vec<Product> = db.select_entities("Products", |q| {
            q.filter(|w| {
                w.like_any("name", ["%saw%", "%mow%"]);
            })
            .order_by_id();
        })?;
        assert_eq!(names(&found), vec!["hand saw", "mower"]);

        let found: Vec<Product> = db.select_entities("Products", |q| {
            q.filter(|w| {
                w.equal_any("category", ["garden", "home"]);
            })
            .order_by(|o| {
                o.desc("price");
            });
        })?;
        assert_eq!(names(&found), vec!["mower", "lamp", "rake", "seeds"]);
        Ok(())
    });
}

#[test]
fn test_nested_groups() {
    run_test(create_test_context, |ctx| {
        let db = open_catalog(&ctx)?;
        let query = select("Products", &["name"], |q| {
            q.filter(|w| {
                w.eq("in_stock", true).and_group(|g| {
                    g.lt("price", 15).or(|w| {
                        w.eq("category", "home");
                    });
                });
            })
            .order_by_id();
        });
        assert_eq!(
            query.sql,
            "SELECT name FROM Products WHERE in_stock=? AND (price<? OR category=?) ORDER BY id"
        );
        assert_eq!(query.args, vec!["1", "15", "home"]);

        let rows = db.executor().query_built(&query)?;
        let found: Vec<String> = rows.iter().map(|r| r["name"].to_arg_string()).collect();
        assert_eq!(found, vec!["hammer", "seeds", "lamp"]);
        Ok(())
    });
}

// ==================== Order Tests ====================

#[test]
fn test_case_order_puts_matches_first() {
    run_test(create_test_context, |ctx| {
        let db = open_catalog(&ctx)?;
        let found: Vec<Product> = db.select_entities("Products", |q| {
            q.order_by(|o| {
                o.when(|case| {
                    case.branch(
                        |w| {
                            w.eq("category", "garden");
                        },
                        |o| {
                            o.raw("0");
                        },
                    )
                    .otherwise(|o| {
                        o.raw("1");
                    });
                })
                .asc("price");
            });
        })?;
        assert_eq!(
            names(&found),
            vec!["seeds", "rake", "mower", "hammer", "hand saw", "lamp", "drill"]
        );
        Ok(())
    });
}

#[test]
fn test_limit_and_offset() {
    run_test(create_test_context, |ctx| {
        let db = open_catalog(&ctx)?;
        let page: Vec<Product> = db.select_entities("Products", |q| {
            q.order_by(|o| {
                o.asc("price");
            })
            .limit(2)
            .offset(1);
        })?;
        assert_eq!(names(&page), vec!["hammer", "rake"]);
        Ok(())
    });
}
