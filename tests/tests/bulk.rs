//! updateMany / deleteMany on the blog schema.

use pretty_assertions::assert_eq;
use strata_tests::prelude::*;

fn seed_users(blog: &Blog) -> TestResult<()> {
    blog.step(
        "create_zeus",
        create("User", json!({ "data": { "name": "Zeus", "email": "zeus@example.com", "age": 5001 } }))
            .select("id"),
        |a| a.created(1),
    )?;
    for (name, birthday, email) in [
        ("Zain", "1996-01-22", "zain@example.com"),
        ("Steve", "1992-06-02", "steve@example.com"),
        ("Pete", "1988-06-02", "pete@example.com"),
    ] {
        blog.step(
            "create_user",
            create("User", json!({ "data": { "name": name, "birthday": birthday, "email": email } }))
                .select("id name age birthday email"),
            |a| a.data("/birthday", birthday).data("/age", Json::Null),
        )?;
    }
    Ok(())
}

#[test]
fn test_update_many_users_without_age() -> TestResult<()> {
    let blog = Blog::new()?;
    seed_users(&blog)?;

    blog.step(
        "update_many_users",
        update_many("User", json!({ "where": { "exists": { "age": false } }, "data": { "age": 12 } })),
        |a| a.count(3).updated(3),
    )?;

    let pete = blog.find("User", json!({ "email": "pete@example.com" }), "age")?;
    assert_eq!(pete, vec![json!({ "age": 12 })]);
    let zeus = blog.find("User", json!({ "email": "zeus@example.com" }), "age")?;
    assert_eq!(zeus, vec![json!({ "age": 5001 })]);
    Ok(())
}

#[test]
fn test_update_many_rejects_shared_unique_value() -> TestResult<()> {
    let blog = Blog::new()?;
    seed_users(&blog)?;
    blog.step(
        "update_many_users",
        update_many("User", json!({ "where": { "exists": { "age": false } }, "data": { "age": 12 } })),
        |a| a.count(3),
    )?;

    blog.step(
        "update_many_users_set_unique_field",
        update_many(
            "User",
            json!({ "where": { "exists": { "age": true } }, "data": { "email": "this update should fail" } }),
        ),
        |a| a.conflict(ConflictKind::Multiple).error("multiple"),
    )?;
    blog.step(
        "update_many_aged_12_set_unique_field",
        update_many("User", json!({ "where": { "match": { "age": 12 } }, "data": { "email": "x@example.com" } })),
        |a| a.conflict(ConflictKind::Multiple),
    )?;

    // the batch failed as a whole
    assert!(blog.find("User", json!({ "email": "this update should fail" }), "id")?.is_empty());
    assert!(blog.find("User", json!({ "email": "x@example.com" }), "id")?.is_empty());
    let mut emails: Vec<Json> = blog
        .find("User", json!({}), "email")?
        .into_iter()
        .map(|user| user["email"].clone())
        .collect();
    emails.sort_by_key(|email| email.to_string());
    assert_eq!(
        emails,
        vec![
            json!("pete@example.com"),
            json!("steve@example.com"),
            json!("zain@example.com"),
            json!("zeus@example.com"),
        ]
    );
    Ok(())
}

#[test]
fn test_update_many_single_match_may_set_unique_field() -> TestResult<()> {
    let blog = Blog::new()?;
    seed_users(&blog)?;

    blog.step(
        "update_many_one_match",
        update_many("User", json!({ "where": { "match": { "name": "Pete" } }, "data": { "email": "peter@example.com" } })),
        |a| a.count(1),
    )?;
    blog.step(
        "update_many_taken_value",
        update_many("User", json!({ "where": { "match": { "name": "Steve" } }, "data": { "email": "zeus@example.com" } })),
        |a| a.conflict(ConflictKind::Duplicate),
    )?;
    Ok(())
}

#[test]
fn test_update_many_with_range_filter() -> TestResult<()> {
    let blog = Blog::new()?;
    seed_users(&blog)?;

    blog.step(
        "born_before_1995",
        update_many(
            "User",
            json!({ "where": { "range": { "birthday": [null, "1995-01-01"] } }, "data": { "age": 30 } }),
        ),
        |a| a.count(2),
    )?;
    Ok(())
}

#[test]
fn test_delete_many_users_age_12() -> TestResult<()> {
    let blog = Blog::new()?;
    seed_users(&blog)?;
    blog.step(
        "update_many_users",
        update_many("User", json!({ "where": { "exists": { "age": false } }, "data": { "age": 12 } })),
        |a| a.count(3),
    )?;

    blog.step(
        "delete_many_users",
        delete_many("User", json!({ "where": { "match": { "age": 12 } } })),
        |a| a.count(3).deleted(3),
    )?;

    assert!(blog.find("User", json!({ "email": "pete@example.com" }), "age")?.is_empty());
    assert_eq!(blog.find("User", json!({}), "name")?, vec![json!({ "name": "Zeus" })]);
    Ok(())
}

#[test]
fn test_bulk_request_echoes_client_mutation_id() -> TestResult<()> {
    let blog = Blog::new()?;

    let envelope = blog.step(
        "delete_nothing",
        delete_many("User", json!({ "where": { "match": { "age": 99 } }, "clientMutationId": "bulk-1" })),
        |a| a.count(0).client_mutation_id("bulk-1"),
    )?;

    assert_eq!(envelope, json!({ "count": 0, "clientMutationId": "bulk-1" }));
    Ok(())
}
