//! Relation edge invariants: to-one exclusivity from both sides, reference
//! clearing on delete, missing nested targets and nesting depth.

use pretty_assertions::assert_eq;
use strata_tests::prelude::*;

fn seed_gods(blog: &Blog) -> TestResult<Json> {
    blog.step(
        "create_zeus_with_address",
        create(
            "User",
            json!({ "data": { "name": "Zeus", "email": "zeus@example.com", "address": { "create": { "city": "Olympus" } } } }),
        )
        .select("address { id city }"),
        |a| a.created(2).linked(1).data("/address/city", "Olympus"),
    )
}

#[test]
fn test_connecting_an_owned_address_moves_it() -> TestResult<()> {
    let blog = Blog::new()?;
    let zeus = seed_gods(&blog)?;
    let olympus = zeus["data"]["address"]["id"].clone();

    blog.step(
        "create_loki_taking_address",
        create(
            "User",
            json!({ "data": { "name": "Loki", "email": "loki@example.com", "address": { "connect": { "id": olympus } } } }),
        )
        .select("address { city user { name } }"),
        |a| a.created(1).linked(1).unlinked(1).data("/address/user/name", "Loki"),
    )?;

    let zeus = blog.find("User", json!({ "email": "zeus@example.com" }), "address { city }")?;
    assert_eq!(zeus, vec![json!({ "address": null })]);
    Ok(())
}

#[test]
fn test_owning_side_link_releases_previous_holder() -> TestResult<()> {
    let blog = Blog::new()?;
    seed_gods(&blog)?;

    blog.step(
        "create_rome_for_zeus",
        create("Address", json!({ "data": { "city": "Rome", "user": { "connect": { "email": "zeus@example.com" } } } }))
            .select("city user { name address { city } }"),
        |a| a.linked(1).unlinked(1).data("/user/address/city", "Rome"),
    )?;

    let orphans = blog.find("Address", json!({ "exists": { "user": false } }), "city")?;
    assert_eq!(orphans, vec![json!({ "city": "Olympus" })]);
    Ok(())
}

#[test]
fn test_creating_a_second_address_replaces_the_first() -> TestResult<()> {
    let blog = Blog::new()?;
    seed_gods(&blog)?;

    blog.step(
        "create_new_address",
        update("User", json!({ "data": { "address": { "create": { "city": "Delphi" } } }, "where": { "email": "zeus@example.com" } }))
            .select("address { city }"),
        |a| a.created(1).unlinked(1).data("/address/city", "Delphi"),
    )?;

    let linked = blog.find("Address", json!({ "exists": { "user": true } }), "city")?;
    assert_eq!(linked, vec![json!({ "city": "Delphi" })]);
    Ok(())
}

#[test]
fn test_delete_clears_family_and_starred_references() -> TestResult<()> {
    let blog = Blog::new()?;
    blog.step(
        "create_loki_with_family",
        create(
            "User",
            json!({
                "data": {
                    "name": "Loki",
                    "email": "loki@example.com",
                    "family": { "create": [{ "name": "Thor", "email": "thor@example.com" }] },
                    "starred": { "users": { "connect": [{ "email": "thor@example.com" }] } }
                }
            }),
        )
        .select("family { name } starred { ... on User { name } }"),
        |a| a.created(2).linked(2).data("/family/0/name", "Thor").data("/starred/0/name", "Thor"),
    )?;

    blog.step(
        "delete_thor",
        delete("User", json!({ "where": { "email": "thor@example.com" } })).select("name"),
        |a| a.deleted(1).unlinked(2).data("/name", "Thor"),
    )?;

    let loki = blog.find("User", json!({ "email": "loki@example.com" }), "family { name } starred { __typename }")?;
    assert_eq!(loki, vec![json!({ "family": [], "starred": [] })]);
    Ok(())
}

#[test]
fn test_nested_update_of_missing_to_one_follows_policy() -> TestResult<()> {
    let input = json!({ "data": { "address": { "update": { "city": "Nowhere" } } }, "where": { "email": "hera@example.com" } });

    let lenient = Blog::new()?;
    lenient.step(
        "create_hera",
        create("User", json!({ "data": { "email": "hera@example.com" } })).select("id"),
        |a| a.created(1),
    )?;
    lenient.step(
        "update_missing_address_ignored",
        update("User", input.clone()).select("address { city }"),
        |a| a.data("/address", Json::Null),
    )?;

    let strict = Blog::with_config(
        EngineConfig::new().with_missing_nested_target(MissingTargetPolicy::Error),
    )?;
    strict.step(
        "create_hera",
        create("User", json!({ "data": { "email": "hera@example.com" } })).select("id"),
        |a| a.created(1),
    )?;
    strict.step(
        "update_missing_address_rejected",
        update("User", input).select("address { city }"),
        |a| a.not_found(),
    )?;
    Ok(())
}

#[test]
fn test_nesting_deeper_than_limit_is_rejected() -> TestResult<()> {
    let blog = Blog::with_config(EngineConfig::new().with_max_depth(2))?;
    let deep = json!({
        "data": {
            "name": "a",
            "family": { "create": [{ "name": "b", "family": { "create": [{ "name": "c" }] } }] }
        }
    });
    let shallow = json!({ "data": { "name": "a", "family": { "create": [{ "name": "b" }] } } });

    blog.step("too_deep", create("User", deep).select("id"), |a| a.validation())?;
    blog.step("within_limit", create("User", shallow).select("id"), |a| a.created(2))?;
    Ok(())
}

#[test]
fn test_to_one_id_literal_in_filter() -> TestResult<()> {
    let blog = Blog::new()?;
    let zeus = blog.step(
        "create_zeus",
        create(
            "User",
            json!({ "data": { "name": "Zeus", "writtenSubmissions": { "posts": { "create": [{ "title": "a" }, { "title": "b" }] } } } }),
        )
        .select("id"),
        |a| a.created(3),
    )?;

    let posts = blog.find("Post", json!({ "match": { "author": zeus["data"]["id"] } }), "title")?;
    assert_eq!(posts, vec![json!({ "title": "a" }), json!({ "title": "b" })]);
    Ok(())
}
