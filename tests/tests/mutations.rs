//! Single-target mutations on the blog schema: nested creates, array
//! operations, conditional updates, upserts and deletes.

use pretty_assertions::assert_eq;
use strata_tests::prelude::*;

/// Zeus with three posts, plus a post connected to Zeus by email.
/// Returns (zeus envelope, genie post envelope).
fn seed(blog: &Blog) -> TestResult<(Json, Json)> {
    let zeus = blog.step(
        "create_user_with_posts",
        create(
            "User",
            json!({
                "data": {
                    "age": 42,
                    "email": "zeus@example.com",
                    "name": "Zeus",
                    "writtenSubmissions": {
                        "posts": {
                            "create": [
                                { "title": "Hello World", "text": "This is my first blog post ever!" },
                                { "title": "My Second Post", "text": "My first post was good, but this one is better!" },
                                { "title": "Solving World Hunger", "text": "This is a draft..." }
                            ]
                        }
                    }
                },
                "clientMutationId": "Test"
            }),
        )
        .select("id age name email writtenSubmissions { id title }"),
        |a| {
            a.created(4)
                .linked(3)
                .client_mutation_id("Test")
                .data("/name", "Zeus")
                .data("/age", 42)
                .len("/writtenSubmissions", 3)
                .data("/writtenSubmissions/0/title", "Hello World")
                .data("/writtenSubmissions/1/title", "My Second Post")
                .data("/writtenSubmissions/2/title", "Solving World Hunger")
        },
    )?;

    let genie = blog.step(
        "create_post_connect_author",
        create(
            "Post",
            json!({
                "data": {
                    "title": "Genie is great",
                    "text": "Look how fast I can create an executable schema",
                    "tags": ["genie", "graphql", "database"],
                    "author": { "connect": { "email": "zeus@example.com" } }
                }
            }),
        )
        .select("id title text tags author { email }"),
        |a| {
            a.created(1)
                .linked(1)
                .data("/title", "Genie is great")
                .data("/tags", json!(["genie", "graphql", "database"]))
                .data("/author/email", "zeus@example.com")
        },
    )?;
    Ok((zeus, genie))
}

fn id_of(envelope: &Json, pointer: &str) -> Json {
    envelope["data"].pointer(pointer).cloned().unwrap_or(Json::Null)
}

mod create {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_user_with_posts_and_connect_author() -> TestResult<()> {
        let blog = Blog::new()?;
        let (zeus, genie) = seed(&blog)?;

        // Posts are owned by Zeus through their author field
        let posts = blog.find(
            "User",
            json!({ "email": "zeus@example.com" }),
            "writtenSubmissions { __typename title }",
        )?;
        assert_eq!(posts[0]["writtenSubmissions"].as_array().map(Vec::len), Some(4));
        assert_eq!(posts[0]["writtenSubmissions"][3]["__typename"], json!("Post"));
        assert_eq!(id_of(&genie, "/author/email"), json!("zeus@example.com"));
        assert!(id_of(&zeus, "/id").is_string());
        Ok(())
    }

    #[test]
    fn test_connect_to_missing_record_fails() -> TestResult<()> {
        let blog = Blog::new()?;

        blog.step(
            "connect_missing_author",
            create(
                "Post",
                json!({ "data": { "title": "x", "author": { "connect": { "email": "nobody@example.com" } } } }),
            )
            .select("id"),
            |a| a.not_found(),
        )?;

        assert!(blog.find("Post", json!({}), "id")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_create_rejects_builtin_and_unknown_fields() -> TestResult<()> {
        let blog = Blog::new()?;

        blog.step(
            "create_with_id",
            create("User", json!({ "data": { "id": "7" } })).select("id"),
            |a| a.validation(),
        )?;
        blog.step(
            "create_with_unknown_field",
            create("User", json!({ "data": { "nickname": "z" } })).select("id"),
            |a| a.validation(),
        )?;
        blog.step(
            "create_abstract_type",
            create("Submission", json!({ "data": { "title": "z" } })).select("id"),
            |a| a.validation(),
        )?;
        Ok(())
    }
}

mod arrays {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_pull_and_set_tags() -> TestResult<()> {
        let blog = Blog::new()?;
        let (_, genie) = seed(&blog)?;
        let id = id_of(&genie, "/id");

        blog.step(
            "push_onto_tags",
            update("Post", json!({ "data": { "tags": { "push": ["fortune"] } }, "where": { "id": id } }))
                .select("id tags"),
            |a| a.updated(1).data("/tags", json!(["genie", "graphql", "database", "fortune"])),
        )?;
        blog.step(
            "push_duplicate_onto_tags",
            update("Post", json!({ "data": { "tags": { "push": ["fortune"] } }, "where": { "id": id } }))
                .select("id tags created updated"),
            |a| {
                a.data("/tags", json!(["genie", "graphql", "database", "fortune", "fortune"]))
                    .data("/created", "2018-06-01T12:00:01.000Z")
                    .data("/updated", "2018-06-01T12:00:03.000Z")
            },
        )?;
        blog.step(
            "pull_from_tags",
            update("Post", json!({ "data": { "tags": { "pull": ["fortune"] } }, "where": { "id": id } }))
                .select("tags updated"),
            |a| {
                a.data("/tags", json!(["genie", "graphql", "database"]))
                    .data("/updated", "2018-06-01T12:00:04.000Z")
            },
        )?;
        blog.step(
            "set_tags",
            update("Post", json!({ "data": { "tags": { "set": ["fortune"] } }, "where": { "id": id } }))
                .select("tags"),
            |a| a.data("/tags", json!(["fortune"])),
        )?;
        Ok(())
    }

    #[test]
    fn test_array_operations_compose_in_fixed_order() -> TestResult<()> {
        let blog = Blog::new()?;
        let (_, genie) = seed(&blog)?;
        let id = id_of(&genie, "/id");

        // set, then push, then pull, whatever the key order
        blog.step(
            "set_push_pull",
            update(
                "Post",
                json!({ "data": { "tags": { "pull": ["a"], "push": ["b", "a"], "set": ["a", "c"] } }, "where": { "id": id } }),
            )
            .select("tags"),
            |a| a.data("/tags", json!(["c", "b"])),
        )?;
        blog.step(
            "push_null",
            update("Post", json!({ "data": { "tags": { "push": [null] } }, "where": { "id": id } }))
                .select("tags"),
            |a| a.validation(),
        )?;
        Ok(())
    }
}

mod conditions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_conditional_update_passes_then_is_rejected() -> TestResult<()> {
        let blog = Blog::new()?;
        let (_, genie) = seed(&blog)?;
        let id = id_of(&genie, "/id");

        blog.step(
            "push_conditions_passing",
            update(
                "Post",
                json!({
                    "data": { "tags": { "push": ["apollo"] } },
                    "where": { "id": id },
                    "conditions": { "range": { "created": ["2018-01-01T01:00:00.000Z", null] } }
                }),
            )
            .select("id tags created updated"),
            |a| {
                a.updated(1)
                    .data("/tags", json!(["genie", "graphql", "database", "apollo"]))
                    .data("/updated", "2018-06-01T12:00:02.000Z")
            },
        )?;

        blog.step(
            "push_conditions_not_passing",
            update(
                "Post",
                json!({
                    "data": { "tags": { "push": ["old"] } },
                    "where": { "id": id },
                    "conditions": { "range": { "created": [null, "2018-01-01T01:00:00.000Z"] } }
                }),
            )
            .select("id tags created updated"),
            |a| {
                a.null_data()
                    .updated(0)
                    .unaltered("/tags", json!(["genie", "graphql", "database", "apollo"]))
                    .unaltered("/updated", "2018-06-01T12:00:02.000Z")
                    .unaltered("/id", id.clone())
            },
        )?;

        let stored = blog.find("Post", json!({ "id": id }), "tags updated")?;
        assert_eq!(stored[0]["tags"], json!(["genie", "graphql", "database", "apollo"]));
        assert_eq!(stored[0]["updated"], json!("2018-06-01T12:00:02.000Z"));
        Ok(())
    }

    #[test]
    fn test_rejected_update_skips_nested_writes() -> TestResult<()> {
        let blog = Blog::new()?;
        seed(&blog)?;

        blog.step(
            "rejected_with_nested_create",
            update(
                "User",
                json!({
                    "data": { "address": { "create": { "city": "Olympus" } } },
                    "where": { "email": "zeus@example.com" },
                    "conditions": { "match": { "age": 7 } }
                }),
            )
            .select("address { city }")
            .select_unaltered("name age"),
            |a| a.null_data().created(0).unaltered("/name", "Zeus").unaltered("/age", 42),
        )?;

        assert!(blog.find("Address", json!({}), "id")?.is_empty());
        Ok(())
    }
}

mod to_one {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_address_lifecycle() -> TestResult<()> {
        let blog = Blog::new()?;
        seed(&blog)?;
        let zeus = json!({ "email": "zeus@example.com" });

        blog.step(
            "create_address_and_update_age",
            update(
                "User",
                json!({ "data": { "age": 5000, "address": { "create": { "city": "Olympus" } } }, "where": zeus }),
            )
            .select("id name email age address { city user { name } }"),
            |a| {
                a.created(1)
                    .linked(1)
                    .data("/name", "Zeus")
                    .data("/age", 5000)
                    .data("/address/city", "Olympus")
                    .data("/address/user/name", "Zeus")
            },
        )?;

        blog.step(
            "disconnect_address",
            update("User", json!({ "data": { "address": { "disconnect": true } }, "where": zeus }))
                .select("age address { city }"),
            |a| a.unlinked(1).data("/age", 5000).data("/address", Json::Null),
        )?;

        let upserted = blog.step(
            "upsert_creates_address",
            update(
                "User",
                json!({
                    "data": { "address": { "upsert": { "create": { "city": "New York" }, "update": { "city": "Olympus" } } } },
                    "where": zeus
                }),
            )
            .select("address { id city }"),
            |a| a.created(1).data("/address/city", "New York"),
        )?;
        let address_id = id_of(&upserted, "/address/id");

        blog.step(
            "upsert_updates_address",
            update(
                "User",
                json!({
                    "data": { "address": { "upsert": { "create": { "city": "New York" }, "update": { "city": "Olympus" } } } },
                    "where": zeus
                }),
            )
            .select("address { id city }"),
            |a| a.created(0).data("/address/id", address_id.clone()).data("/address/city", "Olympus"),
        )?;

        blog.step(
            "nested_update_address",
            update("User", json!({ "data": { "address": { "update": { "city": "Eau Claire" } } }, "where": zeus }))
                .select("address { id city }"),
            |a| a.data("/address/city", "Eau Claire"),
        )?;

        blog.step(
            "delete_address",
            update("User", json!({ "data": { "address": { "delete": true } }, "where": zeus }))
                .select("name address { id city }"),
            |a| a.deleted(1).data("/address", Json::Null),
        )?;

        let remaining = blog.find("Address", json!({ "match": { "id": address_id } }), "id")?;
        assert!(remaining.is_empty());
        Ok(())
    }

    #[test]
    fn test_false_flags_are_no_ops() -> TestResult<()> {
        let blog = Blog::new()?;
        seed(&blog)?;
        let zeus = json!({ "email": "zeus@example.com" });
        blog.step(
            "create_address",
            update("User", json!({ "data": { "address": { "create": { "city": "Olympus" } } }, "where": zeus }))
                .select("id"),
            |a| a.created(1),
        )?;

        blog.step(
            "disconnect_false",
            update("User", json!({ "data": { "address": { "disconnect": false, "delete": false } }, "where": zeus }))
                .select("address { city }"),
            |a| a.unlinked(0).deleted(0).data("/address/city", "Olympus"),
        )?;
        Ok(())
    }
}

mod to_many {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_update_and_delete_of_posts() -> TestResult<()> {
        let blog = Blog::new()?;
        let (zeus, _) = seed(&blog)?;
        let second = id_of(&zeus, "/writtenSubmissions/1/id");
        let by_email = json!({ "email": "zeus@example.com" });

        blog.step(
            "update_posts_on_user_with_age",
            update(
                "User",
                json!({
                    "data": {
                        "age": 5001,
                        "writtenSubmissions": {
                            "posts": {
                                "update": [{
                                    "data": { "title": "My Updated Post", "tags": { "set": ["updated"] } },
                                    "where": { "id": second }
                                }]
                            }
                        }
                    },
                    "where": by_email
                }),
            )
            .select("age writtenSubmissions { title tags }"),
            |a| {
                a.data("/age", 5001)
                    .data("/writtenSubmissions/1/title", "My Updated Post")
                    .data("/writtenSubmissions/1/tags", json!(["updated"]))
                    .data("/writtenSubmissions/0/title", "Hello World")
            },
        )?;

        blog.step(
            "delete_post_on_user",
            update(
                "User",
                json!({ "data": { "writtenSubmissions": { "posts": { "delete": [{ "id": second }] } } }, "where": by_email }),
            )
            .select("email writtenSubmissions { title }"),
            |a| a.deleted(1).data("/email", "zeus@example.com").len("/writtenSubmissions", 3),
        )?;

        assert!(blog.find("Post", json!({ "match": { "id": second } }), "id")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_nested_update_outside_linked_set_is_a_no_op() -> TestResult<()> {
        let blog = Blog::new()?;
        seed(&blog)?;
        let orphan = blog.step(
            "create_orphan_post",
            create("Post", json!({ "data": { "title": "orphan" } })).select("id"),
            |a| a.created(1),
        )?;

        blog.step(
            "update_unlinked_post",
            update(
                "User",
                json!({
                    "data": { "writtenSubmissions": { "posts": { "update": [{ "where": { "id": orphan["data"]["id"] }, "data": { "title": "taken" } }] } } },
                    "where": { "email": "zeus@example.com" }
                }),
            )
            .select("id"),
            |a| a.updated(1),
        )?;

        let stored = blog.find("Post", json!({ "title": "orphan" }), "title")?;
        assert_eq!(stored.len(), 1);
        Ok(())
    }

    #[test]
    fn test_family_upsert_creates_then_updates() -> TestResult<()> {
        let blog = Blog::new()?;
        seed(&blog)?;
        let input = json!({
            "data": {
                "family": {
                    "upsert": [{
                        "update": { "age": 4950 },
                        "create": { "name": "Loki", "email": "loki@example.com" },
                        "where": { "email": "loki@example.com" }
                    }]
                }
            },
            "where": { "email": "zeus@example.com" }
        });

        blog.step(
            "nested_upsert_create_family_member",
            update("User", input.clone()).select("email family { name email age }"),
            |a| {
                a.created(1)
                    .linked(1)
                    .data("/email", "zeus@example.com")
                    .data("/family/0/name", "Loki")
                    .data("/family/0/age", Json::Null)
            },
        )?;
        blog.step(
            "nested_upsert_update_family_member",
            update("User", input).select("family { name email age }"),
            |a| {
                a.created(0)
                    .linked(0)
                    .len("/family", 1)
                    .data("/family/0/email", "loki@example.com")
                    .data("/family/0/age", 4950)
            },
        )?;
        Ok(())
    }

    #[test]
    fn test_submissions_mix_posts_and_comments() -> TestResult<()> {
        let blog = Blog::new()?;

        blog.step(
            "create_user_with_post_and_comment",
            create(
                "User",
                json!({
                    "data": {
                        "name": "Hera",
                        "writtenSubmissions": {
                            "comments": { "create": { "title": "nice" } },
                            "posts": { "create": { "title": "first" } }
                        }
                    }
                }),
            )
            .select("writtenSubmissions { title }"),
            |a| {
                a.created(3)
                    .data("/writtenSubmissions/0/__typename", "Post")
                    .data("/writtenSubmissions/0/title", "first")
                    .data("/writtenSubmissions/1/__typename", "Comment")
                    .data("/writtenSubmissions/1/title", "nice")
            },
        )?;
        Ok(())
    }
}

mod upsert {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upsert_creates_then_updates() -> TestResult<()> {
        let blog = Blog::new()?;
        let input = json!({
            "create": { "name": "Corey", "email": "corey@example.com" },
            "update": { "age": 30 },
            "where": { "email": "corey@example.com" }
        });

        let created = blog.step(
            "upsert_create_new_user",
            upsert("User", input.clone()).select("id name email age"),
            |a| a.created(1).data("/name", "Corey").data("/age", Json::Null),
        )?;
        blog.step(
            "upsert_update_upserted_user",
            upsert("User", input).select("id name email age"),
            |a| {
                a.created(0)
                    .updated(1)
                    .data("/id", created["data"]["id"].clone())
                    .data("/age", 30)
                    .data("/email", "corey@example.com")
            },
        )?;
        Ok(())
    }
}

mod update {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_without_match_returns_null() -> TestResult<()> {
        let blog = Blog::new()?;

        blog.step(
            "update_missing_user",
            update("User", json!({ "data": { "age": 1 }, "where": { "email": "nobody@example.com" } }))
                .select("id"),
            |a| a.null_data().updated(0),
        )?;
        Ok(())
    }

    #[test]
    fn test_ambiguous_where_is_a_validation_error() -> TestResult<()> {
        let blog = Blog::new()?;
        for email in ["a@example.com", "b@example.com"] {
            blog.step(
                "create_namesake",
                create("User", json!({ "data": { "name": "Ares", "email": email } })).select("id"),
                |a| a.created(1),
            )?;
        }

        blog.step(
            "update_by_shared_name",
            update("User", json!({ "data": { "age": 1 }, "where": { "name": "Ares" } })).select("id"),
            |a| a.validation(),
        )?;
        Ok(())
    }

    #[test]
    fn test_unique_value_can_be_rewritten_by_its_owner() -> TestResult<()> {
        let blog = Blog::new()?;
        seed(&blog)?;

        blog.step(
            "rewrite_own_email",
            update("User", json!({ "data": { "email": "zeus@example.com" }, "where": { "email": "zeus@example.com" } }))
                .select("email"),
            |a| a.data("/email", "zeus@example.com"),
        )?;
        blog.step(
            "create_other_user",
            create("User", json!({ "data": { "email": "hermes@example.com" } })).select("id"),
            |a| a.created(1),
        )?;
        blog.step(
            "steal_email",
            update("User", json!({ "data": { "email": "zeus@example.com" }, "where": { "email": "hermes@example.com" } }))
                .select("email"),
            |a| a.conflict(ConflictKind::Duplicate).error("duplicate"),
        )?;
        Ok(())
    }
}

mod delete {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_delete_user_returns_last_state_and_clears_references() -> TestResult<()> {
        let blog = Blog::new()?;
        seed(&blog)?;

        blog.step(
            "delete_user",
            delete("User", json!({ "where": { "email": "zeus@example.com" } })).select("id name email"),
            |a| a.deleted(1).unlinked(4).data("/email", "zeus@example.com"),
        )?;

        assert!(blog.find("User", json!({ "email": "zeus@example.com" }), "id")?.is_empty());
        let posts = blog.find("Post", json!({}), "title author { name }")?;
        assert_eq!(posts.len(), 4);
        assert!(posts.iter().all(|post| post["author"].is_null()));
        Ok(())
    }

    #[test]
    fn test_delete_without_match_returns_null() -> TestResult<()> {
        let blog = Blog::new()?;

        blog.step(
            "delete_missing_user",
            delete("User", json!({ "where": { "email": "nobody@example.com" } })).select("id"),
            |a| a.null_data().deleted(0),
        )?;
        Ok(())
    }
}
