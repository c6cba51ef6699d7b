//! Listing modes, meta-tools, search and context-scoped providers.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{names, plain, text_handler, BrokenProvider, ScriptedSource, StaticProvider};
use toolmesh::config::MeshConfig;
use toolmesh::context::CallContext;
use toolmesh::discovery::{ListingMode, EXECUTE_TOOL, TOOL_SEARCH};
use toolmesh::error::MeshError;
use toolmesh::federation::FederationBinding;
use toolmesh::server::ToolServer;
use toolmesh::tools::{ToolArguments, ToolDefinition, ToolParameters, Visibility};

fn server_with_a_and_b() -> ToolServer {
    let server = ToolServer::new(MeshConfig::default()).unwrap();
    server.register_tool(plain("A"), text_handler("a"));
    server.register_tool(
        ToolDefinition::new("B", "adds numbers together", ToolParameters::empty())
            .with_keywords(["math"])
            .discoverable(),
        text_handler("b"),
    );
    server
}

#[tokio::test]
async fn default_mode_lists_native_tools_and_meta_tools() {
    let server = server_with_a_and_b();
    let listing = server.list_tools(&CallContext::default()).await;

    assert_eq!(names(&listing), vec!["A", EXECUTE_TOOL, TOOL_SEARCH]);

    let hits = server.search("math", None, &CallContext::default()).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "B");
    assert!(hits[0].score >= 0.85, "score {}", hits[0].score);
}

#[tokio::test]
async fn show_all_lists_everything_without_meta_tools() {
    let server = server_with_a_and_b();
    let ctx = CallContext::new(ListingMode::ShowAll);

    let listing = server.list_tools(&ctx).await;
    assert_eq!(names(&listing), vec!["A", "B"]);

    let hits = server.search("", None, &ctx).await;
    assert_eq!(hits.iter().map(|h| h.name.as_str()).collect::<Vec<_>>(), vec!["B"]);
}

#[tokio::test]
async fn no_meta_tools_without_discoverable_tools() {
    let server = ToolServer::new(MeshConfig::default()).unwrap();
    server.register_tool(plain("only"), text_handler("x"));

    let listing = server.list_tools(&CallContext::default()).await;
    assert_eq!(names(&listing), vec!["only"]);
}

#[tokio::test]
async fn discoverable_tool_is_callable_by_exact_name_in_any_mode() {
    let server = server_with_a_and_b();
    for mode in [ListingMode::Default, ListingMode::ShowAll] {
        let response = server
            .call_tool("B", ToolArguments::default(), &CallContext::new(mode))
            .await
            .unwrap();
        assert_eq!(response.text_content().as_deref(), Some("b"));
    }
}

#[tokio::test]
async fn meta_tools_are_callable_in_show_all_mode() {
    let server = server_with_a_and_b();
    let ctx = CallContext::new(ListingMode::ShowAll);

    let response = server
        .call_tool(EXECUTE_TOOL, ToolArguments::new(json!({ "name": "B" })), &ctx)
        .await
        .unwrap();
    assert_eq!(response.text_content().as_deref(), Some("b"));
}

#[tokio::test]
async fn tool_search_respects_max_results() {
    let server = ToolServer::new(MeshConfig::default()).unwrap();
    for i in 0..5 {
        server.register_tool(
            ToolDefinition::new(format!("file_op_{i}"), "file operation", ToolParameters::empty())
                .discoverable(),
            text_handler("x"),
        );
    }

    let response = server
        .call_tool(
            TOOL_SEARCH,
            ToolArguments::new(json!({ "query": "file", "max_results": 2 })),
            &CallContext::default(),
        )
        .await
        .unwrap();
    let tools = response.structured_content.unwrap()["tools"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "file_op_0");
    assert_eq!(tools[1]["name"], "file_op_1");
}

#[tokio::test]
async fn tool_search_rejects_wrongly_typed_arguments() {
    let server = server_with_a_and_b();
    let err = server
        .call_tool(
            TOOL_SEARCH,
            ToolArguments::new(json!({ "max_results": "ten" })),
            &CallContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MeshError::InvalidParams { ref field, .. } if field == "max_results"));
}

#[tokio::test]
async fn null_query_lists_every_discoverable_tool() {
    let server = server_with_a_and_b();
    let response = server
        .call_tool(
            TOOL_SEARCH,
            ToolArguments::new(json!({ "query": null, "max_results": null })),
            &CallContext::default(),
        )
        .await
        .unwrap();
    let structured = response.structured_content.unwrap();
    assert_eq!(structured["tools"][0]["name"], "B");
    assert_eq!(structured["tools"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn non_positive_max_results_uses_default() {
    let server = ToolServer::new(MeshConfig::default()).unwrap();
    for i in 0..15 {
        server.register_tool(
            ToolDefinition::new(format!("t{i:02}"), "thing", ToolParameters::empty())
                .discoverable(),
            text_handler("x"),
        );
    }
    let ctx = CallContext::default();
    assert_eq!(server.search("thing", Some(0), &ctx).await.len(), 10);
    assert_eq!(server.search("thing", Some(-3), &ctx).await.len(), 10);
    assert_eq!(server.search("thing", Some(1000), &ctx).await.len(), 15);
}

#[tokio::test]
async fn provider_tools_are_listed_and_callable_for_that_call_only() {
    let server = server_with_a_and_b();
    let provider = StaticProvider::new(
        "ctx",
        vec![
            ToolDefinition::new(
                "scoped",
                "call scoped",
                ToolParameters::object().string("path", "p", true).build(),
            ),
            plain("hidden_scoped").discoverable(),
        ],
    );
    let ctx = CallContext::default().with_provider(provider);

    let listing = server.list_tools(&ctx).await;
    assert_eq!(
        names(&listing),
        vec!["A", EXECUTE_TOOL, "scoped", TOOL_SEARCH]
    );

    let response = server
        .call_tool("scoped", ToolArguments::new(json!({ "path": "/tmp" })), &ctx)
        .await
        .unwrap();
    assert_eq!(response.text_content().as_deref(), Some("ctx:scoped"));

    let err = server
        .call_tool("scoped", ToolArguments::new(json!({})), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, MeshError::InvalidParams { ref field, .. } if field == "path"));

    let hits = server.search("hidden", None, &ctx).await;
    assert_eq!(hits[0].name, "hidden_scoped");

    // A context without the provider knows nothing about it.
    let err = server
        .call_tool("scoped", ToolArguments::new(json!({ "path": "/tmp" })), &CallContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MeshError::UnknownTool(_)));
}

#[tokio::test]
async fn failing_provider_does_not_break_listing() {
    let server = server_with_a_and_b();
    let ctx = CallContext::default()
        .with_provider(Arc::new(BrokenProvider))
        .with_provider(StaticProvider::new("ok", vec![plain("from_ok")]));

    let listing = server.list_tools(&ctx).await;
    assert!(names(&listing).contains(&"from_ok".to_string()));
}

#[tokio::test]
async fn earlier_provider_wins_name_collisions() {
    let server = ToolServer::new(MeshConfig::default()).unwrap();
    let ctx = CallContext::default()
        .with_provider(StaticProvider::new("first", vec![plain("dup")]))
        .with_provider(StaticProvider::new("second", vec![plain("dup")]));

    let listing = server.list_tools(&ctx).await;
    assert_eq!(names(&listing), vec!["dup"]);

    let response = server
        .call_tool("dup", ToolArguments::default(), &ctx)
        .await
        .unwrap();
    assert_eq!(response.text_content().as_deref(), Some("first:dup"));
}

#[tokio::test]
async fn registry_then_federation_then_providers() {
    let server = ToolServer::new(MeshConfig::default()).unwrap();
    server.register_tool(plain("g.shared"), text_handler("local"));
    server
        .register_binding(FederationBinding::new(
            "g",
            ScriptedSource::serving(&["shared", "remote_only"]),
        ))
        .await;
    let ctx = CallContext::default().with_provider(StaticProvider::new(
        "prov",
        vec![plain("g.shared"), plain("g.remote_only"), plain("prov_only")],
    ));

    let listing = server.list_tools(&ctx).await;
    assert_eq!(
        names(&listing),
        vec!["g.remote_only", "g.shared", "prov_only"]
    );

    let call = |name: &'static str| {
        let server = &server;
        let ctx = ctx.clone();
        async move {
            server
                .call_tool(name, ToolArguments::default(), &ctx)
                .await
                .unwrap()
                .text_content()
                .unwrap()
        }
    };
    assert_eq!(call("g.shared").await, "local");
    assert_eq!(call("g.remote_only").await, "remote:remote_only");
    assert_eq!(call("prov_only").await, "prov:prov_only");
}

#[tokio::test]
async fn discoverable_federation_triggers_meta_tools() {
    let server = ToolServer::new(MeshConfig::default()).unwrap();
    server
        .register_binding(
            FederationBinding::new("x", ScriptedSource::serving(&["lookup"]))
                .with_visibility(Visibility::Discoverable),
        )
        .await;

    let listing = server.list_tools(&CallContext::default()).await;
    assert_eq!(names(&listing), vec![EXECUTE_TOOL, TOOL_SEARCH]);

    let hits = server.search("lookup", None, &CallContext::default()).await;
    assert_eq!(hits[0].name, "x.lookup");

    let response = server
        .call_tool(
            EXECUTE_TOOL,
            ToolArguments::new(json!({ "name": "x.lookup", "arguments": { "q": 1 } })),
            &CallContext::default(),
        )
        .await
        .unwrap();
    assert_eq!(response.text_content().as_deref(), Some("remote:lookup"));
}

#[tokio::test]
async fn external_tools_named_like_meta_tools_are_not_exposed() {
    let server = server_with_a_and_b();
    server
        .register_binding(FederationBinding::new("", ScriptedSource::serving(&[EXECUTE_TOOL])))
        .await;
    let ctx = CallContext::default()
        .with_provider(StaticProvider::new("prov", vec![plain(TOOL_SEARCH)]));

    let listing = server.list_tools(&ctx).await;
    assert_eq!(names(&listing), vec!["A", EXECUTE_TOOL, TOOL_SEARCH]);
    let search = listing.iter().find(|d| d.name == TOOL_SEARCH).unwrap();
    assert!(search.description.starts_with("Search for additional tools"));

    // The listed schema and the invoked behaviour agree.
    let response = server
        .call_tool(TOOL_SEARCH, ToolArguments::new(json!({ "query": "math" })), &ctx)
        .await
        .unwrap();
    assert_eq!(response.structured_content.unwrap()["tools"][0]["name"], "B");

    let response = server
        .call_tool(EXECUTE_TOOL, ToolArguments::new(json!({ "name": "A" })), &ctx)
        .await
        .unwrap();
    assert_eq!(response.text_content().as_deref(), Some("a"));

    let ctx = CallContext::new(ListingMode::ShowAll)
        .with_provider(StaticProvider::new("prov", vec![plain(TOOL_SEARCH)]));
    assert_eq!(names(&server.list_tools(&ctx).await), vec!["A", "B"]);
}
