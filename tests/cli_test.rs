use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::PathBuf;
use swagger_from_routes::cli::{self, CliArgs};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn args(extra: &[&str]) -> CliArgs {
    let mut argv = vec![
        "swagger-from-routes".to_string(),
        fixture("shop.yaml").display().to_string(),
        "--definitions".to_string(),
        fixture("schemas").display().to_string(),
        "-f".to_string(),
        "json".to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    cli::parse_args_from_parsed(CliArgs::parse_from(argv)).expect("Invalid arguments")
}

fn generate(extra: &[&str]) -> Value {
    let output = cli::generate(&args(extra)).expect("Failed to generate document");
    serde_json::from_str(&output).expect("Output is not valid JSON")
}

#[test]
fn test_shop_manifest_openapi_3() {
    let doc = generate(&["--title", "Shop API", "--api-version", "2.1"]);

    assert_eq!(doc["openapi"], "3.0.2");
    assert_eq!(doc["info"], json!({"title": "Shop API", "version": "2.1"}));

    let paths: Vec<_> = doc["paths"].as_object().unwrap().keys().cloned().collect();
    for expected in [
        "/v1/orders",
        "/v2/orders",
        "/orders/{order_id}",
        "/billing/address",
        "/shipping/address",
    ] {
        assert!(paths.contains(&expected.to_string()), "missing path {}", expected);
    }
    assert!(doc["paths"].get("/internal/reset").is_none());
    assert!(doc["paths"].get("/orders").is_none());

    let create = &doc["paths"]["/v1/orders"]["post"];
    assert_eq!(create, &doc["paths"]["/v2/orders"]["post"]);
    assert_eq!(create["summary"], "Create an order.");
    assert_eq!(
        create["description"],
        "Create an order.\n\nStock is reserved before the order is confirmed."
    );
    assert_eq!(
        create["parameters"],
        json!([
            {"in": "body", "name": "body", "required": true,
             "schema": {"$ref": "#/components/schemas/orders.OrderSchema"}},
            {"in": "query", "name": "dry_run", "required": false, "default": false,
             "schema": {"type": "boolean"}},
        ])
    );
    assert_eq!(
        create["responses"],
        json!({
            "200": {"schema": {"$ref": "#/components/schemas/orders.OrderSchema"}},
            "400": {"description": "Invalid order",
                    "schema": {"$ref": "#/components/schemas/common.ErrorSchema"}},
        })
    );

    assert_eq!(
        doc["paths"]["/orders/{order_id}"]["get"]["parameters"],
        json!([
            {"in": "path", "name": "order_id", "required": true, "description": "Order id",
             "schema": {"type": "integer", "format": "int64"}},
            {"in": "query", "name": "fields", "required": false, "default": "summary",
             "schema": {"type": "string", "enum": ["summary", "full"]}},
        ])
    );
}

#[test]
fn test_definitions_are_registered() {
    let doc = generate(&[]);
    let schemas = &doc["components"]["schemas"];

    assert_eq!(
        schemas["orders.OrderSchema"],
        json!({
            "type": "object",
            "required": ["id", "lines"],
            "properties": {
                "id": {"type": "integer", "format": "int64"},
                "lines": {"type": "array", "items": {"$ref": "#/components/schemas/orders.OrderLine"}},
                "note": {"type": "string"},
            },
        })
    );
    assert!(schemas["orders.OrderLine"].is_object());
    assert!(schemas["common.ErrorSchema"].is_object());

    // Same class name, two modules
    assert_eq!(
        schemas["billing.AddressSchema"]["properties"]["iban"]["description"],
        "International bank account number"
    );
    assert_eq!(
        schemas["shipping.AddressSchema"]["required"],
        json!(["street", "city"])
    );
    assert!(schemas["shipping.AddressSchema"]["properties"]["postalCode"].is_object());
    assert_eq!(
        doc["paths"]["/billing/address"]["put"]["parameters"][0]["schema"]["$ref"],
        "#/components/schemas/billing.AddressSchema"
    );
    assert_eq!(
        doc["paths"]["/shipping/address"]["put"]["parameters"][0]["schema"]["$ref"],
        "#/components/schemas/shipping.AddressSchema"
    );
}

#[test]
fn test_shop_manifest_swagger_2() {
    let doc = generate(&[
        "--openapi-version",
        "2.0",
        "--host",
        "shop.example.com",
        "--scheme",
        "https",
        "--no-default-response",
    ]);

    assert_eq!(doc["swagger"], "2.0");
    assert_eq!(doc["host"], "shop.example.com");
    assert_eq!(doc["schemes"], json!(["https"]));
    assert!(doc.get("components").is_none());
    assert!(doc["definitions"]["orders.OrderSchema"].is_object());

    assert_eq!(
        doc["paths"]["/orders/{order_id}"]["get"]["parameters"][1],
        json!({"in": "query", "name": "fields", "required": false, "default": "summary",
               "type": "string", "enum": ["summary", "full"]})
    );
    assert!(doc["paths"]["/billing/address"]["put"].get("responses").is_none());
}

#[test]
fn test_json_manifest_to_yaml_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("swagger.yaml");

    let parsed = CliArgs::parse_from([
        "swagger-from-routes".to_string(),
        fixture("ping.json").display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ]);
    cli::run(cli::parse_args_from_parsed(parsed).unwrap()).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    let doc: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
    assert_eq!(
        doc["info"]["title"].as_str(),
        Some("Swagger Documentation for your application")
    );
    assert_eq!(
        doc["paths"]["/ping"]["get"]["summary"].as_str(),
        Some("Health check.")
    );
}

#[test]
fn test_unknown_schema_class_fails() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("broken.yaml");
    std::fs::write(
        &manifest,
        "routes:\n  - url: /x\n    method: POST\n    handler:\n      name: x\n      arguments:\n        - name: body\n          schema: { class: nowhere.MissingSchema }\n",
    )
    .unwrap();

    let parsed = CliArgs::parse_from([
        "swagger-from-routes".to_string(),
        manifest.display().to_string(),
    ]);
    let error = cli::generate(&parsed).unwrap_err();

    assert!(error.to_string().contains("nowhere.MissingSchema"));
}
