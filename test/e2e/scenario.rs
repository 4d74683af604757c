//! End-to-end scenario for the storefront service.
//!
//! Brings Postgres up with docker compose, serves the real router on an
//! ephemeral port and drives every endpoint in one ordered scenario, chaining
//! server-assigned ids through the response bag.
//!
//! Needs a docker daemon, so it is ignored by default:
//!
//! ```text
//! cargo test -p storefront-e2e -- --ignored
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use storefront_api::{config::Config, server};
use storefront_testing::{
    env::database_env, random_name, Compose, EnvFile, PlaceholderPolicy, Scenario, TestCase,
    WebTest,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const UUID: &str = "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

async fn wait_for_ready(base_url: &str) {
    let max_wait = Duration::from_secs(15);
    let start = std::time::Instant::now();
    let client = reqwest::Client::new();

    loop {
        if let Ok(resp) = client.get(format!("{base_url}/readyz")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if start.elapsed() > max_wait {
            panic!("storefront did not become ready within {max_wait:?}");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn root_cases(scenario: Scenario) -> Scenario {
    scenario
        .case("GET /", TestCase::get("/").expect_text("Hello, world!"))
        .case(
            "POST / with JSON",
            TestCase::post("/")
                .json(json!({"key": "value"}))
                .status(201)
                .expect_json(json!({"message": "JSON received"})),
        )
        .case(
            "PUT / with JSON",
            TestCase::put("/")
                .json(json!({"key": "value"}))
                .status(202)
                .expect_json(json!({"message": "JSON received"})),
        )
        .case(
            "DELETE /any/:id",
            TestCase::delete("/any/123")
                .expect_json(json!({"id": "123", "message": "Resource deleted"})),
        )
        .case("GET /ping", TestCase::get("/ping").expect_text("pong"))
        .case("GET /notfound", TestCase::get("/notfound").status(404))
        .case("DELETE / without id", TestCase::delete("/any/").status(404))
        .case(
            "POST / with invalid JSON",
            TestCase::post("/")
                .raw("invalid json")
                .status(400)
                .expect_json(json!({"error": "Invalid request body"})),
        )
}

fn user_cases(scenario: Scenario) -> Scenario {
    let name = random_name();
    let email = format!("{name}@example.com");
    let renamed = random_name();

    scenario
        .case(
            "POST /user",
            TestCase::post("/user")
                .json(json!({"name": name, "email": email}))
                .status(201)
                .expect_pattern(format!(
                    r#"^\{{"id":(?P<userId>\d+),"name":"{name}","email":"{email}"\}}$"#
                )),
        )
        .case(
            "GET /user/:userId",
            TestCase::get("/user/:userId").expect_pattern(format!(
                r#"^\{{"id"::userId,"name":"{name}","email":"{email}"\}}$"#
            )),
        )
        .case(
            "PUT /user/:userId",
            TestCase::put("/user/:userId")
                .json(json!({"name": renamed, "email": email}))
                .expect_pattern(format!(r#""id"::userId,"name":"{renamed}""#)),
        )
        .case(
            "POST /user with invalid email",
            TestCase::post("/user")
                .json(json!({"name": name, "email": "not-an-email"}))
                .status(400),
        )
        .case("DELETE /user/:userId", TestCase::delete("/user/:userId").status(204))
        .case(
            "DELETE /user/:userId again",
            TestCase::delete("/user/:userId").status(204),
        )
        .case(
            "GET deleted user",
            TestCase::get("/user/:userId")
                .status(404)
                .expect_json(json!({"error": "User not found"})),
        )
}

fn customer_cases(scenario: Scenario) -> Scenario {
    let name = random_name();
    let email = format!("{name}@example.com");
    let renamed = random_name();
    let new_email = format!("{renamed}@example.com");

    scenario
        .case(
            "POST /customer",
            TestCase::post("/customer")
                .json(json!({"name": name, "email": email}))
                .status(201)
                .expect_pattern(format!(
                    r#"^\{{"id":"(?P<customerId>{UUID})","name":"{name}","email":"{email}"\}}$"#
                )),
        )
        .case(
            "GET /customer/:customerId",
            TestCase::get("/customer/:customerId").expect_pattern(format!(
                r#"^\{{"id":":customerId","name":"{name}","email":"{email}"\}}$"#
            )),
        )
        .case(
            "PUT /customer/:customerId",
            TestCase::put("/customer/:customerId")
                .json(json!({"name": renamed, "email": new_email}))
                .expect_pattern(format!(
                    r#"^\{{"id":":customerId","name":"{renamed}","email":"{new_email}"\}}$"#
                )),
        )
        .case(
            "GET updated customer",
            TestCase::get("/customer/:customerId").expect_pattern(format!(
                r#""name":"{renamed}","email":"{new_email}""#
            )),
        )
        .case(
            "GET /customer with invalid id",
            TestCase::get("/customer/123")
                .status(400)
                .expect_json(json!({"error": "Invalid customer ID"})),
        )
}

fn product_cases(scenario: Scenario) -> Scenario {
    let name = random_name();

    scenario
        .case(
            "POST /product",
            TestCase::post("/product")
                .json(json!({"name": name, "description": "A widget", "price": 19.99}))
                .status(201)
                .expect_pattern(format!(
                    r#"^\{{"id":"(?P<productId>{UUID})","name":"{name}","description":"A widget","price":19\.99\}}$"#
                )),
        )
        .case(
            "GET /product/:productId",
            TestCase::get("/product/:productId").expect_pattern(format!(
                r#"^\{{"id":":productId","name":"{name}","description":"A widget","price":19\.99\}}$"#
            )),
        )
        .case(
            "PUT /product/:productId",
            TestCase::put("/product/:productId")
                .json(json!({"name": name, "description": "A better widget", "price": 24.5}))
                .status(204),
        )
        .case(
            "GET updated product",
            TestCase::get("/product/:productId")
                .expect_pattern(r#""description":"A better widget","price":24\.5"#),
        )
        .case(
            "POST /product without description",
            TestCase::post("/product")
                .json(json!({"name": "Widget", "price": 19.99}))
                .status(201)
                .expect_pattern(format!(
                    r#"^\{{"id":"(?P<bareProductId>{UUID})","name":"Widget","description":"","price":19\.99\}}$"#
                )),
        )
        .case(
            "GET product without description",
            TestCase::get("/product/:bareProductId").expect_pattern(
                r#"^\{"id":":bareProductId","name":"Widget","description":"","price":19\.99\}$"#,
            ),
        )
        .case(
            "DELETE product without description",
            TestCase::delete("/product/:bareProductId").status(204),
        )
        .case(
            "POST /product with zero price",
            TestCase::post("/product")
                .json(json!({"name": name, "price": 0}))
                .status(400),
        )
}

fn order_cases(scenario: Scenario) -> Scenario {
    scenario
        .case(
            "POST /order",
            TestCase::post("/order")
                .json(json!({
                    "customer_id": ":customerId",
                    "status": "pending",
                    "total": 49.0,
                    "items": [{"product_id": ":productId", "quantity": 2}]
                }))
                .status(201)
                .expect_pattern(format!(
                    r#"^\{{"id":"(?P<orderId>{UUID})","customer_id":":customerId","status":"pending","total":49\.0,"items":\[\{{"id":"{UUID}","order_id":"{UUID}","product_id":":productId","quantity":2\.0\}}\]\}}$"#
                )),
        )
        .case(
            "GET /order/:orderId",
            TestCase::get("/order/:orderId")
                .expect_pattern(r#"^\{"id":":orderId","customer_id":":customerId","status":"pending""#),
        )
        .case(
            "PUT /order/:orderId",
            TestCase::put("/order/:orderId")
                .json(json!({
                    "customer_id": ":customerId",
                    "status": "shipped",
                    "total": 73.5,
                    "items": [{"product_id": ":productId", "quantity": 3}]
                }))
                .expect_pattern(
                    r#""status":"shipped","total":73\.5,.*"product_id":":productId","quantity":3\.0"#,
                ),
        )
        .case(
            "POST /order with unknown customer",
            TestCase::post("/order")
                .json(json!({
                    "customer_id": "00000000-0000-4000-8000-000000000000",
                    "status": "pending",
                    "total": 1.0,
                    "items": [{"product_id": ":productId", "quantity": 1}]
                }))
                .status(400),
        )
        .case(
            "DELETE /order/:orderId",
            TestCase::delete("/order/:orderId").status(204).expect_text(""),
        )
        .case(
            "GET deleted order",
            TestCase::get("/order/:orderId").status(404),
        )
}

fn cleanup_cases(scenario: Scenario) -> Scenario {
    scenario
        .case(
            "DELETE /product/:productId",
            TestCase::delete("/product/:productId").status(204),
        )
        .case(
            "DELETE /customer/:customerId",
            TestCase::delete("/customer/:customerId").status(204),
        )
        .case(
            "DELETE /customer/:customerId again",
            TestCase::delete("/customer/:customerId").status(204),
        )
        .case(
            "GET deleted customer",
            TestCase::get("/customer/:customerId")
                .status(404)
                .expect_json(json!({"error": "Customer not found"})),
        )
}

#[tokio::test]
#[ignore = "requires a docker daemon"]
async fn storefront_end_to_end() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "info,storefront_api=debug,storefront_testing=debug,sqlx=warn".into()
                }),
        )
        .with_test_writer()
        .try_init();

    let root = workspace_root();
    EnvFile::from_path(root.join(".env"))
        .expect("failed to load .env")
        .apply();

    let compose = Compose::new(root.join("docker-compose.yaml"));
    let containers = compose
        .up(&["postgres"])
        .await
        .expect("failed to start docker compose");
    database_env(&containers["postgres"]).expect("postgres publishes no 5432 mapping");

    let config = Config::from_env().expect("invalid service configuration");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_handle = tokio::spawn(server::serve(listener, config, async move {
        let _ = shutdown_rx.await;
    }));

    let base_url = format!("http://127.0.0.1:{port}");
    wait_for_ready(&base_url).await;

    let groups: [fn(Scenario) -> Scenario; 6] = [
        root_cases,
        user_cases,
        customer_cases,
        product_cases,
        order_cases,
        cleanup_cases,
    ];
    let scenario = groups
        .into_iter()
        .fold(Scenario::new("storefront"), |scenario, cases| cases(scenario));

    let mut web = WebTest::new(port)
        .expect("failed to create driver")
        .with_base_url(&base_url);
    let report = scenario.run(&mut web).await;
    for case in &report.cases {
        tracing::info!(case = %case.name, elapsed = ?case.elapsed, "Request timing");
    }

    // An unknown placeholder is sent as is and fails id parsing server-side.
    let mut passthrough = WebTest::new(port)
        .expect("failed to create driver")
        .with_base_url(&base_url)
        .with_placeholder_policy(PlaceholderPolicy::Passthrough);
    let literal = passthrough
        .execute(
            &TestCase::get("/customer/:customerId")
                .status(400)
                .expect_json(json!({"error": "Invalid customer ID"})),
        )
        .await;

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;
    compose.down(&[]).await.expect("failed to stop docker compose");

    report.assert_success();
    let literal = literal.expect("passthrough request failed");
    assert!(literal.is_success(), "{:?}", literal.mismatches);
}
