use hemmer_provider_whisparr::testing::ProviderTester;
use hemmer_provider_whisparr::WhisparrProvider;
use serde_json::json;
use wiremock::MockServer;

pub const API_KEY: &str = "0123456789abcdef";

/// A provider configured against `server`, ignoring the process environment.
pub async fn configured(server: &MockServer) -> ProviderTester<WhisparrProvider> {
    let tester = ProviderTester::new(WhisparrProvider::with_env(|_| None));
    tester
        .configure(json!({"url": server.uri(), "api_key": API_KEY}))
        .await
        .expect("configure");
    tester
}
