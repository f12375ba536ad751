use sectordb_core::config::LlmSettings;
use sectordb_core::traits::CompletionClient;
use sectordb_llm::OpenAiCompatibleClient;

#[tokio::test]
async fn unreachable_endpoint_is_an_error_not_a_panic() {
    // Port 9 (discard) on loopback refuses connections on CI hosts.
    let settings = LlmSettings {
        base_url: "http://127.0.0.1:9/v1".into(),
        api_key_env: "SECTORDB_TEST_UNSET_KEY".into(),
        timeout_secs: 2,
        ..Default::default()
    };
    let client = OpenAiCompatibleClient::from_settings(&settings).expect("client");
    let result = client.complete("be brief", "hello", 0.0).await;
    assert!(result.is_err());
}
