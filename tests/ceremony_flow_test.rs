// End-to-end ceremony flows against the in-memory service and platform
use std::sync::Arc;

use passbind::ceremony::{CeremonyClient, CeremonyKind, CeremonyState, Verdict};
use passbind::codec;
use passbind::errors::{CeremonyError, ErrorCategory, ErrorKind, PlatformError};
use passbind::testing::constants::{
    TEST_CREDENTIAL_ID, TEST_DEVICE_ID_HASH, TEST_EMAIL, TEST_PASSWORD, TEST_RP_ID,
};
use passbind::testing::{MockPlatform, MockTransport, TestFixtures};
use serde_json::json;

const REGISTER_START: &str = "/webauthn/register/start";
const REGISTER_FINISH: &str = "/webauthn/register/finish";
const LOGIN_START: &str = "/webauthn/login/start";
const LOGIN_FINISH: &str = "/webauthn/login/finish";

struct Harness {
    transport: Arc<MockTransport>,
    platform: Arc<MockPlatform>,
    client: CeremonyClient,
}

fn harness() -> Harness {
    harness_with_context(TestFixtures::secure_context())
}

fn harness_with_context(context: passbind::ExecutionContext) -> Harness {
    let transport = Arc::new(MockTransport::new());
    let platform = Arc::new(MockPlatform::new());
    let client = CeremonyClient::new(
        transport.clone(),
        Arc::new(TestFixtures::environment()),
        context,
    )
    .with_platform(platform.clone());
    Harness {
        transport,
        platform,
        client,
    }
}

fn script_registration(h: &Harness) {
    h.transport
        .respond(REGISTER_START, 200, TestFixtures::registration_options());
    h.transport
        .respond(REGISTER_FINISH, 200, json!({ "message": "registered" }));
    h.platform
        .create_returns(Ok(Some(TestFixtures::registration_credential())));
}

fn script_login(h: &Harness, finish_status: u16, finish_body: serde_json::Value) {
    h.transport
        .respond(LOGIN_START, 200, TestFixtures::authentication_options());
    h.transport.respond(LOGIN_FINISH, finish_status, finish_body);
    h.platform
        .get_returns(Ok(Some(TestFixtures::assertion_credential())));
}

#[tokio::test]
async fn test_registration_happy_path() {
    let h = harness();
    script_registration(&h);

    let outcome = h.client.register(TEST_EMAIL).await.unwrap();

    assert_eq!(outcome.kind, CeremonyKind::Registration);
    assert_eq!(outcome.verdict, Verdict::Verified);
    assert_eq!(outcome.state, CeremonyState::Succeeded);

    let finish = h.transport.last_request(REGISTER_FINISH).unwrap();
    let attestation = &finish.body["attestationResponse"];
    assert_eq!(attestation["id"], TEST_CREDENTIAL_ID);
    assert_eq!(attestation["type"], "public-key");
    let attestation_object = attestation["response"]["attestationObject"]
        .as_str()
        .unwrap();
    let client_data = attestation["response"]["clientDataJSON"].as_str().unwrap();
    assert_eq!(codec::decode(attestation_object).unwrap(), vec![0x01, 0x02]);
    assert_eq!(codec::decode(client_data).unwrap(), vec![0x03]);
    assert_eq!(
        codec::decode(attestation["rawId"].as_str().unwrap()).unwrap(),
        TEST_CREDENTIAL_ID.as_bytes()
    );
    assert_eq!(attestation["response"]["transports"], json!(["internal"]));
}

#[tokio::test]
async fn test_registration_hands_decoded_options_to_platform() {
    let h = harness();
    script_registration(&h);

    h.client.register(TEST_EMAIL).await.unwrap();

    let options = h.platform.last_creation_options().unwrap();
    assert_eq!(options.challenge, TestFixtures::CHALLENGE);
    assert_eq!(options.user.id, TestFixtures::USER_HANDLE);
    assert_eq!(options.rp.id, TEST_RP_ID);
    assert_eq!(options.exclude_credentials.len(), 1);
    assert_eq!(
        options.exclude_credentials[0].id,
        TestFixtures::EXCLUDED_CREDENTIAL
    );
    assert_eq!(options.pub_key_cred_params.len(), 2);
    assert_eq!(options.timeout, Some(60000));
}

#[tokio::test]
async fn test_fingerprint_travels_as_header_and_finish_field() {
    let h = harness();
    script_registration(&h);
    let fingerprint = h.client.device_fingerprint();

    h.client.register(TEST_EMAIL).await.unwrap();

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.device.as_deref(), Some(fingerprint.as_str()));
    }
    let start = &requests[0];
    assert_eq!(start.path, REGISTER_START);
    assert_eq!(start.body, json!({ "email": TEST_EMAIL }));
    assert_eq!(requests[1].body["fpVisitorId"], fingerprint.as_str());
}

#[tokio::test]
async fn test_registration_without_rp_id_never_reaches_platform() {
    let h = harness();
    h.transport.respond(
        REGISTER_START,
        200,
        json!({ "challenge": "AAA", "rp": {}, "user": { "id": "QQ" } }),
    );
    h.platform
        .create_returns(Ok(Some(TestFixtures::registration_credential())));

    let err = h.client.register(TEST_EMAIL).await.unwrap_err();

    assert!(matches!(err, CeremonyError::MissingField("rp.id")));
    assert_eq!(err.category(), ErrorCategory::MissingProtocolField);
    assert_eq!(err.classify().kind(), ErrorKind::Protocol);
    assert_eq!(h.platform.create_calls(), 0);
    assert!(h.transport.last_request(REGISTER_FINISH).is_none());
    assert_eq!(
        h.client.last_ceremony().unwrap().state(),
        CeremonyState::Rejected
    );
}

#[tokio::test]
async fn test_undecodable_challenge_is_malformed_options() {
    let h = harness();
    h.transport.respond(
        REGISTER_START,
        200,
        json!({ "challenge": "a+b/", "rp": { "id": TEST_RP_ID }, "user": { "id": "QQ" } }),
    );

    let err = h.client.register(TEST_EMAIL).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::MalformedOptions);
    assert_eq!(h.platform.create_calls(), 0);
}

#[tokio::test]
async fn test_insecure_context_makes_no_network_call() {
    let h = harness_with_context(TestFixtures::insecure_context());
    script_registration(&h);

    let err = h.client.register(TEST_EMAIL).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::InsecureContext);
    assert_eq!(err.classify().kind(), ErrorKind::Environmental);
    assert!(h.transport.requests().is_empty());
    assert_eq!(h.platform.create_calls(), 0);
}

#[tokio::test]
async fn test_localhost_over_http_is_allowed() {
    let h = harness_with_context(passbind::ExecutionContext::new("http:", "localhost"));
    script_registration(&h);

    assert!(h.client.register(TEST_EMAIL).await.unwrap().is_verified());
}

#[tokio::test]
async fn test_excluded_credential_is_state_conflict() {
    let h = harness();
    script_registration(&h);
    let mut credential = TestFixtures::registration_credential();
    credential.raw_id = TestFixtures::EXCLUDED_CREDENTIAL.to_vec();
    h.platform.create_returns(Ok(Some(credential)));

    let err = h.client.register(TEST_EMAIL).await.unwrap_err();

    let classified = err.classify();
    assert_eq!(classified.category, ErrorCategory::CredentialAlreadyExists);
    assert_eq!(classified.kind(), ErrorKind::StateConflict);
    assert!(classified.kind().is_retryable());
    assert!(h.transport.last_request(REGISTER_FINISH).is_none());
}

#[tokio::test]
async fn test_envelope_wrapped_options_are_accepted() {
    let h = harness();
    script_registration(&h);
    h.transport.respond(
        REGISTER_START,
        200,
        json!({ "publicKey": TestFixtures::registration_options() }),
    );

    let outcome = h.client.register(TEST_EMAIL).await.unwrap();

    assert!(outcome.is_verified());
}

#[tokio::test]
async fn test_login_verified_succeeds() {
    let h = harness();
    script_login(&h, 200, json!({ "verified": true }));

    let outcome = h.client.login(TEST_EMAIL).await.unwrap();

    assert_eq!(outcome.kind, CeremonyKind::Authentication);
    assert_eq!(outcome.state, CeremonyState::Succeeded);
    assert!(outcome.is_verified());

    let finish = h.transport.last_request(LOGIN_FINISH).unwrap();
    let assertion = &finish.body["assertionResponse"];
    assert_eq!(assertion["id"], TEST_CREDENTIAL_ID);
    let signature = assertion["response"]["signature"].as_str().unwrap();
    assert_eq!(
        codec::decode(signature).unwrap(),
        TestFixtures::assertion_credential().signature
    );
    let user_handle = assertion["response"]["userHandle"].as_str().unwrap();
    assert_eq!(codec::decode(user_handle).unwrap(), TestFixtures::USER_HANDLE);

    let options = h.platform.last_request_options().unwrap();
    assert_eq!(options.challenge, TestFixtures::CHALLENGE);
    assert_eq!(options.allow_credentials[0].id, TEST_CREDENTIAL_ID.as_bytes());
    assert_eq!(options.rp_id.as_deref(), Some(TEST_RP_ID));
}

#[tokio::test]
async fn test_login_not_verified_is_rejected() {
    let h = harness();
    script_login(&h, 200, json!({ "verified": false }));

    let outcome = h.client.login(TEST_EMAIL).await.unwrap();

    assert_eq!(outcome.verdict, Verdict::NotVerified);
    assert_eq!(outcome.state, CeremonyState::Rejected);
    assert!(h.client.session().current().is_none());
}

#[tokio::test]
async fn test_login_finish_without_flag_is_not_verified() {
    let h = harness();
    script_login(&h, 200, json!({ "message": "ok" }));

    let outcome = h.client.login(TEST_EMAIL).await.unwrap();

    assert!(!outcome.is_verified());
}

#[tokio::test]
async fn test_login_finish_error_status_is_server_rejection() {
    let h = harness();
    script_login(&h, 401, json!({ "message": "Device mismatch" }));

    let err = h.client.login(TEST_EMAIL).await.unwrap_err();

    let classified = err.classify();
    assert_eq!(classified.category, ErrorCategory::ServerRejected);
    assert_eq!(classified.message, "Device mismatch");
    assert_eq!(
        h.client.last_ceremony().unwrap().state(),
        CeremonyState::Rejected
    );
    assert!(h.client.session().current().is_none());
}

#[tokio::test]
async fn test_login_without_challenge_is_missing_field() {
    let h = harness();
    h.transport
        .respond(LOGIN_START, 200, json!({ "rpId": TEST_RP_ID }));

    let err = h.client.login(TEST_EMAIL).await.unwrap_err();

    assert!(matches!(err, CeremonyError::MissingField("challenge")));
    assert_eq!(h.platform.get_calls(), 0);
}

#[tokio::test]
async fn test_unscripted_platform_counts_as_cancelled() {
    let h = harness();
    h.transport
        .respond(LOGIN_START, 200, TestFixtures::authentication_options());

    let err = h.client.login(TEST_EMAIL).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::UserCancelledOrDenied);
    assert_eq!(err.classify().kind(), ErrorKind::UserInteraction);
}

#[tokio::test]
async fn test_platform_security_error() {
    let h = harness();
    h.transport
        .respond(LOGIN_START, 200, TestFixtures::authentication_options());
    h.platform.get_returns(Err(PlatformError::new(
        "SecurityError",
        "The relying party ID is not a registrable domain suffix",
    )));

    let err = h.client.login(TEST_EMAIL).await.unwrap_err();

    assert_eq!(err.category(), ErrorCategory::SecurityContextError);
}

#[tokio::test]
async fn test_retry_is_a_fresh_invocation() {
    let h = harness();
    h.transport
        .respond(LOGIN_START, 200, TestFixtures::authentication_options());
    h.client.login(TEST_EMAIL).await.unwrap_err();
    let first = h.client.last_ceremony().unwrap();

    script_login(&h, 200, json!({ "verified": true }));
    let outcome = h.client.login(TEST_EMAIL).await.unwrap();

    assert_ne!(first.id(), outcome.id);
    assert_eq!(first.state(), CeremonyState::Rejected);
    assert_eq!(outcome.state, CeremonyState::Succeeded);
}

#[tokio::test]
async fn test_password_login_stores_device_hash() {
    let h = harness();
    h.transport
        .respond("/auth/login", 200, TestFixtures::password_login_response());

    let outcome = h
        .client
        .password_login(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();

    assert_eq!(outcome.kind, CeremonyKind::PasswordLogin);
    assert_eq!(outcome.device_id_hash.as_deref(), Some(TEST_DEVICE_ID_HASH));
    assert_eq!(
        h.client.session().device_id_hash().as_deref(),
        Some(TEST_DEVICE_ID_HASH)
    );

    let request = h.transport.last_request("/auth/login").unwrap();
    assert_eq!(
        request.body,
        json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD })
    );
    assert_eq!(
        request.device.as_deref(),
        Some(h.client.device_fingerprint().as_str())
    );
    assert_eq!(h.platform.create_calls() + h.platform.get_calls(), 0);
}

#[tokio::test]
async fn test_rejected_password_login_leaves_session_alone() {
    let h = harness();
    h.transport
        .respond("/auth/login", 401, json!({ "error": "Invalid credentials" }));

    let err = h
        .client
        .password_login(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap_err();

    assert_eq!(err.classify().message, "Invalid credentials");
    assert!(h.client.session().device_id_hash().is_none());
}

#[tokio::test]
async fn test_password_login_works_in_insecure_context() {
    let h = harness_with_context(TestFixtures::insecure_context());
    h.transport
        .respond("/auth/login", 200, TestFixtures::password_login_response());

    let outcome = h
        .client
        .password_login(TEST_EMAIL, TEST_PASSWORD)
        .await
        .unwrap();

    assert!(outcome.is_verified());
}
