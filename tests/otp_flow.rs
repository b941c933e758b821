use std::path::PathBuf;

use jiff::Timestamp;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use formflow_client::{Config, Error, FormFlowClient};

fn config_for(server: &MockServer, tag: &str) -> Config {
    std::fs::create_dir_all("target").ok();
    let store = PathBuf::from("target").join(format!(
        "formflow-{tag}-{}.json",
        server.address().port()
    ));
    std::fs::remove_file(&store).ok();
    Config::from_values(&server.uri(), store, Some(5))
}

fn mint_token(exp: i64) -> String {
    #[derive(serde::Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &Claims {
            sub: "u-9".to_string(),
            exp,
        },
        &jsonwebtoken::EncodingKey::from_secret(b"it-secret"),
    )
    .expect("token encodes")
}

#[tokio::test]
async fn generate_validate_and_resend() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/otp/generate"))
        .and(body_json(serde_json::json!({"phone": "+233200000001"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sent": true,
            "retryAfterSecs": 30,
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/otp/resend"))
        .and(body_json(serde_json::json!({"phone": "+233200000001"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sent": true})))
        .expect(1)
        .mount(&server)
        .await;

    let access = mint_token(Timestamp::now().as_second() + 900);
    Mock::given(method("POST"))
        .and(path("/otp/validate"))
        .and(body_json(serde_json::json!({
            "phone": "+233200000001",
            "code": "482913",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessToken": access,
            "refreshToken": "refresh-9",
            "user": { "id": "u-9", "email": "otp@example.com", "phone": "+233200000001" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = FormFlowClient::new(config_for(&server, "otp")).expect("client builds");

    let otp = client
        .generate_otp("+233200000001")
        .await
        .expect("generate succeeds");
    assert!(otp.sent);
    assert_eq!(otp.retry_after_secs, Some(30));

    let resent = client
        .resend_otp("+233200000001")
        .await
        .expect("resend succeeds");
    assert!(resent.sent);
    assert_eq!(resent.retry_after_secs, None);

    let user = client
        .validate_otp("+233200000001", "482913")
        .await
        .expect("validate succeeds");
    assert_eq!(user.id, "u-9");

    // a validated code is a login: tokens persisted, session live
    assert_eq!(
        client.store().refresh_token().await.as_deref(),
        Some("refresh-9")
    );
    assert!(client.is_authenticated().await);
}

#[tokio::test]
async fn an_invalid_code_maps_to_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/otp/validate"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "code expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = FormFlowClient::new(config_for(&server, "otp-bad")).expect("client builds");
    let err = client
        .validate_otp("+233200000001", "000000")
        .await
        .expect_err("validate should fail");

    match err {
        Error::Api(status, message) => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(message, "code expired");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    // nothing was persisted for the failed attempt
    assert_eq!(client.store().access_token().await, None);
}
