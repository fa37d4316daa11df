use serde_json::json;
use talk_proto::login::{self, Credentials, Device, Error, Pkcs1Sealer};
use talk_proto::types::{LoginResult, Provider};

const N: &str = "a3e86c9b0c92c2b36f70e35500e5748adf6a02e22a89df1fbf8279d720b5e563bd97230d5f6f796ed4547fd20f2637de0e067355fdb84914ca8f7be28e2b859d";

fn device() -> Device {
    Device { ip: "127.0.0.1".into(), name: "test-box".into() }
}

#[test]
fn full_step_sequence() {
    let (provider, s1) = login::step1(Credentials::new("a@b.com", "pw"));
    assert_eq!(provider, Provider::Line);

    let keys = json!({ "session_key": "SK", "rsa_key": format!("key1,{N},10001") });
    let (req, s2) = login::step2(s1, &keys, &device(), &Pkcs1Sealer).unwrap();
    assert_eq!(req.identifier, "a@b.com");
    assert_eq!(req.key_name, "key1");
    assert_eq!(req.provider, Provider::Line);
    assert!(!req.is_mac);
    assert_eq!(req.device_name, "test-box");
    assert_eq!(req.credential.len(), 128, "one 512-bit block, hex encoded");

    let (challenge, s3) = login::step3(s2, LoginResult {
        verifier: Some("V1".into()),
        pin_code: Some("1234".into()),
        ..Default::default()
    }).unwrap();
    assert_eq!(challenge.pin_code, "1234");
    assert_eq!(s3.verifier(), "V1");

    let (verifier, s4) = login::step4(s3, &json!({ "result": { "verifier": "V2" } })).unwrap();
    assert_eq!(verifier, "V2");

    let done = login::finish(s4, LoginResult {
        result_type: 1,
        auth_token:  Some("TOK".into()),
        certificate: Some("CERT".into()),
        ..Default::default()
    }).unwrap();
    assert_eq!(done.auth_token, "TOK");
    assert_eq!(done.certificate.as_deref(), Some("CERT"));
}

#[test]
fn account_id_uses_partner_provider() {
    let (provider, s1) = login::step1(Credentials::new("carpedm20", "pw"));
    assert_eq!(provider, Provider::NaverKr);
    let keys = json!({ "session_key": "SK", "rsa_key": format!("k,{N},10001") });
    let (req, _) = login::step2(s1, &keys, &device(), &Pkcs1Sealer).unwrap();
    assert_eq!(req.provider, Provider::NaverKr);
}

#[test]
fn oversized_identifier_fails_before_any_request_is_built() {
    let long_id = format!("{}@b.com", "a".repeat(260));
    let (_, s1) = login::step1(Credentials::new(long_id, "pw"));
    let keys = json!({ "session_key": "SK", "rsa_key": format!("k,{N},10001") });
    assert!(matches!(
        login::step2(s1, &keys, &device(), &Pkcs1Sealer),
        Err(Error::Crypto(_)),
    ));
}

#[test]
fn missing_pin_or_verifier_is_malformed() {
    let (_, s1) = login::step1(Credentials::new("a@b.com", "pw"));
    let keys = json!({ "session_key": "SK", "rsa_key": format!("k,{N},10001") });
    let (_, s2) = login::step2(s1, &keys, &device(), &Pkcs1Sealer).unwrap();
    let err = login::step3(s2, LoginResult { verifier: Some("V1".into()), ..Default::default() });
    assert!(matches!(err, Err(Error::MissingField { field: "pinCode" })));
}

#[test]
fn certificate_response_without_verifier() {
    let (_, s1) = login::step1(Credentials::new("a@b.com", "pw"));
    let keys = json!({ "session_key": "SK", "rsa_key": format!("k,{N},10001") });
    let (_, s2) = login::step2(s1, &keys, &device(), &Pkcs1Sealer).unwrap();
    let (_, s3) = login::step3(s2, LoginResult {
        verifier: Some("V1".into()),
        pin_code: Some("1234".into()),
        ..Default::default()
    }).unwrap();
    assert!(matches!(
        login::step4(s3, &json!({ "result": {} })),
        Err(Error::MissingField { field: "result.verifier" }),
    ));
}
