//! Command tests for interface_cli

use serde_json::json;

use domain_prior_auth::DefaultsConfig;
use interface_cli::{convert, describe_status, revert, AppConfig};
use test_utils::{ClaimFixtures, ReviewFixtures};

#[test]
fn test_convert_fixture_claim() {
    let payload = serde_json::to_value(ClaimFixtures::lumbar_mri()).unwrap();
    let review = convert(&payload, &DefaultsConfig::default()).unwrap();

    assert_eq!(review["serviceReview"]["payer"]["name"], json!("Aetna"));
    assert_eq!(review["serviceReview"]["fromDate"], json!("2024-06-01"));
    assert_eq!(review["serviceReview"]["toDate"], json!("2024-06-30"));
}

#[test]
fn test_convert_survives_malformed_fields() {
    let mut payload = serde_json::to_value(ClaimFixtures::lumbar_mri()).unwrap();
    payload["items"][0]["quantity"] = json!(-1);
    payload["patientBirthDate"] = json!("29/02/1980");

    let review = convert(&payload, &DefaultsConfig::default()).unwrap();
    assert_eq!(review["serviceReview"]["diagnoses"][0]["code"], json!("M54.5"));
    assert_eq!(review["serviceReview"]["procedures"][0]["quantity"], json!("1"));
    assert_eq!(review["serviceReview"]["payer"]["id"], json!("60054"));
}

#[test]
fn test_configured_codes_reach_output() {
    let config = AppConfig::from_toml(
        r#"
        [defaults]
        service_type_code = "1"
        place_of_service_code = "11"
        "#,
    )
    .unwrap();
    let payload = serde_json::to_value(ClaimFixtures::lumbar_mri()).unwrap();
    let review = convert(&payload, &config.defaults).unwrap();

    assert_eq!(review["serviceReview"]["serviceTypeCode"], json!("1"));
    assert_eq!(review["serviceReview"]["placeOfServiceCode"], json!("11"));
}

#[test]
fn test_revert_fixture_review() {
    let claim = revert(&ReviewFixtures::wrapped_review(), &DefaultsConfig::default()).unwrap();

    let codes: Vec<_> = claim["diagnoses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["code"].clone())
        .collect();
    assert_eq!(codes, vec![json!("M54.5"), json!("M51.26")]);
    assert_eq!(claim["use"], json!("preauthorization"));
}

#[test]
fn test_status_report_serializes() {
    let report = serde_json::to_value(describe_status("504", "Timeout")).unwrap();
    assert_eq!(report["status"], json!("ERROR_TIMEOUT_FROM_PLAN"));
    assert_eq!(report["terminal"], json!(true));
    assert_eq!(report["rawCode"], json!("504"));
}
