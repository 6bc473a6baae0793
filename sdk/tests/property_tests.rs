use proptest::prelude::*;
use sdk::errors::{EngineError, ErrorExt};
use sdk::validation::validate_request;
use serde_json::json;

proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::Publish(error_str.clone()),
            EngineError::Store(error_str.clone()),
            EngineError::NoPriorRound(error_str.clone()),
            EngineError::Network(error_str.clone()),
            EngineError::Queue(error_str.clone()),
            EngineError::validation("field", error_str.clone()),
        ];

        for err in errs {
            let hint = err.user_hint();
            prop_assert!(!hint.is_empty());
            // Hints are static and never echo the underlying detail
            if error_str.len() > 8 {
                prop_assert!(!hint.contains(&error_str));
            }
        }
    }
}

proptest! {
    #[test]
    fn test_any_well_formed_request_validates(
        local in "[a-z0-9._]{1,16}",
        domain in "[a-z0-9]{1,12}",
        tld in "[a-z]{2,6}",
        task in "[a-z0-9-]{1,32}",
        round in 1u8..=2,
        checks in proptest::collection::vec("\\PC{0,40}", 0..6),
    ) {
        let body = json!({
            "email": format!("{}@{}.{}", local, domain, tld),
            "secret": "s",
            "task": task,
            "round": round,
            "nonce": "n",
            "brief": "b",
            "checks": checks,
            "evaluation_url": "https://example.com/notify",
        });
        prop_assert!(validate_request(&body).is_ok());
    }

    #[test]
    fn test_out_of_range_round_is_rejected(round in 3u64..10_000) {
        let body = json!({
            "email": "a@b.co",
            "secret": "s",
            "task": "t",
            "round": round,
            "nonce": "n",
            "brief": "b",
            "checks": [],
            "evaluation_url": "https://example.com/notify",
        });
        let err = validate_request(&body).unwrap_err();
        prop_assert_eq!(err.to_string(), "round must be 1 or 2");
    }
}
