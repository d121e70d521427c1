//! Tests for the error system.

use erudite::error::*;
use pretty_assertions::assert_eq;

#[test]
fn error_api_creation() {
    let err = EruditeError::api(404, "Not Found", "no such model");
    assert!(matches!(&err, EruditeError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API Error: 404 Not Found - no such model");
}

#[test]
fn error_categories_are_stable_for_every_variant() {
    struct Case {
        error: EruditeError,
        expected_category: ErrorCategory,
        expected_cancellation: bool,
    }

    let network_error = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let io_error = std::io::Error::new(std::io::ErrorKind::Other, "disk");
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: EruditeError::UnknownProvider("mistral".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::MissingApiKey {
                provider: "openai".to_string(),
                display_name: "OpenAI".to_string(),
                env_var: "OPENAI_API_KEY".to_string(),
            },
            expected_category: ErrorCategory::Configuration,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Configuration("bad-config".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::api(500, "Internal Server Error", ""),
            expected_category: ErrorCategory::Transport,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::EmptyBody,
            expected_category: ErrorCategory::Transport,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Network(network_error),
            expected_category: ErrorCategory::Transport,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Stream("reset".to_string()),
            expected_category: ErrorCategory::Transport,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Serialization(serde_error),
            expected_category: ErrorCategory::Parse,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Parse("bad json".to_string()),
            expected_category: ErrorCategory::Parse,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Aborted,
            expected_category: ErrorCategory::Cancellation,
            expected_cancellation: true,
        },
        Case {
            error: EruditeError::extraction("paper.pdf", "encrypted"),
            expected_category: ErrorCategory::ContentExtraction,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::InvalidArgument("bad-arg".to_string()),
            expected_category: ErrorCategory::Input,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::NotFound("note 7".to_string()),
            expected_category: ErrorCategory::Input,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Workflow("nothing to do".to_string()),
            expected_category: ErrorCategory::Input,
            expected_cancellation: false,
        },
        Case {
            error: EruditeError::Io(io_error),
            expected_category: ErrorCategory::Unknown,
            expected_cancellation: false,
        },
    ];

    for case in cases {
        assert_eq!(case.error.category(), case.expected_category, "{}", case.error);
        assert_eq!(case.error.is_cancellation(), case.expected_cancellation);
    }
}

#[test]
fn missing_key_message_names_the_provider_and_variable() {
    let err = EruditeError::MissingApiKey {
        provider: "deepseek".to_string(),
        display_name: "DeepSeek".to_string(),
        env_var: "DEEPSEEK_API_KEY".to_string(),
    };
    let message = err.to_string();
    assert!(message.starts_with("DeepSeek API key is missing."));
    assert!(message.contains("DEEPSEEK_API_KEY"));
}

#[test]
fn workflow_errors_display_their_message_verbatim() {
    let err = EruditeError::Workflow(erudite::workflow::NO_INPUT.to_string());
    assert_eq!(err.to_string(), erudite::workflow::NO_INPUT);
}
