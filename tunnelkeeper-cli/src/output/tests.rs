//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

use std::time::Duration;

use tunnelkeeper_core::{AttemptOutcome, AttemptRecord, SessionInfo, TunnelState};
use tunnelkeeper_tunnel::{Activation, CycleError, CycleOutcome, ProviderInfo};

use super::json::JsonFormatter;
use super::text::TextFormatter;

fn info(id: &str, available: bool) -> ProviderInfo {
    ProviderInfo {
        id: id.to_string(),
        name: id.to_string(),
        program: "ssh".to_string(),
        available,
        timeout_secs: 20,
        max_attempts: None,
    }
}

fn failed_cycle() -> CycleOutcome {
    CycleOutcome {
        result: Err(CycleError::AllProvidersExhausted { attempts: 2 }),
        attempts: vec![
            AttemptRecord::failure(
                "serveo",
                1,
                AttemptOutcome::Timeout,
                "No public URL within 20s",
                Duration::from_secs(20),
            ),
            AttemptRecord::failure(
                "cloudflared",
                1,
                AttemptOutcome::VerificationFailed,
                "status 502",
                Duration::from_secs(4),
            )
            .with_url("https://a-b.trycloudflare.com"),
        ],
        duration: Duration::from_secs(24),
    }
}

mod text_formatter_tests {
    use super::*;

    #[test]
    fn test_provider_line_without_colors() {
        let formatter = TextFormatter::new(false);

        let enabled = formatter.format_provider_line(&info("serveo", true), Some(0));
        assert!(enabled.contains("serveo ✓"));
        assert!(enabled.contains("20s"));
        assert!(enabled.trim_end().ends_with('1'));

        let disabled = formatter.format_provider_line(&info("pinggy", false), None);
        assert!(disabled.contains("✗"));
        assert!(disabled.contains("disabled"));
    }

    #[test]
    fn test_attempt_line_shows_url_and_error() {
        let formatter = TextFormatter::new(false);
        let cycle = failed_cycle();

        let line = formatter.format_attempt(&cycle.attempts[1]);
        assert!(line.starts_with("cloudflared"));
        assert!(line.contains("verification-failed"));
        assert!(line.contains("https://a-b.trycloudflare.com"));
        assert!(line.contains("status 502"));
    }

    #[test]
    fn test_cycle_result() {
        let formatter = TextFormatter::new(false);
        assert!(
            formatter
                .format_cycle_result(&failed_cycle())
                .contains("All providers exhausted after 2 attempts")
        );

        let ok = CycleOutcome {
            result: Ok(Activation {
                provider_id: "pinggy".into(),
                url: "https://x.a.free.pinggy.link".into(),
            }),
            attempts: Vec::new(),
            duration: Duration::from_secs(5),
        };
        let line = formatter.format_cycle_result(&ok);
        assert!(line.contains("https://x.a.free.pinggy.link via pinggy"));
    }

    #[test]
    fn test_status_active() {
        let formatter = TextFormatter::new(false);
        let info = SessionInfo {
            state: TunnelState::Active {
                provider: "serveo".into(),
                url: "https://x.serveo.net".into(),
            },
            cycles: 3,
            ..SessionInfo::default()
        };

        let text = formatter.format_status(&info);
        assert!(text.contains("State:     active"));
        assert!(text.contains("URL:       https://x.serveo.net"));
        assert!(text.contains("Cycles:    3"));
    }

    #[test]
    fn test_colors_are_optional() {
        let plain = TextFormatter::new(false).format_provider_line(&info("serveo", true), Some(0));
        let colored = TextFormatter::new(true).format_provider_line(&info("serveo", true), Some(0));

        assert!(!plain.contains('\x1b'));
        assert!(colored.contains('\x1b'));
    }
}

mod json_formatter_tests {
    use super::*;

    #[test]
    fn test_providers_carry_enabled_position() {
        let formatter = JsonFormatter::new(false);
        let infos = vec![info("serveo", true), info("pinggy", false)];
        let enabled = vec!["pinggy".to_string()];

        let json: serde_json::Value =
            serde_json::from_str(&formatter.format_providers(&infos, &enabled).unwrap()).unwrap();

        assert_eq!(json[0]["id"], "serveo");
        assert_eq!(json[0]["enabled"], false);
        assert!(json[0].get("position").is_none());
        assert_eq!(json[1]["enabled"], true);
        assert_eq!(json[1]["position"], 0);
    }

    #[test]
    fn test_failed_cycle() {
        let formatter = JsonFormatter::new(false);
        let json: serde_json::Value =
            serde_json::from_str(&formatter.format_cycle(&failed_cycle()).unwrap()).unwrap();

        assert_eq!(json["success"], false);
        assert!(json.get("url").is_none());
        assert_eq!(json["attempts"].as_array().unwrap().len(), 2);
        assert_eq!(json["attempts"][1]["outcome"], "verification_failed");
        assert_eq!(json["durationMs"], 24_000);
    }
}
