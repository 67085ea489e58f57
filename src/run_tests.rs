//! Tests for the run module.

use super::*;
use basewatch::config::Cli;
use basewatch::subscription::{AlertType, MemorySubscriptionStore};
use basewatch::upstream::PayloadFetcher;

fn config(args: &[&str]) -> ValidatedConfig {
    let mut argv = vec!["basewatch", "--endpoint", "https://status.example.com/api"];
    argv.extend_from_slice(args);
    ValidatedConfig::from_raw(&Cli::parse_from_iter(argv), None).unwrap()
}

mod run_error {
    use super::*;
    use basewatch::upstream::SecurityPolicyViolation;

    #[test]
    fn check_error_is_transparent() {
        let error = RunError::from(CheckError::Disabled(SecurityPolicyViolation {
            url: "ftp://status.example.com/".to_string(),
            reason: "only http(s) endpoints are supported",
        }));

        assert!(error.to_string().starts_with("Polling is disabled"));
    }

    #[test]
    fn registry_error_displays_source() {
        let error = RunError::from(RegistryError::Corrupted {
            path: "subs.json".into(),
            reason: "expected value".to_string(),
        });

        assert!(error.to_string().contains("Subscription registry error"));
    }
}

mod create_sender {
    use super::*;

    #[test]
    fn dry_run_only_logs() {
        let config = config(&["--dry-run", "--token", "secret"]);

        assert!(matches!(create_sender(&config).unwrap(), AppSender::Log(_)));
    }

    #[test]
    fn token_selects_discord() {
        let config = config(&["--token", "secret", "--api-base", "https://discord.test/api"]);

        let AppSender::Discord(sender) = create_sender(&config).unwrap() else {
            panic!("expected Discord sender");
        };
        assert_eq!(sender.api_base().as_str(), "https://discord.test/api");
    }
}

mod build_engine {
    use super::*;
    use basewatch::engine::PollState;

    #[test]
    fn fetcher_uses_configured_endpoint() {
        let config = config(&["--dry-run"]);

        let fetcher = create_fetcher(&config).unwrap();

        assert_eq!(fetcher.endpoint().as_str(), "https://status.example.com/api");
        assert!(fetcher.check_policy().is_ok());
    }

    #[test]
    fn applies_station_allow_list() {
        let config = config(&["--dry-run", "--stations", "Alpha,Pirate*"]);

        let engine = build_engine(&config).unwrap();

        let allow = engine.allow_list().unwrap();
        assert!(allow.contains("Alpha"));
        assert!(allow.contains("Pirate Cove"));
        assert!(!allow.contains("Beta"));
        assert_eq!(engine.state(), PollState::Idle);
    }

    #[test]
    fn tracks_everything_without_stations() {
        let engine = build_engine(&config(&["--dry-run"])).unwrap();

        assert!(engine.allow_list().is_none());
        assert!(engine.snapshot().is_empty());
    }

    #[tokio::test]
    async fn check_refuses_plain_http_endpoint() {
        let cli = Cli::parse_from_iter([
            "basewatch",
            "--endpoint",
            "http://status.example.com/api",
            "--dry-run",
        ]);
        let config = ValidatedConfig::from_raw(&cli, None).unwrap();

        let err = check(&config).await.unwrap_err();

        assert!(matches!(err, RunError::Check(CheckError::Disabled(_))));
    }
}

mod registry_command {
    use super::*;

    fn subscribe(channel: u64, alert_type: AlertType) -> Command {
        Command::Subscribe {
            guild: 1,
            channel,
            alert_type,
        }
    }

    #[tokio::test]
    async fn subscribe_then_list() {
        let store = MemorySubscriptionStore::new();

        let first = registry_command(&store, &subscribe(10, AlertType::All))
            .await
            .unwrap();
        let again = registry_command(&store, &subscribe(10, AlertType::Items))
            .await
            .unwrap();
        registry_command(&store, &subscribe(11, AlertType::Health))
            .await
            .unwrap();
        let list = registry_command(&store, &Command::List).await.unwrap();

        assert_eq!(first, "Subscribed channel 10 to all alerts");
        assert_eq!(again, "Channel 10 is already subscribed");
        assert_eq!(
            list,
            "10 (guild 1, all alerts)\n11 (guild 1, health alerts)"
        );
    }

    #[tokio::test]
    async fn unsubscribe_unknown_channel_succeeds() {
        let store = MemorySubscriptionStore::new();

        let output = registry_command(&store, &Command::Unsubscribe { channel: 99 })
            .await
            .unwrap();

        assert_eq!(output, "Unsubscribed channel 99");
    }

    #[tokio::test]
    async fn list_empty_registry() {
        let store = MemorySubscriptionStore::new();

        let output = registry_command(&store, &Command::List).await.unwrap();

        assert_eq!(output, "No channels subscribed");
    }

    #[tokio::test]
    async fn changes_persist_in_file_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");

        registry_command(
            &FileSubscriptionStore::new(&path),
            &subscribe(10, AlertType::All),
        )
        .await
        .unwrap();
        let list = registry_command(&FileSubscriptionStore::new(&path), &Command::List)
            .await
            .unwrap();

        assert_eq!(list, "10 (guild 1, all alerts)");
    }

    #[tokio::test]
    async fn corrupted_registry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = registry_command(&FileSubscriptionStore::new(&path), &Command::List)
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Registry(RegistryError::Corrupted { .. })));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }
}
