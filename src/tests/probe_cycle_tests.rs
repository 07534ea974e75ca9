//! Probe cycle tests
//!
//! Validates:
//! - Skip invariant: unchanged nonce produces no result and no further RPC calls
//! - Always-record invariant: every non-skipped attempt persists exactly one result
//! - Partial failure keeps the tx hash and broadcast window
//! - Latency bookkeeping on success

#[cfg(test)]
mod probe_cycle_tests {
    use crate::metrics::metrics;
    use crate::probe::{
        AttemptOutcome, BalanceWatchdog, ProbeSettings, TransactionProber, WatchdogConfig,
    };
    use crate::test_utils::{test_address, test_wallet, MockRpc, RecordingNotifier, RecordingSink};
    use alloy::consensus::TxEnvelope;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::U256;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;

    struct Fixture {
        prober: TransactionProber,
        rpc: Arc<MockRpc>,
        sink: Arc<RecordingSink>,
        notifier: Arc<RecordingNotifier>,
    }

    fn settings() -> ProbeSettings {
        ProbeSettings {
            chain_id: 43113,
            recipient: test_address(),
            amount_wei: U256::ZERO,
            max_fee: None,
            max_priority_fee: None,
        }
    }

    fn fixture_with(rpc: MockRpc, sink: RecordingSink, settings: ProbeSettings) -> Fixture {
        let rpc = Arc::new(rpc);
        let sink = Arc::new(sink);
        let notifier = Arc::new(RecordingNotifier::new());
        let watchdog = BalanceWatchdog::new(
            rpc.clone(),
            notifier.clone(),
            WatchdogConfig {
                threshold: Decimal::from_str("0.1").unwrap(),
                symbol: "AVAX".to_string(),
                explorer_url: "https://testnet.snowtrace.io".to_string(),
            },
        );
        let prober = TransactionProber::new(rpc.clone(), test_wallet(), watchdog, sink.clone(), settings);
        Fixture {
            prober,
            rpc,
            sink,
            notifier,
        }
    }

    fn fixture(rpc: MockRpc) -> Fixture {
        fixture_with(rpc, RecordingSink::new(), settings())
    }

    #[tokio::test]
    async fn test_successful_probe_records_latency() {
        let f = fixture(MockRpc::new().with_nonce(3));

        let outcome = f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(outcome, AttemptOutcome::Completed(result.clone()));
        assert!(result.is_success());
        assert_eq!(result.chain_id, 43113);
        assert!(result.tx_hash.starts_with("0x"));
        assert_eq!(result.tx_hash.len(), 66);
        assert!(result.start_time > 0);
        assert!(result.end_time >= result.start_time);
        assert!(result.start_time >= result.executed_at);
        assert_eq!(result.latency_ms, result.end_time - result.start_time);

        assert_eq!(
            f.rpc.calls(),
            vec![
                "get_balance",
                "get_transaction_count",
                "get_max_priority_fee",
                "get_base_fee",
                "estimate_gas",
                "send_raw_transaction",
            ]
        );
    }

    #[tokio::test]
    async fn test_broadcast_payload_is_type2_self_transfer() {
        let f = fixture(MockRpc::new().with_nonce(3));

        f.prober.probe_once().await;

        let sent = f.rpc.sent();
        assert_eq!(sent.len(), 1);
        let envelope = TxEnvelope::decode_2718(&mut sent[0].as_ref()).unwrap();
        let TxEnvelope::Eip1559(signed) = envelope else {
            panic!("expected an EIP-1559 transaction");
        };
        let tx = signed.tx();
        assert_eq!(tx.nonce, 3);
        assert_eq!(tx.chain_id, 43113);
        assert_eq!(tx.max_fee_per_gas, 26_000_000_000);
        assert_eq!(tx.max_priority_fee_per_gas, 1_000_000_000);
        assert_eq!(tx.gas_limit, 21_000);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.to.to(), Some(&test_address()));

        assert_eq!(f.sink.results()[0].tx_hash, signed.hash().to_string());

        let estimated = f.rpc.estimated();
        assert_eq!(estimated[0].transaction_type, Some(2));
        assert_eq!(estimated[0].from, Some(test_address()));
    }

    #[tokio::test]
    async fn test_unchanged_nonce_skips_second_tick() {
        let f = fixture(MockRpc::new().with_nonce(7));

        f.prober.probe_once().await;
        f.rpc.clear_calls();

        let outcome = f.prober.probe_once().await;

        assert_eq!(outcome, AttemptOutcome::Skipped { nonce: 7 });
        assert_eq!(f.sink.results().len(), 1);
        assert_eq!(f.rpc.calls(), vec!["get_balance", "get_transaction_count"]);
        assert_eq!(f.prober.nonce_guard().previous_nonce(), Some(7));
    }

    #[tokio::test]
    async fn test_fresh_account_probes_on_first_tick() {
        let f = fixture(MockRpc::new().with_nonce(0));

        let outcome = f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success());
        assert_eq!(outcome, AttemptOutcome::Completed(results[0].clone()));
        assert_eq!(f.rpc.sent().len(), 1);
        assert_eq!(f.prober.nonce_guard().previous_nonce(), Some(0));
    }

    #[tokio::test]
    async fn test_advanced_nonce_probes_again() {
        let f = fixture(MockRpc::new().with_nonce(7).advancing_nonce());

        f.prober.probe_once().await;
        f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_success()));
        assert_ne!(results[0].tx_hash, results[1].tx_hash);
        assert_eq!(f.prober.nonce_guard().previous_nonce(), Some(8));
    }

    #[tokio::test]
    async fn test_balance_failure_is_recorded_and_short_circuits() {
        let f = fixture(MockRpc::new().failing("get_balance"));

        let outcome = f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 1);
        assert_eq!(outcome, AttemptOutcome::Completed(results[0].clone()));
        assert!(results[0].error_message.contains("get_balance"));
        assert_eq!(results[0].error_kind, Some("network_query"));
        assert!(results[0].tx_hash.is_empty());
        assert_eq!(results[0].start_time, 0);
        assert_eq!(f.rpc.calls(), vec!["get_balance"]);
        assert_eq!(f.prober.nonce_guard().previous_nonce(), None);
    }

    #[tokio::test]
    async fn test_nonce_query_failure_is_recorded() {
        let f = fixture(MockRpc::new().failing("get_transaction_count"));

        f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 1);
        assert!(results[0].error_message.contains("get_transaction_count"));
    }

    #[tokio::test]
    async fn test_fee_failure_is_recorded_without_hash() {
        let f = fixture_with(
            MockRpc::new().with_nonce(2),
            RecordingSink::new(),
            ProbeSettings {
                max_fee: Some(Decimal::from(1)),
                max_priority_fee: Some(Decimal::from(2)),
                ..settings()
            },
        );

        f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 1);
        assert!(results[0].error_message.starts_with("Invalid fee configuration"));
        assert!(results[0].tx_hash.is_empty());
        assert_eq!(results[0].latency_ms, 0);
        assert!(f.rpc.sent().is_empty());
    }

    #[tokio::test]
    async fn test_gas_estimate_failure_is_recorded() {
        let f = fixture(MockRpc::new().with_nonce(2).failing("estimate_gas"));

        f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 1);
        assert!(results[0].error_message.contains("estimate_gas"));
        assert!(results[0].tx_hash.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_failure_keeps_partial_data() {
        let f = fixture(MockRpc::new().with_nonce(2).failing("send_raw_transaction"));
        let failed_before = metrics().probe_failed.with_label_values(&["broadcast"]).get();

        f.prober.probe_once().await;

        let results = f.sink.results();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(!result.tx_hash.is_empty());
        assert!(result.error_message.starts_with("Broadcast failed"));
        assert_eq!(result.error_kind, Some("broadcast"));
        assert!(metrics().probe_failed.with_label_values(&["broadcast"]).get() > failed_before);
        assert!(result.start_time > 0);
        assert!(result.end_time >= result.start_time);
        assert_eq!(result.latency_ms, result.end_time - result.start_time);
    }

    #[tokio::test]
    async fn test_failed_attempt_still_consumes_nonce() {
        let f = fixture(MockRpc::new().with_nonce(2).failing("send_raw_transaction"));

        f.prober.probe_once().await;
        let outcome = f.prober.probe_once().await;

        assert_eq!(outcome, AttemptOutcome::Skipped { nonce: 2 });
        assert_eq!(f.sink.results().len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_escape() {
        let f = fixture_with(MockRpc::new().with_nonce(2), RecordingSink::failing(), settings());

        let outcome = f.prober.probe_once().await;

        assert!(matches!(outcome, AttemptOutcome::Completed(ref r) if r.is_success()));
        assert_eq!(f.sink.results().len(), 1);
    }

    #[tokio::test]
    async fn test_low_balance_alerts_and_still_probes() {
        // 0.05 AVAX against a 0.1 threshold
        let f = fixture(MockRpc::new().with_nonce(4).with_balance(50_000_000_000_000_000));

        f.prober.probe_once().await;

        let message = f.notifier.next_message(Duration::from_secs(1)).await.unwrap();
        assert!(message.contains("0.05"));
        assert!(message.contains(&test_address().to_string()));
        assert_eq!(f.sink.results().len(), 1);
        assert!(f.sink.results()[0].is_success());
    }

    #[tokio::test]
    async fn test_configured_amount_and_recipient() {
        let recipient = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        let f = fixture_with(
            MockRpc::new().with_nonce(9),
            RecordingSink::new(),
            ProbeSettings {
                recipient,
                amount_wei: U256::from(1_000u64),
                ..settings()
            },
        );

        f.prober.probe_once().await;

        let envelope = TxEnvelope::decode_2718(&mut f.rpc.sent()[0].as_ref()).unwrap();
        let TxEnvelope::Eip1559(signed) = envelope else {
            panic!("expected an EIP-1559 transaction");
        };
        assert_eq!(signed.tx().to.to(), Some(&recipient));
        assert_eq!(signed.tx().value, U256::from(1_000u64));
    }
}
