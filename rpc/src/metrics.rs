//! Prometheus metrics for the ideas API.
//!
//! [`ApiMetrics`] owns a dedicated [`Registry`] that the `/metrics` endpoint
//! encodes into the Prometheus text exposition format.

use ideas_ledger::{CommandKind, ErrorKind, LedgerStats};
use prometheus::{
    register_int_counter_vec_with_registry, register_int_gauge_with_registry, Encoder,
    IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::error::RpcError;

pub struct ApiMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Accepted mutating commands, by command.
    pub commands_accepted: IntCounterVec,
    /// Rejected mutating commands, by command and rejection reason.
    pub commands_rejected: IntCounterVec,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Idea slots, tombstones included.
    pub idea_slots: IntGauge,
    /// Ideas that are not tombstones.
    pub live_ideas: IntGauge,
    /// Sequence of the latest ledger event.
    pub event_sequence: IntGauge,
}

impl ApiMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let commands_accepted = register_int_counter_vec_with_registry!(
            Opts::new(
                "ideas_commands_accepted_total",
                "Mutating commands accepted by the ledger"
            ),
            &["command"],
            registry
        )
        .expect("failed to register commands_accepted counter");

        let commands_rejected = register_int_counter_vec_with_registry!(
            Opts::new(
                "ideas_commands_rejected_total",
                "Mutating commands rejected by the ledger"
            ),
            &["command", "reason"],
            registry
        )
        .expect("failed to register commands_rejected counter");

        let idea_slots = register_int_gauge_with_registry!(
            Opts::new("ideas_idea_slots", "Idea slots including tombstones"),
            registry
        )
        .expect("failed to register idea_slots gauge");

        let live_ideas = register_int_gauge_with_registry!(
            Opts::new("ideas_live_ideas", "Ideas that have not been deleted"),
            registry
        )
        .expect("failed to register live_ideas gauge");

        let event_sequence = register_int_gauge_with_registry!(
            Opts::new("ideas_event_sequence", "Sequence of the latest ledger event"),
            registry
        )
        .expect("failed to register event_sequence gauge");

        Self {
            registry,
            commands_accepted,
            commands_rejected,
            idea_slots,
            live_ideas,
            event_sequence,
        }
    }

    pub fn record_accepted(&self, command: CommandKind) {
        self.commands_accepted
            .with_label_values(&[command.as_str()])
            .inc();
    }

    pub fn record_rejected(&self, command: CommandKind, reason: ErrorKind) {
        self.commands_rejected
            .with_label_values(&[command.as_str(), reason.as_str()])
            .inc();
    }

    /// Update the gauges from fresh ledger counters.
    pub fn observe(&self, stats: &LedgerStats) {
        self.idea_slots.set(stats.idea_slots as i64);
        self.live_ideas.set(stats.live_ideas as i64);
        self.event_sequence.set(stats.last_sequence as i64);
    }

    /// Render every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, RpcError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| RpcError::Server(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| RpcError::Server(e.to_string()))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}
