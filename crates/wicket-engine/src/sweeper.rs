// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idle sweeping: forced forward transitions for stale conversations.
//!
//! One authoritative sweep service backs both drivers -- the internal
//! interval loop and the externally scheduled HTTP trigger call the same
//! idempotent [`IdleSweeper::sweep`]. Idle math uses the server-assigned
//! `last_message_at` (falling back to creation time), never client clocks.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wicket_config::model::SweepConfig;
use wicket_core::types::{Conversation, ConversationStatus, ConversationUpdate};
use wicket_core::{ConversationEvent, ConversationStore, EventBus, WicketError};

/// Forced transition chosen for a stale conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    /// `{active, ai}` idle beyond the short threshold: single status write.
    Deactivate,
    /// Idle beyond the long threshold: close with the canonical ended text.
    End,
}

/// Counts from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub ended: usize,
    pub deactivated: usize,
}

/// Periodically transitions stale conversations forward.
pub struct IdleSweeper {
    store: Arc<dyn ConversationStore>,
    events: EventBus,
    inactive_after: Duration,
    ended_after: Duration,
    interval_secs: u64,
    chunk_size: usize,
    ended_text: String,
}

impl IdleSweeper {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        events: EventBus,
        config: &SweepConfig,
        ended_text: String,
    ) -> Self {
        Self {
            store,
            events,
            inactive_after: Duration::seconds(config.inactive_after_secs as i64),
            ended_after: Duration::seconds(config.ended_after_secs as i64),
            interval_secs: config.interval_secs,
            chunk_size: config.chunk_size.max(1),
            ended_text,
        }
    }

    /// Evaluate the sweep rules for one conversation. Pure.
    ///
    /// Ending takes priority over deactivation: a conversation past the
    /// long threshold is closed even if it would also qualify as idle.
    pub fn evaluate(&self, conversation: &Conversation, now: DateTime<Utc>) -> Option<SweepAction> {
        if conversation.status.is_terminal() {
            return None;
        }
        let idle = conversation.idle_since(now);
        if idle > self.ended_after {
            return Some(SweepAction::End);
        }
        if matches!(
            conversation.status,
            ConversationStatus::Active | ConversationStatus::Ai
        ) && idle > self.inactive_after
        {
            return Some(SweepAction::Deactivate);
        }
        None
    }

    /// Run one sweep pass over all stale conversations.
    ///
    /// Ended-threshold conversations are closed in bounded chunks, each an
    /// atomic batch write; a failed chunk is logged and abandoned for the
    /// next scheduled pass. The pass is idempotent end to end.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, WicketError> {
        let mut report = SweepReport::default();

        // Rule 3: anything non-terminal idle beyond the long threshold.
        let ended_cutoff = now - self.ended_after;
        let to_end = self
            .store
            .list_idle_since(
                &[
                    ConversationStatus::Ai,
                    ConversationStatus::Pending,
                    ConversationStatus::Active,
                    ConversationStatus::Inactive,
                ],
                ended_cutoff,
            )
            .await?;
        let ids: Vec<String> = to_end.into_iter().map(|c| c.id).collect();
        for chunk in ids.chunks(self.chunk_size) {
            match self.store.close_batch(chunk, &self.ended_text, now).await {
                Ok(closed) => report.ended += closed,
                Err(e) => {
                    // Abandoned chunk; unswept conversations are caught by
                    // the next scheduled run.
                    warn!(error = %e, chunk_len = chunk.len(), "sweep chunk failed");
                }
            }
        }

        // Rule 2: {active, ai} idle beyond the short threshold. Queried
        // after the closes above so freshly ended conversations drop out.
        let inactive_cutoff = now - self.inactive_after;
        let to_deactivate = self
            .store
            .list_idle_since(
                &[ConversationStatus::Ai, ConversationStatus::Active],
                inactive_cutoff,
            )
            .await?;
        for conversation in to_deactivate {
            if self.evaluate(&conversation, now) != Some(SweepAction::Deactivate) {
                continue;
            }
            let from = conversation.status;
            match self
                .store
                .apply_update(
                    &conversation.id,
                    ConversationUpdate::status(ConversationStatus::Inactive),
                )
                .await
            {
                Ok(()) => {
                    report.deactivated += 1;
                    self.events.publish(ConversationEvent::StatusChanged {
                        conversation_id: conversation.id,
                        from,
                        to: ConversationStatus::Inactive,
                    });
                }
                Err(e) => {
                    warn!(conversation_id = %conversation.id, error = %e, "deactivate failed");
                }
            }
        }

        self.events.publish(ConversationEvent::Swept {
            ended: report.ended,
            deactivated: report.deactivated,
        });
        Ok(report)
    }

    /// Scheduled sweep loop. Runs until the token is cancelled.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.interval_secs, "idle sweeper started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("idle sweeper stopped");
                    return;
                }
                _ = interval.tick() => {
                    match self.sweep(Utc::now()).await {
                        Ok(report) if report.ended + report.deactivated > 0 => {
                            info!(
                                ended = report.ended,
                                deactivated = report.deactivated,
                                "sweep pass applied transitions"
                            );
                        }
                        Ok(_) => debug!("sweep pass: nothing stale"),
                        Err(e) => warn!(error = %e, "sweep pass failed"),
                    }
                }
            }
        }
    }
}
