//! Confirmation prompts.
//!
//! A handler about to do something destructive calls [`Prompt::ask`]. The
//! prompt tells the user what is about to happen, then waits for the next
//! non-empty message from the same conversation and the same sender:
//!
//! ```text
//!            ┌─ "确认" ───────────▶ Confirmed
//! ask ─ wait ┼─ anything else ────▶ Cancelled
//!            └─ timeout elapsed ──▶ TimedOut  (reply: 等待超时...)
//! ```
//!
//! Waiting is done with a transient [`EventBus`] listener feeding a
//! one-slot channel; the first qualifying answer wins and later ones are
//! dropped. The listener is always removed before `ask` returns.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use campfire_core::{BoxError, EventBus, EventType, MessageContext, SessionMatcher, listener};

use crate::handler::HandlerResult;

/// The answer that confirms a prompt.
pub const CONFIRM_TOKEN: &str = "确认";

/// Action name used when the caller passes an empty one.
pub const UNKNOWN_ACTION: &str = "未知操作";

/// How long destructive commands wait for confirmation.
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a prompt was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    Confirmed,
    Cancelled,
    TimedOut,
}

/// Confirm/cancel/timeout prompts on top of an [`EventBus`].
#[derive(Debug, Clone)]
pub struct Prompt {
    bus: Arc<EventBus>,
}

impl Prompt {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// Asks the sender of `ctx` to confirm `action` within `timeout`.
    ///
    /// A context that is not part of a conversation resolves as
    /// [`PromptOutcome::Cancelled`] without waiting.
    pub async fn ask(
        &self,
        ctx: &MessageContext,
        action: &str,
        timeout: Duration,
    ) -> PromptOutcome {
        let action = if action.is_empty() { UNKNOWN_ACTION } else { action };

        let notice = format!(
            "你正在执行 {action} 请在 {} 内发送“确认”以执行操作",
            format_duration(timeout)
        );
        if let Err(e) = ctx.reply_text(notice).await {
            warn!(action, error = %e, "Failed to send confirmation prompt");
        }

        let Some(session) = SessionMatcher::from_context(ctx) else {
            debug!(action, "No conversation to wait on, cancelling");
            return PromptOutcome::Cancelled;
        };

        let (tx, mut rx) = mpsc::channel(1);
        let waiter = listener(move |event| {
            let candidate = event.context();
            if !session.matches(candidate) {
                return Ok(());
            }
            if let Some(decision) = classify(&candidate.plain_text()) {
                // A full slot means the prompt is already resolved.
                let _ = tx.try_send(decision);
            }
            Ok(())
        });

        self.bus.subscribe(EventType::MessageReceived, Arc::clone(&waiter));
        let received = tokio::time::timeout(timeout, rx.recv()).await;
        self.bus.unsubscribe(EventType::MessageReceived, &waiter);

        let outcome = match received {
            Ok(Some(decision)) => decision,
            Ok(None) => PromptOutcome::TimedOut,
            Err(_) => rx.try_recv().unwrap_or(PromptOutcome::TimedOut),
        };

        if outcome == PromptOutcome::TimedOut {
            let notice = format!("等待超时，已取消 {action} 操作");
            if let Err(e) = ctx.reply_text(notice).await {
                warn!(action, error = %e, "Failed to send timeout notice");
            }
        }

        debug!(action, outcome = ?outcome, "Prompt resolved");
        outcome
    }

    /// Like [`ask`](Self::ask), then runs `on_confirm` or `on_cancel`.
    ///
    /// Nothing extra runs on timeout. Errors from the callbacks are
    /// returned.
    pub async fn ask_with<C, CFut, X, XFut>(
        &self,
        ctx: &MessageContext,
        action: &str,
        timeout: Duration,
        on_confirm: C,
        on_cancel: X,
    ) -> Result<PromptOutcome, BoxError>
    where
        C: FnOnce() -> CFut,
        CFut: Future<Output = HandlerResult>,
        X: FnOnce() -> XFut,
        XFut: Future<Output = HandlerResult>,
    {
        let outcome = self.ask(ctx, action, timeout).await;
        match outcome {
            PromptOutcome::Confirmed => on_confirm().await?,
            PromptOutcome::Cancelled => on_cancel().await?,
            PromptOutcome::TimedOut => {}
        }
        Ok(outcome)
    }
}

/// Maps an answer to a decision. Blank answers are ignored.
fn classify(text: &str) -> Option<PromptOutcome> {
    let answer = text.trim().to_lowercase();
    if answer.is_empty() {
        None
    } else if answer == CONFIRM_TOKEN {
        Some(PromptOutcome::Confirmed)
    } else {
        Some(PromptOutcome::Cancelled)
    }
}

/// Formats a duration the way the prompt text shows it: `30s`, `1m30s`,
/// `1h0m0s`, `1.5s`, `250ms`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let nanos = d.subsec_nanos();

    if secs == 0 {
        return match nanos {
            0 => "0s".to_string(),
            n if n < 1_000 => format!("{n}ns"),
            n if n < 1_000_000 => format!("{}µs", with_fraction(n / 1_000, n % 1_000, 3)),
            n => format!("{}ms", with_fraction(n / 1_000_000, n % 1_000_000, 6)),
        };
    }

    let seconds = format!("{}s", with_fraction((secs % 60) as u32, nanos, 9));
    let (hours, minutes) = (secs / 3600, (secs % 3600) / 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}")
    } else {
        seconds
    }
}

fn with_fraction(whole: u32, remainder: u32, digits: usize) -> String {
    if remainder == 0 {
        return whole.to_string();
    }
    let fraction = format!("{remainder:0digits$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingTransport, friend_request_ctx, group_ctx, private_ctx};
    use campfire_core::Event;
    use tokio_test::{assert_pending, assert_ready};

    const PROMPT_30S: &str = "你正在执行 回档 请在 30s 内发送“确认”以执行操作";

    fn setup() -> (Arc<EventBus>, Prompt, Arc<RecordingTransport>) {
        let bus = Arc::new(EventBus::new());
        let prompt = Prompt::new(Arc::clone(&bus));
        (bus, prompt, Arc::new(RecordingTransport::default()))
    }

    fn answer(bus: &EventBus, ctx: Arc<MessageContext>) {
        bus.publish(&Event::MessageReceived(ctx));
    }

    #[tokio::test]
    async fn confirm_from_same_session() {
        let (bus, prompt, t) = setup();
        let origin = group_ctx(&t, 100, 1, "/回档 5");

        let mut task = tokio_test::task::spawn(prompt.ask(&origin, "回档", DEFAULT_PROMPT_TIMEOUT));
        assert_pending!(task.poll());
        assert_eq!(bus.listener_count(EventType::MessageReceived), 1);

        answer(&bus, group_ctx(&t, 100, 1, "  确认 "));
        assert!(task.is_woken());
        assert_eq!(assert_ready!(task.poll()), PromptOutcome::Confirmed);

        assert_eq!(bus.listener_count(EventType::MessageReceived), 0);
        assert_eq!(t.texts(), vec![PROMPT_30S]);
    }

    #[tokio::test]
    async fn any_other_answer_cancels() {
        let (bus, prompt, t) = setup();
        let origin = private_ctx(&t, 7, "/重置世界");

        let mut task = tokio_test::task::spawn(prompt.ask(&origin, "重置世界", DEFAULT_PROMPT_TIMEOUT));
        assert_pending!(task.poll());

        answer(&bus, private_ctx(&t, 7, "NO"));
        assert_eq!(assert_ready!(task.poll()), PromptOutcome::Cancelled);
        assert_eq!(t.texts().len(), 1);
    }

    #[tokio::test]
    async fn other_sessions_and_blank_answers_are_ignored() {
        let (bus, prompt, t) = setup();
        let origin = group_ctx(&t, 100, 1, "/回档 5");

        let mut task = tokio_test::task::spawn(prompt.ask(&origin, "回档", DEFAULT_PROMPT_TIMEOUT));
        assert_pending!(task.poll());

        answer(&bus, group_ctx(&t, 100, 2, "确认"));
        answer(&bus, group_ctx(&t, 200, 1, "确认"));
        answer(&bus, private_ctx(&t, 1, "确认"));
        answer(&bus, group_ctx(&t, 100, 1, "   "));
        assert!(!task.is_woken());
        assert_pending!(task.poll());

        answer(&bus, group_ctx(&t, 100, 1, "确认"));
        assert_eq!(assert_ready!(task.poll()), PromptOutcome::Confirmed);
    }

    #[tokio::test]
    async fn first_answer_wins() {
        let (bus, prompt, t) = setup();
        let origin = group_ctx(&t, 100, 1, "/回档 5");

        let mut task = tokio_test::task::spawn(prompt.ask(&origin, "回档", DEFAULT_PROMPT_TIMEOUT));
        assert_pending!(task.poll());

        answer(&bus, group_ctx(&t, 100, 1, "确认"));
        answer(&bus, group_ctx(&t, 100, 1, "算了"));
        assert_eq!(assert_ready!(task.poll()), PromptOutcome::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_and_unsubscribes() {
        let (bus, prompt, t) = setup();
        let origin = group_ctx(&t, 100, 1, "/回档 5");

        let outcome = prompt.ask(&origin, "回档", DEFAULT_PROMPT_TIMEOUT).await;
        assert_eq!(outcome, PromptOutcome::TimedOut);
        assert_eq!(bus.listener_count(EventType::MessageReceived), 0);
        assert_eq!(
            t.texts(),
            vec![PROMPT_30S, "等待超时，已取消 回档 操作"]
        );

        // Late answers reach nobody.
        assert_eq!(bus.publish(&Event::MessageReceived(group_ctx(&t, 100, 1, "确认"))), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn answer_already_in_slot_beats_elapsed_timer() {
        let (bus, prompt, t) = setup();
        let origin = group_ctx(&t, 100, 1, "/回档 5");

        let mut task = tokio_test::task::spawn(prompt.ask(&origin, "回档", Duration::from_secs(1)));
        assert_pending!(task.poll());

        tokio::time::advance(Duration::from_secs(5)).await;
        answer(&bus, group_ctx(&t, 100, 1, "确认"));
        assert_eq!(assert_ready!(task.poll()), PromptOutcome::Confirmed);
        assert_eq!(t.texts().len(), 1);
    }

    #[tokio::test]
    async fn no_conversation_cancels_immediately() {
        let (bus, prompt, t) = setup();
        let origin = friend_request_ctx(&t, 9);

        let outcome = prompt.ask(&origin, "", DEFAULT_PROMPT_TIMEOUT).await;
        assert_eq!(outcome, PromptOutcome::Cancelled);
        assert_eq!(bus.listener_count(EventType::MessageReceived), 0);
    }

    #[tokio::test]
    async fn ask_with_runs_matching_callback() {
        let (bus, prompt, t) = setup();
        let origin = private_ctx(&t, 3, "/保存");
        let confirmed = Arc::new(parking_lot::Mutex::new(false));
        let cancelled = Arc::new(parking_lot::Mutex::new(false));

        let on_confirm = {
            let confirmed = Arc::clone(&confirmed);
            move || async move {
                *confirmed.lock() = true;
                Ok(())
            }
        };
        let on_cancel = {
            let cancelled = Arc::clone(&cancelled);
            move || async move {
                *cancelled.lock() = true;
                Ok(())
            }
        };

        let mut task = tokio_test::task::spawn(prompt.ask_with(
            &origin,
            "",
            DEFAULT_PROMPT_TIMEOUT,
            on_confirm,
            on_cancel,
        ));
        assert_pending!(task.poll());
        answer(&bus, private_ctx(&t, 3, "确认"));
        let outcome = assert_ready!(task.poll()).unwrap();

        assert_eq!(outcome, PromptOutcome::Confirmed);
        assert!(*confirmed.lock());
        assert!(!*cancelled.lock());
        assert_eq!(
            t.texts(),
            vec!["你正在执行 未知操作 请在 30s 内发送“确认”以执行操作"]
        );
    }

    #[test]
    fn durations_format_like_the_prompt_text() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn classify_normalizes_answers() {
        assert_eq!(classify(" 确认\n"), Some(PromptOutcome::Confirmed));
        assert_eq!(classify("Yes"), Some(PromptOutcome::Cancelled));
        assert_eq!(classify(" \t"), None);
    }
}
