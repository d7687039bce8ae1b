//! Route predicates.
//!
//! A route runs only if every one of its matchers accepts the context.
//! Matchers are plain predicates over `&MessageContext`; the functions in
//! this module build the common ones.
//!
//! ```rust,ignore
//! Route::new("echo", echo)
//!     .matcher(matcher::is_group())
//!     .matcher(matcher::command("/", "echo"));
//! ```

use std::sync::Arc;

use campfire_core::{ChatMessage, MessageContext, SessionMatcher};

/// A type-erased route predicate.
pub type MatchFn = Arc<dyn Fn(&MessageContext) -> bool + Send + Sync>;

/// Wraps a closure into a [`MatchFn`].
pub fn from_fn<F>(f: F) -> MatchFn
where
    F: Fn(&MessageContext) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Returns the first whitespace-separated token of `text`.
pub fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// Matches messages whose first token is exactly `prefix` followed by `name`.
///
/// `command("/", "echo")` accepts `/echo hi` and `/echo`, but not
/// `/echoes` or `say /echo`.
pub fn command(prefix: &str, name: &str) -> MatchFn {
    let token = format!("{prefix}{name}");
    from_fn(move |ctx| first_token(&ctx.plain_text()) == Some(token.as_str()))
}

/// Matches messages whose trimmed text starts with `prefix`.
pub fn text_prefix(prefix: impl Into<String>) -> MatchFn {
    let prefix = prefix.into();
    from_fn(move |ctx| ctx.plain_text().trim_start().starts_with(prefix.as_str()))
}

/// Matches private messages.
pub fn is_private() -> MatchFn {
    from_fn(|ctx| matches!(ctx.message(), ChatMessage::Private(_)))
}

/// Matches group messages.
pub fn is_group() -> MatchFn {
    from_fn(|ctx| matches!(ctx.message(), ChatMessage::Group(_)))
}

/// Matches friend requests.
pub fn is_friend_request() -> MatchFn {
    from_fn(|ctx| matches!(ctx.message(), ChatMessage::FriendRequest(_)))
}

/// Matches messages from the same conversation and actor as `session`.
pub fn same_session(session: SessionMatcher) -> MatchFn {
    from_fn(move |ctx| session.matches(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingTransport, friend_request_ctx, group_ctx, private_ctx};

    #[test]
    fn command_matches_whole_first_token() {
        let t = Arc::new(RecordingTransport::default());
        let echo = command("/", "echo");

        assert!(echo(&private_ctx(&t, 1, "/echo hi")));
        assert!(echo(&private_ctx(&t, 1, "  /echo")));
        assert!(!echo(&private_ctx(&t, 1, "/echoes")));
        assert!(!echo(&private_ctx(&t, 1, "say /echo")));

        let rollback = command("/", "回档");
        assert!(rollback(&group_ctx(&t, 1, 2, "/回档 3")));
    }

    #[test]
    fn kind_matchers() {
        let t = Arc::new(RecordingTransport::default());
        let private = private_ctx(&t, 1, "x");
        let group = group_ctx(&t, 10, 1, "x");
        let request = friend_request_ctx(&t, 1);

        assert!(is_private()(&private) && !is_private()(&group));
        assert!(is_group()(&group) && !is_group()(&request));
        assert!(is_friend_request()(&request) && !is_friend_request()(&private));
    }

    #[test]
    fn prefix_and_session() {
        let t = Arc::new(RecordingTransport::default());
        let ctx = group_ctx(&t, 10, 1, " /ping");
        assert!(text_prefix("/")(&ctx));
        assert!(!text_prefix("!")(&ctx));

        let session = SessionMatcher::from_context(&ctx).unwrap();
        let same = same_session(session);
        assert!(same(&group_ctx(&t, 10, 1, "确认")));
        assert!(!same(&group_ctx(&t, 10, 2, "确认")));
    }
}
