//! Chat commands and the forwarding route.
//!
//! | Command        | Access     | Effect                                        |
//! |----------------|------------|-----------------------------------------------|
//! | `/ping`        | everyone   | replies `pong`                                |
//! | `/help`        | everyone   | replies the command list                      |
//! | `/echo <text>` | everyone   | replies `你说了: ` and the whole message       |
//! | `/保存`         | allow-list | queues `save`                                 |
//! | `/回档 <days>`  | allow-list | prompts, then queues `rollback` with the days |
//! | `/重置世界`      | allow-list | prompts, then queues `reset`                  |
//! | `/ban KU_xxx`  | allow-list | queues `ban` with the Klei id                 |
//!
//! Every other group message is queued as text for the game server.
//! `/保存` is not in [`COMMAND_TOKENS`], so the game also sees it as text.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use campfire_core::{ChatMessage, EventType, MessageContext, listener, render_segments};
use campfire_framework::middleware::EXECUTED_COMMAND_KEY;
use campfire_framework::{
    DEFAULT_PROMPT_TIMEOUT, HandlerResult, LogicManager, Prompt, auth, group_allowlist,
};

use crate::error::ForwardResult;
use crate::queue::MsgQueue;

/// Prefix shared by every command.
pub const COMMAND_PREFIX: &str = "/";

/// Messages starting with one of these are never forwarded as text.
pub const COMMAND_TOKENS: [&str; 6] = [
    "/ping",
    "/help",
    "/echo",
    "/回档",
    "/重置世界",
    "/ban",
];

/// Largest accepted rollback.
pub const MAX_ROLLBACK_DAYS: u64 = 100;

pub const HELP_TEXT: &str = "可用命令:
/ping - 测试连接
/help - 显示帮助
/echo <消息> - 回声消息
/回档 <天数> - 回档指定天数
/保存 - 即时存档
/重置世界 - 重新生成整个世界(谨慎使用)
/ban <科雷id> - 封禁玩家
";

pub const ROLLBACK_USAGE: &str = "请输入有效的回档天数 示例: /回档 1";
pub const ROLLBACK_TOO_LONG: &str = "输入的回档天数过长，请输入有效的回档天数 示例: /回档 1";
pub const BAN_USAGE: &str = "请输入有效的kleiid 示例: /ban KU_xxxxx";

/// Settings for [`register`].
#[derive(Debug, Clone)]
pub struct ForwardSettings {
    /// Senders allowed to run game-affecting commands.
    pub allowed_uids: Vec<i64>,
    /// Groups the bot listens to. Empty means all.
    pub allowed_groups: Vec<i64>,
    /// How long destructive commands wait for confirmation.
    pub prompt_timeout: Duration,
}

impl Default for ForwardSettings {
    fn default() -> Self {
        Self {
            allowed_uids: Vec::new(),
            allowed_groups: Vec::new(),
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
        }
    }
}

/// Handlers that talk to the game server through the queue.
#[derive(Debug)]
pub struct ForwardCommands {
    queue: Arc<MsgQueue>,
    prompt: Prompt,
    prompt_timeout: Duration,
    rollback_pattern: Regex,
    ban_pattern: Regex,
}

impl ForwardCommands {
    pub fn new(
        queue: Arc<MsgQueue>,
        prompt: Prompt,
        prompt_timeout: Duration,
    ) -> ForwardResult<Self> {
        Ok(Self {
            queue,
            prompt,
            prompt_timeout,
            rollback_pattern: Regex::new(r"/回档\s+([0-9]+)")?,
            ban_pattern: Regex::new(r"/ban\s+(KU_\S+)")?,
        })
    }

    /// `/保存`
    pub async fn save(self: Arc<Self>, ctx: Arc<MessageContext>) -> HandlerResult {
        if self.enqueue_command(&ctx, "save", Value::Null) {
            ctx.reply_text("保存成功!").await?;
        }
        Ok(())
    }

    /// `/回档 <days>`
    pub async fn rollback(self: Arc<Self>, ctx: Arc<MessageContext>) -> HandlerResult {
        let days = match self.rollback_days(&ctx.plain_text()) {
            Ok(days) => days,
            Err(usage) => {
                ctx.reply_text(usage).await?;
                return Ok(());
            }
        };
        debug!(days, "Rollback requested");

        let (this, ctx) = (&self, &ctx);
        self.prompt
            .ask_with(
                ctx,
                &format!("回档 {days} 天"),
                self.prompt_timeout,
                move || async move {
                    if this.enqueue_command(ctx, "rollback", Value::from(days)) {
                        ctx.reply_text(format!("已下发回档 {days} 天命令")).await?;
                    }
                    Ok(())
                },
                move || async move {
                    ctx.reply_text("已取消回档操作").await?;
                    Ok(())
                },
            )
            .await?;
        Ok(())
    }

    /// `/重置世界`
    pub async fn reset(self: Arc<Self>, ctx: Arc<MessageContext>) -> HandlerResult {
        let (this, ctx) = (&self, &ctx);
        self.prompt
            .ask_with(
                ctx,
                "重置世界",
                self.prompt_timeout,
                move || async move {
                    if this.enqueue_command(ctx, "reset", Value::Null) {
                        ctx.reply_text("已重置世界").await?;
                    }
                    Ok(())
                },
                move || async move {
                    ctx.reply_text("已取消重置世界操作").await?;
                    Ok(())
                },
            )
            .await?;
        Ok(())
    }

    /// `/ban KU_xxx`
    pub async fn ban(self: Arc<Self>, ctx: Arc<MessageContext>) -> HandlerResult {
        let text = ctx.plain_text();
        let Some(klei_id) = self
            .ban_pattern
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            ctx.reply_text(BAN_USAGE).await?;
            return Ok(());
        };
        debug!(klei_id = %klei_id, "Ban requested");

        if self.enqueue_command(&ctx, "ban", Value::String(klei_id.clone())) {
            ctx.reply_text(format!("已将用户 {klei_id} 封禁")).await?;
        }
        Ok(())
    }

    /// Queues group text that is not a command.
    pub async fn forward(self: Arc<Self>, ctx: Arc<MessageContext>) -> HandlerResult {
        let Some(msg) = ctx.as_group() else {
            return Ok(());
        };
        let text = render_segments(&msg.segments);
        if COMMAND_TOKENS.iter().any(|cmd| text.starts_with(cmd)) {
            return Ok(());
        }
        debug!(group_id = msg.group_id, "Forwarding group message");
        self.queue.enqueue_group_message(msg);
        Ok(())
    }

    /// Parses the day count of `/回档 <days>`, or returns the reply for
    /// invalid input.
    fn rollback_days(&self, text: &str) -> Result<u64, &'static str> {
        let digits = self
            .rollback_pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .ok_or(ROLLBACK_USAGE)?;
        // Digits only, so the parse can fail only by overflowing.
        let days = digits.as_str().parse::<u64>().unwrap_or(u64::MAX);
        match days {
            0 => Err(ROLLBACK_USAGE),
            d if d > MAX_ROLLBACK_DAYS => Err(ROLLBACK_TOO_LONG),
            d => Ok(d),
        }
    }

    /// Queues a command from the conversation of `ctx`. Returns `false` for
    /// units outside a conversation.
    fn enqueue_command(&self, ctx: &MessageContext, head: &str, content: Value) -> bool {
        match ctx.message() {
            ChatMessage::Private(msg) => self.queue.enqueue_cmd_by_private(head, content, msg),
            ChatMessage::Group(msg) => self.queue.enqueue_cmd_by_group(head, content, msg),
            ChatMessage::FriendRequest(_) => {
                warn!(head, "Command outside a conversation ignored");
                return false;
            }
        }
        true
    }
}

/// `/ping`
pub async fn ping(ctx: Arc<MessageContext>) -> HandlerResult {
    ctx.reply_text("pong").await?;
    Ok(())
}

/// `/help`
pub async fn help(ctx: Arc<MessageContext>) -> HandlerResult {
    ctx.reply_text(HELP_TEXT).await?;
    Ok(())
}

/// `/echo <text>`, echoing the message including the command.
pub async fn echo(ctx: Arc<MessageContext>) -> HandlerResult {
    let text = ctx.plain_text();
    if text.is_empty() {
        return Ok(());
    }
    ctx.reply_text(format!("你说了: {text}")).await?;
    Ok(())
}

/// Turns a method of [`ForwardCommands`] into a route handler.
fn bind<F, Fut>(
    commands: &Arc<ForwardCommands>,
    method: F,
) -> impl Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static
where
    F: Fn(Arc<ForwardCommands>, Arc<MessageContext>) -> Fut + Copy + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let commands = Arc::clone(commands);
    move |ctx| method(Arc::clone(&commands), ctx)
}

/// Registers every command, the forwarding route and the audit listener.
pub fn register(
    manager: &LogicManager,
    queue: Arc<MsgQueue>,
    settings: &ForwardSettings,
) -> ForwardResult<Arc<ForwardCommands>> {
    let commands = Arc::new(ForwardCommands::new(
        queue,
        manager.prompt(),
        settings.prompt_timeout,
    )?);
    let admins = || [auth(settings.allowed_uids.iter().copied())];

    let groups = settings.allowed_groups.iter().copied();
    manager.router().use_middleware(group_allowlist(groups));

    manager.handle_command(COMMAND_PREFIX, "ping", ping, []);
    manager.handle_command(COMMAND_PREFIX, "help", help, []);
    manager.handle_command(COMMAND_PREFIX, "echo", echo, []);

    let save = bind(&commands, ForwardCommands::save);
    let rollback = bind(&commands, ForwardCommands::rollback);
    let reset = bind(&commands, ForwardCommands::reset);
    let ban = bind(&commands, ForwardCommands::ban);
    manager.handle_command(COMMAND_PREFIX, "保存", save, admins());
    manager.handle_command(COMMAND_PREFIX, "回档", rollback, admins());
    manager.handle_command(COMMAND_PREFIX, "重置世界", reset, admins());
    manager.handle_command(COMMAND_PREFIX, "ban", ban, admins());

    manager.handle_group_message(bind(&commands, ForwardCommands::forward));

    manager.event_bus().subscribe(
        EventType::CommandExecuted,
        listener(|event| {
            let command = event.context().get_string(EXECUTED_COMMAND_KEY);
            info!(command = %command, "Command executed");
            Ok(())
        }),
    );

    info!(
        admins = settings.allowed_uids.len(),
        groups = settings.allowed_groups.len(),
        "Forwarding commands registered"
    );
    Ok(commands)
}
