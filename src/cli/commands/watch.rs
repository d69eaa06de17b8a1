use serde_json::json;

use super::super::{Ctx, WatchArgs, print_line, render};
use crate::Result;
use crate::core::UserKey;

pub(crate) fn handle(ctx: &Ctx, args: WatchArgs) -> Result<()> {
    let key = UserKey::parse(&args.name)?;
    let interval = ctx.watch_interval(args.interval_ms);
    tracing::info!(user = %key, interval_ms = interval.as_millis() as u64, "watching total");

    let handle = ctx.store.watch_total(key.as_str(), interval)?;
    let mut printed = 0usize;
    for event in handle.events().iter() {
        let at = render::clock_time(event.observed_at, ctx.offset);
        print_line(
            ctx,
            || render::render_watch(&key, event.value, &at),
            || json!({ "user": key, "total": event.value, "last_update": at }),
        )?;
        printed += 1;
        if args.limit.is_some_and(|limit| printed >= limit) {
            break;
        }
    }
    handle.stop();
    Ok(())
}
