use serde_json::json;

use super::super::{Ctx, ResetArgs, print_line, render};
use crate::Result;
use crate::core::DisplayName;

pub(crate) fn handle(ctx: &Ctx, args: ResetArgs) -> Result<()> {
    let name = DisplayName::parse(&args.name)?;
    if !args.yes {
        let current = ctx.store.get_total(name.as_str());
        return print_line(
            ctx,
            || render::render_reset_prompt(&name),
            || json!({ "user": name.key(), "total": current, "reset": false }),
        );
    }

    match ctx.store.reset(name.as_str())? {
        Some(total) => print_line(
            ctx,
            || render::render_reset(&name),
            || json!({ "user": name.key(), "total": total, "reset": true }),
        ),
        None => print_line(
            ctx,
            || render::render_unknown_user(&name),
            || json!({ "user": name.key(), "total": null, "reset": false }),
        ),
    }
}
