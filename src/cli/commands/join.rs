use serde_json::json;

use super::super::{Ctx, NameArgs, print_line, render};
use crate::Result;
use crate::core::DisplayName;

pub(crate) fn handle(ctx: &Ctx, args: NameArgs) -> Result<()> {
    let name = DisplayName::parse(&args.name)?;
    let outcome = ctx.store.ensure_user(name.as_str())?;
    let total = ctx.store.get_total(name.as_str());
    print_line(
        ctx,
        || render::render_join(&name, total),
        || {
            json!({
                "user": name.key(),
                "display_name": name.as_str(),
                "total": total,
                "created": outcome.created(),
            })
        },
    )
}
