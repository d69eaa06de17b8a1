use serde_json::json;

use super::super::{Ctx, NameArgs, print_line, render};
use crate::Result;
use crate::core::UserKey;

pub(crate) fn handle(ctx: &Ctx, args: NameArgs) -> Result<()> {
    let key = UserKey::parse(&args.name)?;
    let total = ctx.store.get_total(key.as_str());
    print_line(
        ctx,
        || render::render_total(&key, total),
        || json!({ "user": key, "total": total }),
    )
}
