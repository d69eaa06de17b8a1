use serde_json::json;

use super::super::{AddArgs, Ctx, print_line, render};
use crate::Result;
use crate::core::UserKey;

pub(crate) fn handle(ctx: &Ctx, args: AddArgs) -> Result<()> {
    let key = UserKey::parse(&args.name)?;
    let delta = args.delta();
    let total = ctx.store.update_total(key.as_str(), delta)?;
    print_line(
        ctx,
        || render::render_added(&key, delta, total),
        || json!({ "user": key, "delta": delta, "total": total }),
    )
}
