use super::super::{Ctx, print_line, render};
use crate::Result;

pub(crate) fn handle(ctx: &Ctx) -> Result<()> {
    let table = ctx.store.snapshot();
    print_line(
        ctx,
        || render::render_table(&table),
        || serde_json::to_value(&table).unwrap_or_default(),
    )
}
