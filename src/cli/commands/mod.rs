pub(super) mod add;
pub(super) mod join;
pub(super) mod list;
pub(super) mod reset;
pub(super) mod show;
pub(super) mod watch;
