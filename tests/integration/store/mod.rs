mod concurrency;
mod crash;
mod identity;
mod polling;
