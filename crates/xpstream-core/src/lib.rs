//! Reward resolution and aggregation core for xpstream.
//!
//! The host reports a reward spawn together with the candidates near it;
//! this crate decides who receives the reward, how much it is worth, and
//! whether cosmetic feedback may play, then records the grant in the
//! lifetime totals. Everything here is safe to call from many threads at
//! once.
//!
//! # Modules
//!
//! - [`boost`] -- Temporary per-recipient multipliers with tick expiry.
//! - [`clock`] -- The tick and wall-clock [`TimeSource`] seam.
//! - [`config`] -- YAML settings, the validated [`ConfigSnapshot`], and the
//!   swappable [`ConfigCell`].
//! - [`maintenance`] -- Periodic sweeps and auto-save through a
//!   [`StatsSink`].
//! - [`messages`] -- Operator-overridable message templates.
//! - [`processor`] -- The per-event state walk producing a [`Decision`].
//! - [`proximity`] -- Nearest eligible recipient selection.
//! - [`service`] -- [`RewardService`], the owner of all shared state.
//! - [`stats`] -- Lifetime totals with snapshots and leaderboards.
//! - [`throttle`] -- Per-recipient feedback cooldowns.
//!
//! [`TimeSource`]: clock::TimeSource
//! [`ConfigSnapshot`]: config::ConfigSnapshot
//! [`ConfigCell`]: config::ConfigCell
//! [`StatsSink`]: maintenance::StatsSink
//! [`Decision`]: xpstream_types::Decision
//! [`RewardService`]: service::RewardService

pub mod boost;
pub mod clock;
pub mod config;
pub mod maintenance;
pub mod messages;
pub mod processor;
pub mod proximity;
pub mod service;
pub mod stats;
pub mod throttle;
