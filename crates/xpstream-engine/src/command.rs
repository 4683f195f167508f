//! The `xpstats` command.
//!
//! ```text
//! /xpstats                          own total
//! /xpstats <player>                 someone else's total
//! /xpstats top [n]                  leaderboard, n in 1..=100 (default 10)
//! /xpstats reset [player]           clear a total
//! /xpstats reload                   re-read the config file
//! /xpstats boost <player> <x> <t>   multiply rewards by x for t ticks
//! /xpstats boost clear <player>     revoke a boost
//! ```
//!
//! Every reply is rendered through the message catalog of the config
//! snapshot current when the command started. The one exception is a
//! successful reload, which answers from the new snapshot.

use std::path::Path;

use tracing::{info, warn};
use xpstream_core::messages::{MessageCatalog, format_count};
use xpstream_core::service::RewardService;

use crate::directory::Directory;
use crate::host;
use crate::protocol::{PlayerRef, Sender};

/// View one's own total, and the leaderboard.
pub const PERM_STATS: &str = "xpstream.stats";
/// View another player's total.
pub const PERM_STATS_OTHERS: &str = "xpstream.stats.others";
/// Reload the configuration.
pub const PERM_RELOAD: &str = "xpstream.reload";
/// Reset one's own total.
pub const PERM_RESET: &str = "xpstream.reset";
/// Reset another player's total.
pub const PERM_RESET_OTHERS: &str = "xpstream.reset.others";
/// Grant and revoke boosts.
pub const PERM_BOOST: &str = "xpstream.boost";

const TOP_DEFAULT: usize = 10;
const TOP_MAX: i32 = 100;
const TOP_SUGGESTIONS: [&str; 3] = ["5", "10", "25"];

/// A parsed `xpstats` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// The sender's own total.
    SelfStats,
    /// Another player's total.
    Stats {
        /// Name as typed.
        target: String,
    },
    /// The leaderboard.
    Top {
        /// Entries to show, already clamped.
        count: usize,
    },
    /// Clear a total; `None` means the sender's own.
    Reset {
        /// Name as typed.
        target: Option<String>,
    },
    /// Re-read the config file.
    Reload,
    /// Grant a boost. Numbers are kept as typed so bad input can be
    /// reported back.
    Boost {
        /// Name as typed.
        target: String,
        /// Multiplier as typed.
        multiplier: String,
        /// Duration in ticks as typed.
        ticks: String,
    },
    /// Revoke a boost.
    BoostClear {
        /// Name as typed.
        target: String,
    },
    /// Malformed invocation.
    Usage,
}

impl Command {
    /// Parse the arguments after the command name.
    pub fn parse(args: &[String]) -> Self {
        let Some(first) = args.first() else {
            return Self::SelfStats;
        };
        match first.to_ascii_lowercase().as_str() {
            "reload" => Self::Reload,
            "top" => Self::Top {
                count: parse_top_count(args.get(1).map(String::as_str)),
            },
            "reset" => Self::Reset {
                target: args.get(1).cloned(),
            },
            "boost" => match (args.get(1), args.get(2), args.get(3)) {
                (Some(sub), Some(target), None) if sub.eq_ignore_ascii_case("clear") => {
                    Self::BoostClear {
                        target: target.clone(),
                    }
                }
                (Some(target), Some(multiplier), Some(ticks)) => Self::Boost {
                    target: target.clone(),
                    multiplier: multiplier.clone(),
                    ticks: ticks.clone(),
                },
                _ => Self::Usage,
            },
            _ => Self::Stats {
                target: first.clone(),
            },
        }
    }
}

/// Leaderboard size from the optional argument; unparseable means default.
fn parse_top_count(arg: Option<&str>) -> usize {
    arg.and_then(|raw| raw.trim().parse::<i32>().ok())
        .map(|n| n.clamp(1, TOP_MAX))
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(TOP_DEFAULT)
}

/// What a command runs against.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    /// The reward service.
    pub service: &'a RewardService,
    /// Player name lookup.
    pub directory: &'a dyn Directory,
    /// Config file re-read by `reload`.
    pub config_path: &'a Path,
}

/// Run `command` for `sender`, returning the rendered reply lines.
pub fn execute(command: &Command, sender: &Sender, ctx: &CommandContext<'_>) -> Vec<String> {
    let config = ctx.service.config();
    let messages = config.messages();

    match command {
        Command::SelfStats => self_stats(sender, ctx, messages),
        Command::Stats { target } => other_stats(target, sender, ctx, messages),
        Command::Top { count } => top(*count, sender, ctx, messages),
        Command::Reset { target: None } => reset_self(sender, ctx, messages),
        Command::Reset {
            target: Some(target),
        } => reset_other(target, sender, ctx, messages),
        Command::Reload => reload(sender, ctx, messages),
        Command::Boost {
            target,
            multiplier,
            ticks,
        } => boost(target, multiplier, ticks, sender, ctx, messages),
        Command::BoostClear { target } => boost_clear(target, sender, ctx, messages),
        Command::Usage => vec![messages.format("usage", &[])],
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn self_stats(sender: &Sender, ctx: &CommandContext<'_>, messages: &MessageCatalog) -> Vec<String> {
    let Some(id) = sender.id else {
        return vec![messages.format("console-stats-denied", &[])];
    };
    if !sender.has(PERM_STATS) {
        return vec![messages.format("no-permission", &[])];
    }
    let xp = format_count(ctx.service.stat(id));
    vec![messages.format("stats-self", &[("%xp%", &xp)])]
}

fn other_stats(
    target: &str,
    sender: &Sender,
    ctx: &CommandContext<'_>,
    messages: &MessageCatalog,
) -> Vec<String> {
    if !sender.has(PERM_STATS_OTHERS) {
        return vec![messages.format("no-permission", &[])];
    }
    let Some(player) = resolve(ctx.directory, target) else {
        return vec![
            messages.format("stats-player-not-found", &[]),
            messages.format("usage", &[]),
        ];
    };
    let xp = format_count(ctx.service.stat(player.id));
    vec![messages.format(
        "stats-other",
        &[("%player%", &player.name), ("%xp%", &xp)],
    )]
}

fn top(
    count: usize,
    sender: &Sender,
    ctx: &CommandContext<'_>,
    messages: &MessageCatalog,
) -> Vec<String> {
    if !sender.has(PERM_STATS) {
        return vec![messages.format("no-permission", &[])];
    }
    let ranked = ctx.service.top(count);
    let shown = ranked.len().to_string();

    let mut lines = Vec::with_capacity(ranked.len().saturating_add(1));
    lines.push(messages.format("top-header", &[("%count%", &shown)]));
    for (rank, (id, total)) in (1_usize..).zip(ranked) {
        let name = ctx
            .directory
            .online_name(id)
            .unwrap_or_else(|| id.to_string());
        lines.push(messages.format(
            "top-entry",
            &[
                ("%rank%", &rank.to_string()),
                ("%player%", &name),
                ("%xp%", &format_count(total)),
            ],
        ));
    }
    lines
}

fn reset_self(sender: &Sender, ctx: &CommandContext<'_>, messages: &MessageCatalog) -> Vec<String> {
    let Some(id) = sender.id else {
        return vec![messages.format("console-reset-denied", &[])];
    };
    if !sender.has(PERM_RESET) {
        return vec![messages.format("no-permission", &[])];
    }
    let _ = ctx.service.reset_stats(id);
    info!(recipient = %id, "Stats reset by owner");
    vec![messages.format("reset-self", &[])]
}

fn reset_other(
    target: &str,
    sender: &Sender,
    ctx: &CommandContext<'_>,
    messages: &MessageCatalog,
) -> Vec<String> {
    if !sender.has(PERM_RESET_OTHERS) {
        return vec![messages.format("reset-no-permission", &[])];
    }
    let Some(player) = resolve(ctx.directory, target) else {
        return vec![messages.format("stats-player-not-found", &[])];
    };
    let previous = ctx.service.reset_stats(player.id);
    info!(recipient = %player.id, name = player.name.as_str(), previous, "Stats reset");
    vec![messages.format("reset-other", &[("%player%", &player.name)])]
}

fn reload(sender: &Sender, ctx: &CommandContext<'_>, messages: &MessageCatalog) -> Vec<String> {
    if !sender.has(PERM_RELOAD) {
        return vec![messages.format("no-permission", &[])];
    }
    match host::load_config(ctx.config_path) {
        Ok(snapshot) => {
            ctx.service.reload(snapshot);
            let config = ctx.service.config();
            vec![config.messages().format("reload-success", &[])]
        }
        Err(e) => {
            warn!(error = %e, path = %ctx.config_path.display(), "Reload failed, keeping current config");
            vec![messages.format("reload-failed", &[("%reason%", &e.to_string())])]
        }
    }
}

fn boost(
    target: &str,
    multiplier: &str,
    ticks: &str,
    sender: &Sender,
    ctx: &CommandContext<'_>,
    messages: &MessageCatalog,
) -> Vec<String> {
    if !sender.has(PERM_BOOST) {
        return vec![messages.format("no-permission", &[])];
    }
    let Some(player) = resolve(ctx.directory, target) else {
        return vec![messages.format("stats-player-not-found", &[])];
    };
    let invalid = |reason: &str| vec![messages.format("boost-invalid", &[("%reason%", reason)])];
    let Ok(multiplier) = multiplier.trim().parse::<f64>() else {
        return invalid("multiplier must be a number");
    };
    let Ok(ticks) = ticks.trim().parse::<i64>() else {
        return invalid("duration must be a whole number of ticks");
    };

    match ctx.service.grant_boost(player.id, multiplier, ticks) {
        Ok(_) => vec![messages.format(
            "boost-granted",
            &[
                ("%player%", &player.name),
                ("%multiplier%", &multiplier.to_string()),
                ("%ticks%", &ticks.to_string()),
            ],
        )],
        Err(e) => invalid(&e.to_string()),
    }
}

fn boost_clear(
    target: &str,
    sender: &Sender,
    ctx: &CommandContext<'_>,
    messages: &MessageCatalog,
) -> Vec<String> {
    if !sender.has(PERM_BOOST) {
        return vec![messages.format("no-permission", &[])];
    }
    let Some(player) = resolve(ctx.directory, target) else {
        return vec![messages.format("stats-player-not-found", &[])];
    };
    let key = if ctx.service.clear_boost(player.id) {
        "boost-cleared"
    } else {
        "boost-none"
    };
    vec![messages.format(key, &[("%player%", &player.name)])]
}

/// Online players first, then anyone seen before.
fn resolve(directory: &dyn Directory, name: &str) -> Option<PlayerRef> {
    directory
        .find_online(name)
        .or_else(|| directory.find_known(name))
}

// ---------------------------------------------------------------------------
// Tab completion
// ---------------------------------------------------------------------------

/// Suggestions for the last word of `args`.
pub fn complete(args: &[String], sender: &Sender, directory: &dyn Directory) -> Vec<String> {
    match args {
        [partial] => {
            let mut options = Vec::new();
            for (word, permission) in [
                ("reload", PERM_RELOAD),
                ("top", PERM_STATS),
                ("reset", PERM_RESET),
                ("boost", PERM_BOOST),
            ] {
                if sender.has(permission) {
                    options.push(word.to_owned());
                }
            }
            if sender.has(PERM_STATS_OTHERS) {
                options.extend(directory.online_names());
            }
            filter_prefix(options, partial)
        }
        [sub, partial] => match sub.to_ascii_lowercase().as_str() {
            "top" => TOP_SUGGESTIONS.iter().map(|s| (*s).to_owned()).collect(),
            "reset" if sender.has(PERM_RESET_OTHERS) => {
                filter_prefix(directory.online_names(), partial)
            }
            "boost" if sender.has(PERM_BOOST) => {
                let mut options = vec![String::from("clear")];
                options.extend(directory.online_names());
                filter_prefix(options, partial)
            }
            _ => Vec::new(),
        },
        [sub, clear, partial]
            if sub.eq_ignore_ascii_case("boost")
                && clear.eq_ignore_ascii_case("clear")
                && sender.has(PERM_BOOST) =>
        {
            filter_prefix(directory.online_names(), partial)
        }
        _ => Vec::new(),
    }
}

fn filter_prefix(options: Vec<String>, partial: &str) -> Vec<String> {
    let prefix = partial.to_ascii_lowercase();
    options
        .into_iter()
        .filter(|option| option.to_ascii_lowercase().starts_with(&prefix))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use xpstream_core::clock::ManualTimeSource;
    use xpstream_core::config::ConfigSnapshot;
    use xpstream_types::{Position, RecipientId, SpawnEvent};

    use super::*;
    use crate::directory::PlayerDirectory;

    struct Fixture {
        service: RewardService,
        directory: PlayerDirectory,
        alex: PlayerRef,
        sam: PlayerRef,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualTimeSource::new(0, Utc::now()));
            let service = RewardService::new(ConfigSnapshot::default(), clock);
            let alex = PlayerRef {
                id: RecipientId::new(),
                name: String::from("Alex"),
            };
            let sam = PlayerRef {
                id: RecipientId::new(),
                name: String::from("Sam"),
            };
            let mut directory = PlayerDirectory::new();
            directory.set_online(&[alex.clone(), sam.clone()]);
            directory.set_online(std::slice::from_ref(&alex));
            Self {
                service,
                directory,
                alex,
                sam,
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn give(&self, player: &PlayerRef, amount: u32) {
            let candidate = xpstream_types::Candidate {
                id: player.id,
                name: player.name.clone(),
                position: Position::default(),
                mode: xpstream_types::ObservationMode::Survival,
            };
            let event = SpawnEvent {
                world: String::from("world"),
                location: Position::default(),
                raw_amount: amount,
            };
            let _ = self.service.process(&event, &[candidate]);
        }

        fn config_path(&self) -> std::path::PathBuf {
            self.dir.path().join("xpstream.yaml")
        }

        fn run(&self, sender: &Sender, args: &[&str]) -> Vec<String> {
            let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
            let path = self.config_path();
            let ctx = CommandContext {
                service: &self.service,
                directory: &self.directory,
                config_path: &path,
            };
            execute(&Command::parse(&args), sender, &ctx)
        }

        fn alex_sender(&self, permissions: &[&str]) -> Sender {
            Sender::player(self.alex.id, &self.alex.name, permissions.iter().copied())
        }
    }

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_owned()).collect()
    }

    #[test]
    fn parse_routes_subcommands() {
        assert_eq!(Command::parse(&[]), Command::SelfStats);
        assert_eq!(Command::parse(&args(&["RELOAD"])), Command::Reload);
        assert_eq!(Command::parse(&args(&["top"])), Command::Top { count: 10 });
        assert_eq!(Command::parse(&args(&["top", "500"])), Command::Top { count: 100 });
        assert_eq!(Command::parse(&args(&["top", "-3"])), Command::Top { count: 1 });
        assert_eq!(Command::parse(&args(&["top", "lots"])), Command::Top { count: 10 });
        assert_eq!(
            Command::parse(&args(&["reset", "Sam"])),
            Command::Reset {
                target: Some(String::from("Sam"))
            }
        );
        assert_eq!(
            Command::parse(&args(&["boost", "clear", "Sam"])),
            Command::BoostClear {
                target: String::from("Sam")
            }
        );
        assert_eq!(Command::parse(&args(&["boost", "Sam"])), Command::Usage);
        assert_eq!(
            Command::parse(&args(&["Sam"])),
            Command::Stats {
                target: String::from("Sam")
            }
        );
    }

    #[test]
    fn self_stats_needs_a_player_and_permission() {
        let fx = Fixture::new();
        fx.give(&fx.alex, 1_234);

        let console = fx.run(&Sender::console(), &[]);
        assert_eq!(console, vec!["§c[XPStream] Specify a player: /xpstats <player>"]);

        let denied = fx.run(&fx.alex_sender(&[]), &[]);
        assert_eq!(denied, vec!["§c[XPStream] You do not have permission."]);

        let own = fx.run(&fx.alex_sender(&[PERM_STATS]), &[]);
        assert_eq!(own, vec!["§6[XPStream] §fTotal XP collected: §a1,234"]);
    }

    #[test]
    fn other_stats_resolve_offline_players() {
        let fx = Fixture::new();
        fx.give(&fx.sam, 40);

        let lines = fx.run(&fx.alex_sender(&[PERM_STATS_OTHERS]), &["sam"]);
        assert_eq!(lines, vec!["§6[XPStream] §fSam's total XP: §a40"]);

        let missing = fx.run(&fx.alex_sender(&[PERM_STATS_OTHERS]), &["Nobody"]);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing.first().map(String::as_str), Some("§c[XPStream] Player not found."));
    }

    #[test]
    fn top_lists_online_names_and_ids() {
        let fx = Fixture::new();
        fx.give(&fx.alex, 50);
        fx.give(&fx.sam, 30);

        let lines = fx.run(&Sender::console(), &["top", "5"]);
        assert_eq!(
            lines,
            vec![
                String::from("§6[XPStream] §f--- Top 2 XP Collectors ---"),
                String::from("§61. §fAlex §7- §a50"),
                format!("§62. §f{} §7- §a30", fx.sam.id),
            ]
        );
    }

    #[test]
    fn reset_paths() {
        let fx = Fixture::new();
        fx.give(&fx.alex, 10);
        fx.give(&fx.sam, 20);

        assert_eq!(
            fx.run(&Sender::console(), &["reset"]),
            vec!["§c[XPStream] Specify a player: /xpstats reset <player>"]
        );
        assert_eq!(
            fx.run(&fx.alex_sender(&[PERM_RESET]), &["reset", "Sam"]),
            vec!["§c[XPStream] You cannot reset other players' stats."]
        );

        let _ = fx.run(&fx.alex_sender(&[PERM_RESET]), &["reset"]);
        assert_eq!(fx.service.stat(fx.alex.id), 0);

        let lines = fx.run(&Sender::console(), &["reset", "SAM"]);
        assert_eq!(lines, vec!["§a[XPStream] Reset XP stats for Sam."]);
        assert_eq!(fx.service.stat(fx.sam.id), 0);
    }

    #[test]
    fn reload_reads_the_config_file() {
        let fx = Fixture::new();
        std::fs::write(
            fx.config_path(),
            "range: 4\nmessages:\n  reload-success: '&bfresh'\n",
        )
        .unwrap();

        assert_eq!(
            fx.run(&fx.alex_sender(&[]), &["reload"]),
            vec!["§c[XPStream] You do not have permission."]
        );
        let lines = fx.run(&Sender::console(), &["reload"]);
        assert_eq!(lines, vec!["§bfresh"]);
        assert!((fx.service.config().range() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reload_failure_keeps_current_config() {
        let fx = Fixture::new();
        std::fs::write(fx.config_path(), "range: [broken").unwrap();

        let lines = fx.run(&Sender::console(), &["reload"]);
        assert_eq!(lines.len(), 1);
        assert!(lines.first().unwrap().starts_with("§c[XPStream] Reload failed:"));
        assert!((fx.service.config().range() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn boost_grant_and_clear() {
        let fx = Fixture::new();
        let op = fx.alex_sender(&[PERM_BOOST]);

        let lines = fx.run(&op, &["boost", "Sam", "2.5", "200"]);
        assert_eq!(
            lines,
            vec!["§a[XPStream] Sam now has a x2.5 boost for 200 ticks."]
        );
        assert!(fx.service.boost_for(fx.sam.id).is_some());

        let bad = fx.run(&op, &["boost", "Sam", "fast", "200"]);
        assert_eq!(bad, vec!["§c[XPStream] Invalid boost: multiplier must be a number"]);
        let negative = fx.run(&op, &["boost", "Sam", "-1", "200"]);
        assert!(negative.first().unwrap().starts_with("§c[XPStream] Invalid boost:"));

        assert_eq!(
            fx.run(&op, &["boost", "clear", "Sam"]),
            vec!["§a[XPStream] Cleared the boost for Sam."]
        );
        assert_eq!(
            fx.run(&op, &["boost", "clear", "Sam"]),
            vec!["§7[XPStream] Sam has no active boost."]
        );
        assert_eq!(
            fx.run(&fx.alex_sender(&[]), &["boost", "Sam", "2", "20"]),
            vec!["§c[XPStream] You do not have permission."]
        );
    }

    #[test]
    fn completion_respects_permissions() {
        let fx = Fixture::new();
        let limited = fx.alex_sender(&[PERM_STATS]);

        assert_eq!(complete(&args(&[""]), &limited, &fx.directory), vec!["top"]);
        assert_eq!(
            complete(&args(&["r"]), &Sender::console(), &fx.directory),
            vec!["reload", "reset"]
        );
        assert_eq!(
            complete(&args(&["a"]), &Sender::console(), &fx.directory),
            vec!["Alex"]
        );
        assert_eq!(
            complete(&args(&["top", ""]), &limited, &fx.directory),
            vec!["5", "10", "25"]
        );
        assert!(complete(&args(&["reset", ""]), &limited, &fx.directory).is_empty());
        assert_eq!(
            complete(&args(&["boost", "c"]), &Sender::console(), &fx.directory),
            vec!["clear"]
        );
        assert_eq!(
            complete(&args(&["boost", "clear", "AL"]), &Sender::console(), &fx.directory),
            vec!["Alex"]
        );
    }
}
