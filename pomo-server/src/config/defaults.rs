//! Default configuration values
//!
//! Printed by `pomo-server --print-default-config` as a starting point.

/// Default configuration as TOML
pub const DEFAULT_CONFIG_TOML: &str = r##"
# pomo configuration

[general]
command_prefix = "!"

[session]
focus_minutes = 20
short_break_minutes = 5
long_break_minutes = 15
intervals = 4
max_interval_minutes = 180
max_intervals = 12

[countdown]
max_minutes = 180
refresh_secs = 5
default_title = "Countdown"

[idle]
# a running session gets a liveness check after 30 minutes without activity
running_grace_secs = 1800
# paused sessions get an hour
paused_grace_secs = 3600
poll_interval_secs = 5
challenge_timeout_secs = 60
challenge_prompt = "Are you still there?"
"##;
