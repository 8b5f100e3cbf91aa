//! Config serialization to TOML
//!
//! Single source of truth for the config file format: `ensure_config_exists`
//! and `chatterm config --reset` both write this output.

use super::{Config, VERSION};

impl Config {
    /// Serialize the effective configuration as a commented TOML document
    pub fn to_toml(&self) -> String {
        let mut out = format!(
            "# chatterm v{VERSION} configuration\n\
             # Environment overrides: CHATTERM_DEBOUNCE_MS, CHATTERM_TICK_MS,\n\
             # CHATTERM_LOG_LEVEL, CHATTERM_TOKEN_DELAY_MS\n\n"
        );
        out.push_str(&self.layout_to_toml());
        out.push_str(&self.render_to_toml());
        out.push_str(&self.keyboard_to_toml());
        out.push_str(&self.logging_to_toml());
        out.push_str(&self.demo_to_toml());
        out
    }

    fn layout_to_toml(&self) -> String {
        let l = &self.layout;
        let maximum = match l.maximum_static_height() {
            Some(rows) => format!("maximum_static_height = {rows}\n"),
            None => "# maximum_static_height = 40    # Cap the history zone (rows)\n".to_string(),
        };
        format!(
            "[layout]\n\
             # Share of the screen for history (static) and live (dynamic) zones\n\
             static_ratio = {:?}\n\
             dynamic_ratio = {:?}\n\
             minimum_static_height = {}\n\
             minimum_dynamic_height = {}\n\
             {maximum}\
             top_margin = {}\n\
             bottom_margin = {}\n\
             left_margin = {}\n\
             right_margin = {}\n\n",
            l.static_ratio(),
            l.dynamic_ratio(),
            l.minimum_static_height(),
            l.minimum_dynamic_height(),
            l.top_margin(),
            l.bottom_margin(),
            l.left_margin(),
            l.right_margin(),
        )
    }

    fn render_to_toml(&self) -> String {
        let r = &self.render;
        format!(
            "[render]\n\
             # Quiet period before coalesced state changes are drawn\n\
             debounce_ms = {}\n\
             # Redraw interval without state changes (spinner animation)\n\
             tick_ms = {}\n\
             statistics_interval_ms = {}\n\
             shutdown_timeout_ms = {}\n\n",
            r.debounce.as_millis(),
            r.tick.as_millis(),
            r.statistics_interval.as_millis(),
            r.shutdown_timeout.as_millis(),
        )
    }

    fn keyboard_to_toml(&self) -> String {
        let k = &self.keyboard;
        format!(
            "[keyboard]\n\
             poll_interval_ms = {}\n\
             # Consecutive read failures before the app stops\n\
             max_consecutive_errors = {}\n\n",
            k.poll_interval.as_millis(),
            k.max_consecutive_errors,
        )
    }

    fn logging_to_toml(&self) -> String {
        let l = &self.logging;
        format!(
            "[logging]\n\
             level = \"{}\"                  # trace, debug, info, warn, error (RUST_LOG wins)\n\
             file_enabled = {}\n\
             file_dir = {:?}\n\
             file_rotation = \"{}\"          # hourly, daily, never\n\
             file_prefix = \"{}\"\n\n",
            l.level,
            l.file_enabled,
            l.file_dir.display().to_string(),
            l.file_rotation.as_str(),
            l.file_prefix,
        )
    }

    fn demo_to_toml(&self) -> String {
        format!(
            "[demo]\n\
             # Delay between words streamed by the built-in echo assistant\n\
             token_delay_ms = {}\n",
            self.demo.token_delay.as_millis(),
        )
    }
}
