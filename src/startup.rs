// Startup module - banner and effective settings
//
// Printed before the terminal UI takes the screen (or in headless mode),
// then repeated into the log so it shows up in the captured buffer.

use crate::config::{Config, ConfigSource, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
}

/// One line of the settings summary
struct Setting {
    name: &'static str,
    value: String,
}

fn settings(config: &Config) -> Vec<Setting> {
    let layout = &config.layout;
    let max = layout
        .maximum_static_height()
        .map(|rows| format!(", max {rows} rows"))
        .unwrap_or_default();

    vec![
        Setting {
            name: "layout",
            value: format!(
                "{:.0}% history / {:.0}% live (min {} / {} rows{max})",
                layout.static_ratio() * 100.0,
                layout.dynamic_ratio() * 100.0,
                layout.minimum_static_height(),
                layout.minimum_dynamic_height(),
            ),
        },
        Setting {
            name: "render",
            value: format!(
                "debounce {}ms, tick {}ms",
                config.render.debounce.as_millis(),
                config.render.tick.as_millis()
            ),
        },
        Setting {
            name: "keyboard",
            value: format!("poll {}ms", config.keyboard.poll_interval.as_millis()),
        },
        Setting {
            name: "logging",
            value: if config.logging.file_enabled {
                format!(
                    "{} → {} ({})",
                    config.logging.level,
                    config.logging.file_dir.display(),
                    config.logging.file_rotation.as_str()
                )
            } else {
                config.logging.level.clone()
            },
        },
        Setting {
            name: "assistant",
            value: format!(
                "echo demo, {}ms per word",
                config.demo.token_delay.as_millis()
            ),
        },
    ]
}

/// Print the startup banner and effective settings
pub fn print_startup(config: &Config, source: &ConfigSource) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}chatterm{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Reactive terminal chat assistant{RESET}");
    println!();

    match source {
        ConfigSource::File(path) => {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display())
        }
        ConfigSource::Defaults => println!("  {DIM}Config:{RESET} {YELLOW}(using defaults){RESET}"),
    }
    println!();

    for setting in settings(config) {
        println!("    {DIM}{:<10}{RESET} {}", setting.name, setting.value);
    }
    println!();
}

/// Same summary, into the log buffer
pub fn log_startup(config: &Config) {
    tracing::info!("chatterm v{} starting", VERSION);
    for setting in settings(config) {
        tracing::info!("  {} - {}", setting.name, setting.value);
    }
}
