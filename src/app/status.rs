use postguard::config::Config;

pub fn render_status(config: &Config) -> String {
    let mut lines = vec![
        format!("◆ {}", t!("status.title")),
        String::new(),
        format!("{}     {}", t!("status.version"), env!("CARGO_PKG_VERSION")),
        format!(
            "{}      {}",
            t!("status.config"),
            config.config_path.display()
        ),
        format!("{}   {}", t!("status.log_level"), config.log_level),
        String::new(),
        format!("  {}    {}", t!("status.service"), config.service.base_url),
        format!(
            "  {}  {}",
            t!("status.assistant"),
            config
                .service
                .assistant_id
                .as_deref()
                .unwrap_or("(not set)")
        ),
        format!(
            "  {}  {}",
            t!("status.conversation"),
            config
                .session
                .conversation_id
                .as_deref()
                .unwrap_or("(not set)")
        ),
        format!(
            "  {}    {}s (connect {}s)",
            t!("status.timeout"),
            config.service.timeout_secs,
            config.service.connect_timeout_secs
        ),
        format!(
            "  {}     {} (progress {})",
            t!("status.locale"),
            config.feedback.locale,
            if config.feedback.show_progress {
                "on"
            } else {
                "off"
            }
        ),
        String::new(),
        t!("status.rules").to_string(),
    ];

    for rule in &config.rules {
        lines.push(format!(
            "  [{}] {} -> {}",
            rule.platform, rule.control_selector, rule.draft_source_selector
        ));
    }

    lines.join("\n")
}
