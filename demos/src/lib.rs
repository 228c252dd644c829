use backboard_subscriptions::operations::LogLine;

/// Formats a log line the way a terminal tail would show it
pub fn format_line(line: &LogLine) -> String {
    match line.severity.as_deref() {
        Some(severity) if !severity.is_empty() => {
            format!("{} [{severity}] {}", line.timestamp, line.message)
        }
        _ => format!("{} {}", line.timestamp, line.message),
    }
}

/// The first command line argument, or exits with a usage message
pub fn required_arg(name: &str) -> String {
    match std::env::args().nth(1) {
        Some(value) => value,
        None => {
            eprintln!("missing argument: <{name}>");
            std::process::exit(2);
        }
    }
}
