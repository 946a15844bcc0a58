use colored::Colorize;

fn prefix() -> String {
    "[vmfleet]".bold().cyan().to_string()
}

/// Print an informational message: [vmfleet] message
pub fn info(msg: &str) {
    println!("{} {}", prefix(), msg);
}

/// Print a success message in green.
pub fn success(msg: &str) {
    println!("{} {}", prefix(), msg.green());
}

/// Print an error message in red, on stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", "[vmfleet]".bold().red(), msg.red());
}

pub fn warn(msg: &str) {
    println!("{} {}", prefix(), msg.yellow());
}

/// Print a numbered step: [vmfleet] Step n/total: message
pub fn step(n: u32, total: u32, msg: &str) {
    println!(
        "\n{} {} {}",
        prefix(),
        format!("Step {}/{}:", n, total).bold().yellow(),
        msg,
    );
}

/// Print a bold banner box, green on success and red otherwise.
pub fn banner(lines: &[&str], ok: bool) {
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0) + 4;
    let paint = |s: String| if ok { s.bold().green() } else { s.bold().red() };

    println!();
    println!("{}", paint("=".repeat(width)));
    for line in lines {
        let pad = width - line.len() - 4;
        println!("{}", paint(format!("  {}{}  ", line, " ".repeat(pad))));
    }
    println!("{}", paint("=".repeat(width)));
    println!();
}

/// Print `label  value` with a bold, padded label.
pub fn summary_line(label: &str, value: &str) {
    println!("  {} {}", format!("{:<20}", label).bold(), value);
}

/// Color a batch outcome word.
pub fn outcome(succeeded: bool) -> String {
    if succeeded {
        "success".green().to_string()
    } else {
        "FAILED".red().bold().to_string()
    }
}
