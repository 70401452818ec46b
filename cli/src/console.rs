use std::io;
use std::io::BufRead;
use std::io::Write;

use repofleet_core::gc::GcConsole;

/// Terminal front end: status lines to stdout, confirmation read from
/// stdin. Only an explicit affirmative proceeds.
pub struct StdConsole;

impl GcConsole for StdConsole {
    fn status(&mut self, line: &str) {
        println!("{line}");
    }

    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(is_affirmative(&answer))
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_proceeds() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("YES\n"));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("n\n"));
        assert!(!is_affirmative("yeah\n"));
        assert!(!is_affirmative("quit\n"));
    }
}
