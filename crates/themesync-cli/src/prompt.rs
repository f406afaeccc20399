//! Interactive theme selection

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use themesync_core::Theme;

/// Ask the user to pick one of `themes` by number
pub fn select_theme<R: BufRead, W: Write>(
    question: &str,
    themes: &[Theme],
    input: &mut R,
    out: &mut W,
) -> Result<Theme> {
    if themes.is_empty() {
        bail!("No themes found on this store.");
    }

    writeln!(out)?;
    writeln!(out, "{}", question)?;
    writeln!(out)?;
    for (i, theme) in themes.iter().enumerate() {
        writeln!(out, "  [{}] {}", i + 1, theme)?;
    }
    writeln!(out)?;
    write!(out, "> ")?;
    out.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read selection")?;
    let choice = line.trim();

    match choice.parse::<usize>() {
        Ok(n) if (1..=themes.len()).contains(&n) => Ok(themes[n - 1].clone()),
        _ => bail!(
            "Invalid choice '{}'. Please run the command again and enter 1-{}.",
            choice,
            themes.len()
        ),
    }
}
