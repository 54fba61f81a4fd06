//! Operator confirmation before publishing

use std::io::{self, BufRead, Write};

/// Show `post_text` and ask whether to publish it.
///
/// Only an explicit yes counts; an empty answer or end of input declines.
pub fn confirm_publish<R, W>(post_text: &str, input: &mut R, output: &mut W) -> io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    writeln!(output)?;
    writeln!(
        output,
        "Post to publish ({} chars):",
        post_text.chars().count()
    )?;
    writeln!(output, "----------------------------------------")?;
    writeln!(output, "{}", post_text)?;
    writeln!(output, "----------------------------------------")?;

    loop {
        write!(output, "Publish this post to X? [y/N] ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => writeln!(output, "Invalid response. Use y/n.")?,
        }
    }
}
