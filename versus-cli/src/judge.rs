/// Terminal judge: shows a comparison and reads the human's answer.
use std::io::{self, BufRead, Write};

use versus_core::{Comparison, ItemId};

/// What the human typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    First,
    Second,
    Quit,
}

/// Parse an answer: "1"/"a" for the first option, "2"/"b" for the second, "q" to stop.
pub fn parse_answer(input: &str) -> Option<Answer> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "a" => Some(Answer::First),
        "2" | "b" => Some(Answer::Second),
        "q" | "quit" => Some(Answer::Quit),
        _ => None,
    }
}

/// Item identity the answer selects. `None` for `Quit`.
pub fn choice_for(comparison: &Comparison, answer: Answer) -> Option<ItemId> {
    match answer {
        Answer::First => Some(comparison.item_a.id),
        Answer::Second => Some(comparison.item_b.id),
        Answer::Quit => None,
    }
}

/// Prompt until a valid answer arrives. `Ok(None)` on quit or end of input.
pub fn ask<R: BufRead, W: Write>(
    comparison: &Comparison,
    progress: &str,
    input: &mut R,
    output: &mut W,
) -> io::Result<Option<ItemId>> {
    writeln!(output, "\n{progress}Which do you prefer?")?;
    writeln!(output, "  1) {}", comparison.item_a.payload)?;
    writeln!(output, "  2) {}", comparison.item_b.payload)?;

    loop {
        write!(output, "[1/2/q] > ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match parse_answer(&line) {
            Some(answer) => return Ok(choice_for(comparison, answer)),
            None => writeln!(output, "Please answer 1, 2 or q.")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use versus_core::ComparedItem;

    fn comparison() -> Comparison {
        Comparison::new(
            ComparedItem { id: 3, payload: "cat.png".to_string() },
            ComparedItem { id: 5, payload: "dog.png".to_string() },
        )
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer(" 1\n"), Some(Answer::First));
        assert_eq!(parse_answer("B"), Some(Answer::Second));
        assert_eq!(parse_answer("quit"), Some(Answer::Quit));
        assert_eq!(parse_answer("3"), None);
        assert_eq!(parse_answer(""), None);
    }

    #[test]
    fn test_ask_retries_until_valid() {
        let mut input = io::Cursor::new("maybe\n2\n");
        let mut output = Vec::new();
        let choice = ask(&comparison(), "", &mut input, &mut output).unwrap();
        assert_eq!(choice, Some(5));

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("1) cat.png"));
        assert!(shown.contains("2) dog.png"));
        assert!(shown.contains("Please answer"));
    }

    #[test]
    fn test_ask_stops_at_end_of_input() {
        let mut input = io::Cursor::new("");
        let mut output = Vec::new();
        assert_eq!(ask(&comparison(), "", &mut input, &mut output).unwrap(), None);
    }
}
