//! Classification of submission responses.

/// What a submission response means for the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Wrong {
        /// `"too high"` or `"too low"` when the site said so.
        hint: Option<&'static str>,
        /// The site asked for a pause before the next guess.
        wait: bool,
    },
    RateLimited,
    AlreadyCompleted,
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }

    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Verdict::Wrong { hint, .. } => *hint,
            _ => None,
        }
    }

    /// Short message suitable for showing to the submitter.
    pub fn message(&self) -> String {
        match self {
            Verdict::Correct => "Correct!".to_string(),
            Verdict::Wrong { hint, wait } => {
                let mut msg = match hint {
                    Some(h) => format!("Wrong answer (your answer is {h})"),
                    None => "That's not the right answer.".to_string(),
                };
                if *wait {
                    msg.push_str(" Wait before trying again.");
                }
                msg
            }
            Verdict::RateLimited => {
                "Rate limited by the puzzle site. Please wait before trying again.".to_string()
            }
            Verdict::AlreadyCompleted => {
                "Puzzle already completed. Unable to verify your answer.".to_string()
            }
        }
    }
}

fn hint_in(lower: &str) -> Option<&'static str> {
    if lower.contains("too high") {
        Some("too high")
    } else if lower.contains("too low") {
        Some("too low")
    } else {
        None
    }
}

/// Classify the text of a submission response.
///
/// Wrong-answer markers are checked before rate-limit markers: a wrong answer
/// after several misses also mentions waiting.
pub fn classify(message: &str) -> Verdict {
    let lower = message.to_lowercase();

    if lower.contains("that's the right answer") || lower.contains("you got the answer") {
        return Verdict::Correct;
    }
    if lower.contains("already complete")
        || lower.contains("not the right level")
        || lower.contains("did you already complete it")
    {
        return Verdict::AlreadyCompleted;
    }
    if lower.contains("not the right answer") || lower.contains("that's not it") {
        return Verdict::Wrong {
            hint: hint_in(&lower),
            wait: lower.contains("please wait") || lower.contains("before trying again"),
        };
    }
    if lower.contains("too recently")
        || lower.contains("gave an answer")
        || lower.contains("you have to wait")
        || lower.contains("left to wait")
    {
        return Verdict::RateLimited;
    }
    Verdict::Wrong {
        hint: hint_in(&lower),
        wait: false,
    }
}

/// Verify an answer against a known correct one without contacting the site.
///
/// Comparison ignores case and surrounding whitespace. Numeric misses carry
/// a too-high/too-low hint, the same way the site answers.
pub fn compare_with_known(answer: &str, known: &str) -> Verdict {
    let answer = answer.trim();
    let known = known.trim();
    if answer.to_lowercase() == known.to_lowercase() {
        return Verdict::Correct;
    }
    let hint = match (answer.parse::<i128>(), known.parse::<i128>()) {
        (Ok(a), Ok(k)) if a > k => Some("too high"),
        (Ok(_), Ok(_)) => Some("too low"),
        _ => None,
    };
    Verdict::Wrong { hint, wait: false }
}
